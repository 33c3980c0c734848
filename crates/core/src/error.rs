//! Gate error model.

use thiserror::Error;

/// Result type used across the gate crates.
pub type GateResult<T> = Result<T, GateError>;

/// Startup-time failures.
///
/// Decision-time outcomes (a denied transition, an unreachable identity
/// backend) are never errors; they resolve to a redirect or to the anonymous
/// identity. Only configuration problems surface here, and they should stop
/// the process before the first transition is gated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// An access rule failed validation (e.g. malformed path prefix).
    #[error("misconfigured access rule '{prefix}': {reason}")]
    MisconfiguredRule { prefix: String, reason: String },

    /// Configuration could not be loaded or extracted.
    #[error("configuration error: {0}")]
    Config(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl GateError {
    pub fn misconfigured_rule(prefix: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MisconfiguredRule {
            prefix: prefix.into(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
