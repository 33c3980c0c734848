use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier carried by an identity.
///
/// Roles are opaque strings compared case-sensitively; there is no hierarchy
/// (`admin` does not imply `user`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// The role that gates `/admin` in the reference configuration.
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role a path demands before a transition to it may proceed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "role")]
pub enum RequiredRole {
    /// Open access.
    None,
    /// Exactly this role is required.
    Role(Role),
}

impl RequiredRole {
    pub fn is_none(&self) -> bool {
        matches!(self, RequiredRole::None)
    }
}

impl core::fmt::Display for RequiredRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RequiredRole::None => f.write_str("none"),
            RequiredRole::Role(role) => core::fmt::Display::fmt(role, f),
        }
    }
}
