use serde::{Deserialize, Serialize};

/// One attempted transition, as reported by the host navigation system.
///
/// Consumed by value: each request is decided exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    /// Full destination path, including any query string.
    pub target_path: String,
    pub origin_path: String,
}

impl NavigationRequest {
    pub fn new(target_path: impl Into<String>, origin_path: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            origin_path: origin_path.into(),
        }
    }
}
