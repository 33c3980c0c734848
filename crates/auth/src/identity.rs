//! Identity snapshot of the current user.

use serde::{Deserialize, Serialize};

use waypost_core::UserId;

use crate::Role;

/// Display name given to the anonymous identity.
pub const ANONYMOUS_DISPLAY_NAME: &str = "Not logged in";

/// Immutable snapshot of the currently known user.
///
/// "Nobody is logged in" is the [`Identity::anonymous`] sentinel rather than a
/// missing value: it has no id and no role, so it never satisfies a role
/// requirement and callers never need to null-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Option<UserId>,
    pub account: String,
    pub display_name: String,
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip_expire_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Identity {
    /// The unauthenticated placeholder.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            account: String::new(),
            display_name: ANONYMOUS_DISPLAY_NAME.to_string(),
            role: None,
            avatar: None,
            profile: None,
            vip_expire_time: None,
            vip_code: None,
            vip_number: None,
            edit_time: None,
            create_time: None,
            update_time: None,
        }
    }

    /// An authenticated identity with the required fields only.
    pub fn new(
        id: UserId,
        account: impl Into<String>,
        display_name: impl Into<String>,
        role: Option<Role>,
    ) -> Self {
        Self {
            id: Some(id),
            account: account.into(),
            display_name: display_name.into(),
            role,
            ..Self::anonymous()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.role.as_ref() == Some(role)
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_no_privileges() {
        let anon = Identity::anonymous();
        assert!(anon.is_anonymous());
        assert!(anon.role.is_none());
        assert!(!anon.has_role(&Role::ADMIN));
        assert_eq!(anon.display_name, ANONYMOUS_DISPLAY_NAME);
    }

    #[test]
    fn authenticated_identity_matches_its_role_exactly() {
        let alice = Identity::new(UserId::new(7), "alice", "Alice", Some(Role::new("user")));
        assert!(!alice.is_anonymous());
        assert!(alice.has_role(&Role::new("user")));
        assert!(!alice.has_role(&Role::ADMIN));

        let promoted = alice.with_role(Role::ADMIN);
        assert!(promoted.has_role(&Role::ADMIN));
    }

    #[test]
    fn optional_profile_fields_are_omitted_when_absent() {
        let json = serde_json::to_value(Identity::anonymous()).unwrap();
        assert!(json.get("avatar").is_none());
        assert_eq!(json["display_name"], ANONYMOUS_DISPLAY_NAME);
    }
}
