// ─────────────────────────────────────────────────────────────────────────────
// Decision Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

use serde::Serialize;

use crate::{evaluate, Access, AccessPolicy, Identity, RequiredRole};

/// Detailed explanation of a navigation decision.
///
/// This structure answers "why was this transition allowed/denied?" and is
/// what the gate logs at debug level and the CLI prints for `explain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionExplanation {
    /// The path the transition was headed to.
    pub target_path: String,

    /// Prefix of the rule that matched, if any.
    pub matched_prefix: Option<String>,

    /// Role demanded by the matched rule.
    pub required_role: RequiredRole,

    /// Account of the identity the decision was made for (empty when anonymous).
    pub account: String,

    /// Role held by the identity, if any.
    pub identity_role: Option<String>,

    pub access: Access,

    /// Human-readable reason for the decision.
    pub reason: String,
}

impl AccessPolicy {
    /// Explain the decision this policy makes for `identity` visiting `path`.
    pub fn explain(&self, identity: &Identity, path: &str) -> DecisionExplanation {
        let rule = self.matching_rule(path);
        let required = self.required_role(path);
        let access = evaluate(identity, &required);
        let identity_role = identity.role.as_ref().map(|r| r.as_str().to_string());

        let reason = match (&required, access) {
            (RequiredRole::None, _) => format!("No access rule matches '{path}'; path is open"),
            (RequiredRole::Role(role), Access::Allow) => {
                format!("Identity holds required role '{role}'")
            }
            (RequiredRole::Role(role), Access::Deny) if identity.is_anonymous() => {
                format!("Not logged in; '{path}' requires role '{role}'")
            }
            (RequiredRole::Role(role), Access::Deny) => match &identity_role {
                Some(held) => format!("Identity holds role '{held}' but '{path}' requires '{role}'"),
                None => format!("Identity holds no role but '{path}' requires '{role}'"),
            },
        };

        DecisionExplanation {
            target_path: path.to_string(),
            matched_prefix: rule.map(|r| r.path_prefix.clone()),
            required_role: required,
            account: identity.account.clone(),
            identity_role,
            access,
            reason,
        }
    }
}
