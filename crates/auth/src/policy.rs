//! Path-prefix access policy.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use waypost_core::{GateError, GateResult};

use crate::{Identity, RequiredRole, Role};

/// One entry of the static rule table: paths starting with `path_prefix`
/// require `required_role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub path_prefix: String,
    pub required_role: Role,
}

impl AccessRule {
    pub fn new(path_prefix: impl Into<String>, required_role: Role) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            required_role,
        }
    }

    fn validate(&self) -> GateResult<()> {
        let prefix = self.path_prefix.as_str();

        if prefix.is_empty() {
            return Err(GateError::misconfigured_rule(prefix, "path prefix is empty"));
        }
        if !prefix.starts_with('/') {
            return Err(GateError::misconfigured_rule(prefix, "path prefix must start with '/'"));
        }
        if prefix.chars().any(char::is_whitespace) {
            return Err(GateError::misconfigured_rule(prefix, "path prefix contains whitespace"));
        }
        if prefix.contains(['?', '#']) {
            return Err(GateError::misconfigured_rule(
                prefix,
                "path prefix must not contain a query or fragment",
            ));
        }
        if self.required_role.as_str().trim().is_empty() {
            return Err(GateError::misconfigured_rule(prefix, "required role is empty"));
        }

        Ok(())
    }
}

/// Outcome of evaluating an identity against a required role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Allow,
    Deny,
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allow)
    }
}

/// Static mapping from a target path to the role required to view it.
///
/// Rules are validated once at construction and kept sorted longest prefix
/// first, so the first match is the most specific one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    /// Build a policy, failing fast on any malformed rule.
    pub fn new(rules: impl IntoIterator<Item = AccessRule>) -> GateResult<Self> {
        let mut rules: Vec<AccessRule> = rules.into_iter().collect();

        let mut seen = HashSet::new();
        for rule in &rules {
            rule.validate()?;
            if !seen.insert(rule.path_prefix.as_str()) {
                return Err(GateError::misconfigured_rule(
                    rule.path_prefix.as_str(),
                    "duplicate path prefix",
                ));
            }
        }

        rules.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));

        tracing::debug!(rules = rules.len(), "access policy built");
        Ok(Self { rules })
    }

    /// The reference configuration: `/admin` requires `admin`.
    pub fn reference() -> Self {
        Self {
            rules: vec![AccessRule::new("/admin", Role::ADMIN)],
        }
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    /// Most specific rule whose prefix the path starts with.
    pub fn matching_rule(&self, path: &str) -> Option<&AccessRule> {
        self.rules.iter().find(|r| path.starts_with(r.path_prefix.as_str()))
    }

    /// Role required to view `path`; [`RequiredRole::None`] when no rule matches.
    pub fn required_role(&self, path: &str) -> RequiredRole {
        match self.matching_rule(path) {
            Some(rule) => RequiredRole::Role(rule.required_role.clone()),
            None => RequiredRole::None,
        }
    }
}

/// Decide whether `identity` satisfies `required`.
///
/// Exact role equality; no hierarchy.
pub fn evaluate(identity: &Identity, required: &RequiredRole) -> Access {
    match required {
        RequiredRole::None => Access::Allow,
        RequiredRole::Role(role) if identity.has_role(role) => Access::Allow,
        RequiredRole::Role(_) => Access::Deny,
    }
}
