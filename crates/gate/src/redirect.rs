//! Login redirects that remember where the user was headed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default login entry point.
pub const DEFAULT_LOGIN_PATH: &str = "/user/login";

/// Default query parameter carrying the original destination.
pub const DEFAULT_REDIRECT_PARAM: &str = "redirect";

/// Where denied transitions are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginTarget {
    pub path: String,
    pub redirect_param: String,
}

impl LoginTarget {
    pub fn new(path: impl Into<String>, redirect_param: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            redirect_param: redirect_param.into(),
        }
    }

    /// Redirect to this login page, carrying `target_path` for the return trip.
    pub fn redirect_for(&self, target_path: &str) -> LoginRedirect {
        let mut query = BTreeMap::new();
        query.insert(self.redirect_param.clone(), target_path.to_string());

        LoginRedirect {
            path: self.path.clone(),
            query,
        }
    }

    /// Destination to resume after a successful login.
    ///
    /// Reads this target's redirect parameter from the login page's query
    /// string. Falls back to `fallback` when the parameter is missing or is not
    /// an in-app absolute path.
    pub fn resume_target(&self, login_query: &str, fallback: &str) -> String {
        LoginRedirect::resume_target(login_query, &self.redirect_param, fallback)
    }
}

impl Default for LoginTarget {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_PATH, DEFAULT_REDIRECT_PARAM)
    }
}

/// Instruction to navigate to the login page.
///
/// `query` holds raw (decoded) values; the original target is kept verbatim,
/// including its own query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRedirect {
    pub path: String,
    pub query: BTreeMap<String, String>,
}

impl LoginRedirect {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Render as a URL.
    ///
    /// Query keys and values are percent-encoded except for `/ ? : @`, which
    /// are legal inside a query component, so `/admin` renders as
    /// `/user/login?redirect=/admin`.
    pub fn to_url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }

        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", encode_query_component(k), encode_query_component(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.path, query)
    }

    fn resume_target(login_query: &str, param: &str, fallback: &str) -> String {
        let raw = login_query.trim_start_matches('?');

        let found = raw
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == param)
            .and_then(|(_, v)| urlencoding::decode(v).ok())
            .map(|v| v.into_owned());

        match found {
            Some(target) if is_in_app_path(&target) => target,
            _ => fallback.to_string(),
        }
    }
}

impl core::fmt::Display for LoginRedirect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_url())
    }
}

/// Characters `urlencoding` escapes that a query component may carry as-is.
const QUERY_SAFE: [(&str, &str); 4] = [("%2F", "/"), ("%3F", "?"), ("%3A", ":"), ("%40", "@")];

/// Escapes `& = # + %`, spaces and non-ASCII; keeps path separators readable.
fn encode_query_component(raw: &str) -> String {
    // `encode` escapes a literal `%` as `%25`, so every remaining `%XX` is one
    // it produced itself.
    QUERY_SAFE
        .iter()
        .fold(urlencoding::encode(raw).into_owned(), |encoded, (escaped, plain)| {
            encoded.replace(escaped, plain)
        })
}

/// Absolute path within this app (no scheme, no protocol-relative `//host`).
fn is_in_app_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}
