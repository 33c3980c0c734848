//! Gate configuration.
//!
//! Sources are merged in this order (later sources override earlier):
//! 1. `GateConfig::default()`
//! 2. a TOML file (explicit path, or `waypost.toml` in the working directory)
//! 3. environment variables prefixed `WAYPOST_`, nested keys split on `__`
//!    (e.g. `WAYPOST_IDENTITY__BASE_URL`)
//!
//! The rule table is read once at startup and validated before use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use waypost_auth::{AccessPolicy, AccessRule};
use waypost_core::{GateError, GateResult};
use waypost_session::provider::LOGIN_USER_ENDPOINT;

use crate::LoginTarget;
use crate::redirect::{DEFAULT_LOGIN_PATH, DEFAULT_REDIRECT_PARAM};

pub const DEFAULT_CONFIG_FILENAME: &str = "waypost.toml";
pub const DEFAULT_ENV_PREFIX: &str = "WAYPOST";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the backend API.
    pub base_url: String,
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl IdentityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8123/api".to_string(),
            endpoint: LOGIN_USER_ENDPOINT.to_string(),
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    pub login_path: String,
    pub redirect_param: String,
    pub identity: IdentityConfig,
    pub rules: Vec<AccessRule>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            redirect_param: DEFAULT_REDIRECT_PARAM.to_string(),
            identity: IdentityConfig::default(),
            rules: AccessPolicy::reference().rules().to_vec(),
        }
    }
}

impl GateConfig {
    /// Extract and validate a configuration from an assembled figment.
    pub fn from_figment(figment: Figment) -> GateResult<Self> {
        let config: GateConfig = figment
            .extract()
            .map_err(|e| GateError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GateResult<()> {
        if !self.login_path.starts_with('/') {
            return Err(GateError::config("login_path must start with '/'"));
        }
        if self.redirect_param.trim().is_empty() {
            return Err(GateError::config("redirect_param cannot be empty"));
        }
        if self.identity.base_url.trim().is_empty() {
            return Err(GateError::config("identity.base_url cannot be empty"));
        }
        if self.identity.timeout_ms == 0 {
            return Err(GateError::config("identity.timeout_ms cannot be 0"));
        }
        // Rule validation lives with the policy.
        self.policy().map(|_| ())
    }

    pub fn policy(&self) -> GateResult<AccessPolicy> {
        AccessPolicy::new(self.rules.iter().cloned())
    }

    pub fn login_target(&self) -> LoginTarget {
        LoginTarget::new(self.login_path.as_str(), self.redirect_param.as_str())
    }
}

/// Loads [`GateConfig`] from file and environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn figment(&self) -> GateResult<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(GateConfig::default()));

        match &self.config_path {
            Some(path) if path.exists() => {
                tracing::info!(path = %path.display(), "loading gate configuration");
                figment = figment.merge(Toml::file(path));
            }
            Some(path) => {
                return Err(GateError::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    tracing::info!(path = %default_path.display(), "loading gate configuration");
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(&format!("{}_", self.env_prefix)).split("__")))
    }

    pub fn load(&self) -> GateResult<GateConfig> {
        GateConfig::from_figment(self.figment()?)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
