//! Identity providers: where the current identity comes from.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use waypost_auth::{Identity, Role};
use waypost_core::UserId;

/// Endpoint that returns the currently logged-in user.
pub const LOGIN_USER_ENDPOINT: &str = "/user/get/login";

/// Envelope code the backend uses for success.
const SUCCESS_CODE: i64 = 0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("identity backend returned HTTP {0}")]
    Status(u16),

    #[error("failed to decode identity response: {0}")]
    Decode(String),

    #[error("identity payload is invalid: {0}")]
    InvalidIdentity(String),
}

/// Source of the current identity.
///
/// `Ok(None)` means "no session": the backend answered, but nobody is logged in.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn fetch_current_identity(&self) -> Result<Option<Identity>, ProviderError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

/// Uniform response envelope of the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    pub code: Option<i64>,
    pub data: Option<T>,
    pub message: Option<String>,
}

/// Logged-in user view as the backend serializes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserVo {
    pub id: Option<i64>,
    pub user_account: Option<String>,
    pub user_name: Option<String>,
    pub user_avatar: Option<String>,
    pub user_profile: Option<String>,
    pub user_role: Option<String>,
    pub vip_expire_time: Option<String>,
    pub vip_code: Option<String>,
    pub vip_number: Option<i64>,
    pub edit_time: Option<String>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
}

impl TryFrom<LoginUserVo> for Identity {
    type Error = ProviderError;

    fn try_from(vo: LoginUserVo) -> Result<Self, Self::Error> {
        let id = vo
            .id
            .ok_or_else(|| ProviderError::InvalidIdentity("missing user id".to_string()))?;

        let account = vo.user_account.unwrap_or_default();
        let display_name = vo
            .user_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| account.clone());
        let role = vo.user_role.filter(|r| !r.is_empty()).map(Role::new);

        Ok(Identity {
            avatar: vo.user_avatar,
            profile: vo.user_profile,
            vip_expire_time: vo.vip_expire_time,
            vip_code: vo.vip_code,
            vip_number: vo.vip_number,
            edit_time: vo.edit_time,
            create_time: vo.create_time,
            update_time: vo.update_time,
            ..Identity::new(UserId::new(id), account, display_name, role)
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP provider
// ─────────────────────────────────────────────────────────────────────────────

/// Fetches the current identity from the backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_endpoint(base_url, LOGIN_USER_ENDPOINT, timeout)
    }

    pub fn with_endpoint(
        base_url: &str,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn fetch_current_identity(&self) -> Result<Option<Identity>, ProviderError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ProviderError::Status(resp.status().as_u16()));
        }

        let body: BaseResponse<LoginUserVo> = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        match (body.code, body.data) {
            (Some(SUCCESS_CODE), Some(vo)) => Identity::try_from(vo).map(Some),
            (code, _) => {
                tracing::debug!(?code, message = ?body.message, "backend reports no session");
                Ok(None)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Static provider
// ─────────────────────────────────────────────────────────────────────────────

/// Provider with a fixed answer (offline runs, tests).
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    answer: Result<Option<Identity>, ProviderError>,
}

impl StaticIdentityProvider {
    pub fn anonymous() -> Self {
        Self { answer: Ok(None) }
    }

    pub fn logged_in(identity: Identity) -> Self {
        Self {
            answer: Ok(Some(identity)),
        }
    }

    pub fn failing(err: ProviderError) -> Self {
        Self { answer: Err(err) }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn fetch_current_identity(&self) -> Result<Option<Identity>, ProviderError> {
        self.answer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_envelope() {
        let raw = r#"{
            "code": 0,
            "data": {
                "id": 1873421,
                "userAccount": "alice",
                "userName": "Alice",
                "userRole": "admin",
                "vipNumber": 12
            },
            "message": "ok"
        }"#;

        let body: BaseResponse<LoginUserVo> = serde_json::from_str(raw).unwrap();
        let identity = Identity::try_from(body.data.unwrap()).unwrap();

        assert_eq!(identity.id, Some(UserId::new(1873421)));
        assert_eq!(identity.account, "alice");
        assert_eq!(identity.display_name, "Alice");
        assert_eq!(identity.role, Some(Role::ADMIN));
        assert_eq!(identity.vip_number, Some(12));
    }

    #[test]
    fn missing_id_is_rejected_at_the_boundary() {
        let vo = LoginUserVo {
            user_account: Some("ghost".to_string()),
            ..Default::default()
        };
        let err = Identity::try_from(vo).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidIdentity(_)));
    }

    #[test]
    fn blank_role_and_name_are_normalised() {
        let vo = LoginUserVo {
            id: Some(3),
            user_account: Some("carol".to_string()),
            user_name: Some("  ".to_string()),
            user_role: Some("".to_string()),
            ..Default::default()
        };
        let identity = Identity::try_from(vo).unwrap();
        assert_eq!(identity.display_name, "carol");
        assert_eq!(identity.role, None);
    }

    #[test]
    fn role_is_kept_verbatim() {
        let vo = LoginUserVo {
            id: Some(4),
            user_account: Some("dave".to_string()),
            user_role: Some(" admin".to_string()),
            ..Default::default()
        };
        let identity = Identity::try_from(vo).unwrap();

        assert_eq!(identity.role, Some(Role::new(" admin")));
        assert!(!identity.has_role(&Role::ADMIN));
    }

    #[test]
    fn endpoint_url_is_joined_without_double_slashes() {
        let provider =
            HttpIdentityProvider::new("http://localhost:8123/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(provider.url(), "http://localhost:8123/api/user/get/login");
    }

    #[tokio::test]
    async fn static_provider_replays_its_answer() {
        let failing = StaticIdentityProvider::failing(ProviderError::Status(503));
        assert_eq!(
            failing.fetch_current_identity().await,
            Err(ProviderError::Status(503))
        );
        assert_eq!(
            StaticIdentityProvider::anonymous().fetch_current_identity().await,
            Ok(None)
        );
    }
}
