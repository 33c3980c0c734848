//! Per-transition authorization protocol.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use waypost_auth::{evaluate, Access, AccessPolicy, Identity, RequiredRole};
use waypost_session::SessionCache;

use crate::{LoginRedirect, LoginTarget, NavigationController, NavigationRequest, Notifier};

/// Terminal state of one transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    Proceed { target_path: String },
    Redirected { redirect: LoginRedirect },
}

impl GateOutcome {
    pub fn is_proceed(&self) -> bool {
        matches!(self, GateOutcome::Proceed { .. })
    }
}

/// Intercepts every navigation transition.
///
/// Each call to [`navigate`](Self::navigate) runs
/// `Start → AwaitingSession → Deciding → {Proceed, Redirected}` on its own,
/// while all calls share the one [`SessionCache`].
pub struct NavigationGate {
    session: Arc<SessionCache>,
    policy: AccessPolicy,
    login: LoginTarget,
    controller: Arc<dyn NavigationController>,
    notifier: Arc<dyn Notifier>,
}

impl NavigationGate {
    pub fn new(
        session: Arc<SessionCache>,
        policy: AccessPolicy,
        controller: Arc<dyn NavigationController>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            session,
            policy,
            login: LoginTarget::default(),
            controller,
            notifier,
        }
    }

    pub fn with_login_target(mut self, login: LoginTarget) -> Self {
        self.login = login;
        self
    }

    pub fn session(&self) -> &Arc<SessionCache> {
        &self.session
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn login_target(&self) -> &LoginTarget {
        &self.login
    }

    /// Decide one transition and report it to the controller.
    ///
    /// Suspends only while the session's first load (of the current cycle) is
    /// in flight. Always resolves: a failed identity fetch counts as "not
    /// logged in".
    pub async fn navigate(&self, request: NavigationRequest) -> GateOutcome {
        let span = tracing::info_span!(
            "navigate",
            target_path = %request.target_path,
            origin_path = %request.origin_path,
        );

        async move {
            let identity = self.session.ensure_loaded().await;
            self.decide(request, &identity)
        }
        .instrument(span)
        .await
    }

    /// Explicit login: the identity becomes the loaded session.
    pub fn login(&self, identity: Identity) {
        self.session.set(identity);
    }

    /// Explicit logout: the next transition reloads the session.
    pub fn logout(&self) {
        self.session.reset();
    }

    fn decide(&self, request: NavigationRequest, identity: &Identity) -> GateOutcome {
        let required = self.policy.required_role(&request.target_path);

        if let RequiredRole::None = required {
            return self.proceed(request);
        }

        match evaluate(identity, &required) {
            Access::Allow => self.proceed(request),
            Access::Deny => {
                if tracing::enabled!(tracing::Level::DEBUG) {
                    let explanation = self.policy.explain(identity, &request.target_path);
                    tracing::debug!(reason = %explanation.reason, "transition denied");
                }
                self.notifier.access_denied(&request, &required);

                let redirect = self.login.redirect_for(&request.target_path);
                self.controller.redirect(&request, &redirect);
                tracing::info!(redirect = %redirect, "redirected to login");

                GateOutcome::Redirected { redirect }
            }
        }
    }

    fn proceed(&self, request: NavigationRequest) -> GateOutcome {
        self.controller.proceed(&request);
        tracing::debug!("transition allowed");

        GateOutcome::Proceed {
            target_path: request.target_path,
        }
    }
}

impl core::fmt::Debug for NavigationGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NavigationGate")
            .field("session", &self.session)
            .field("policy", &self.policy)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}
