//! Collaborators the gate reports its decisions to.

use waypost_auth::RequiredRole;

use crate::{LoginRedirect, NavigationRequest};

/// Owns the actual page transition mechanism.
///
/// For each request the gate calls exactly one of these methods, exactly once.
/// A decision for a transition the host has already abandoned may still
/// arrive and should be ignored rather than treated as an error.
pub trait NavigationController: Send + Sync {
    /// Let the in-flight transition continue to its target unmodified.
    fn proceed(&self, request: &NavigationRequest);

    /// Abort the in-flight transition and start a new one to the login page.
    fn redirect(&self, request: &NavigationRequest, redirect: &LoginRedirect);
}

/// Receives the user-visible "access denied" notification.
pub trait Notifier: Send + Sync {
    fn access_denied(&self, request: &NavigationRequest, required: &RequiredRole);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn access_denied(&self, request: &NavigationRequest, required: &RequiredRole) {
        tracing::warn!(
            target_path = %request.target_path,
            required_role = %required,
            "access denied"
        );
    }
}
