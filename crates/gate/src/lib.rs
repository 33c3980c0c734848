//! `waypost-gate` — the navigation interception point.
//!
//! Every attempted transition goes through [`NavigationGate::navigate`], which
//! waits for the session to be loaded, evaluates the access policy, and tells
//! the host's [`NavigationController`] to proceed or to redirect to login.

pub mod config;
pub mod controller;
pub mod gate;
pub mod redirect;
pub mod request;

pub use config::{ConfigLoader, GateConfig, IdentityConfig};
pub use controller::{NavigationController, Notifier, TracingNotifier};
pub use gate::{GateOutcome, NavigationGate};
pub use redirect::{LoginRedirect, LoginTarget};
pub use request::NavigationRequest;
