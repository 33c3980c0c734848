//! `waypost-auth` — pure authorization boundary for navigation.
//!
//! No IO and no async: identities are snapshots, the access policy is a
//! static table, and decisions are plain functions of both.

pub mod explain;
pub mod identity;
pub mod policy;
pub mod roles;

pub use explain::DecisionExplanation;
pub use identity::Identity;
pub use policy::{evaluate, Access, AccessPolicy, AccessRule};
pub use roles::{RequiredRole, Role};
