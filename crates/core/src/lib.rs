//! `waypost-core` — shared building blocks for the navigation gate.
//!
//! This crate contains **pure** primitives (no IO, no async).

pub mod error;
pub mod id;

pub use error::{GateError, GateResult};
pub use id::UserId;
