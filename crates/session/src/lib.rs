//! `waypost-session` — identity loading and the per-process session cache.
//!
//! The cache is the only shared mutable state of the gate. It loads the
//! current identity lazily, at most once per load cycle, no matter how many
//! transitions ask for it concurrently.

pub mod cache;
pub mod provider;

pub use cache::SessionCache;
pub use provider::{
    BaseResponse, HttpIdentityProvider, IdentityProvider, LoginUserVo, ProviderError,
    StaticIdentityProvider,
};
