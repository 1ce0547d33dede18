//! Client half of the mining app.
//!
//! The session runs wherever the user interface runs. It resolves who the
//! user is from the host environment, authenticates against the HTTP API
//! through [`MiningBackend`] and degrades to a local placeholder when that
//! cannot happen in time.

pub mod backend;
pub mod cache;
pub mod identity;
pub mod session;

#[cfg(test)]
pub use backend::MockMiningBackend;
pub use backend::{BackendError, MiningBackend};
pub use cache::TimedCache;
pub use identity::{
    HOST_PROBES, HostEnvironment, HostProbe, INIT_DATA_PARAM, IdentityCandidate, IdentityResolver,
    ResolveOptions, SourceUnavailable, StaticEnvironment,
};
pub use session::{
    AuthSession, AuthSessionConfig, FALLBACK_DISPLAY_NAME, FALLBACK_REFERRAL_CODE, SessionError,
    SessionProfile, SessionState, StartOptions,
};
