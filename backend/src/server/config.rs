//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pointminer::domain::{NewUserDefaults, ReferralPolicy};
use pointminer::outbound::memory::InMemoryStore;
use pointminer::outbound::persistence::DbPool;
use pointminer::settings::ServerSettings;

/// Where the server keeps its data.
#[derive(Clone)]
pub enum Store {
    Memory(Arc<InMemoryStore>),
    Postgres(DbPool),
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) store: Store,
    pub(crate) new_user_defaults: NewUserDefaults,
    pub(crate) referral_policy: ReferralPolicy,
    pub(crate) max_accrual_attempts: u32,
    pub(crate) sweep_interval: Option<Duration>,
}

impl ServerConfig {
    /// Configuration with settings-derived tuning and the given store.
    #[must_use]
    pub fn from_settings(settings: &ServerSettings, store: Store) -> Self {
        Self {
            bind_addr: settings.bind_addr(),
            store,
            new_user_defaults: settings.new_user_defaults(),
            referral_policy: settings.referral_policy(),
            max_accrual_attempts: settings.max_accrual_attempts(),
            sweep_interval: settings.sweep_interval(),
        }
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
