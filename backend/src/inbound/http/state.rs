//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    BoostCommand, BoostQuery, MiningCommand, ReferralQuery, TaskCommand, TaskQuery, UserDirectory,
};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub users: Arc<dyn UserDirectory>,
    pub mining: Arc<dyn MiningCommand>,
    pub boosts: Arc<dyn BoostCommand>,
    pub boosts_query: Arc<dyn BoostQuery>,
    pub referrals: Arc<dyn ReferralQuery>,
    pub tasks: Arc<dyn TaskCommand>,
    pub tasks_query: Arc<dyn TaskQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub users: Arc<dyn UserDirectory>,
    pub mining: Arc<dyn MiningCommand>,
    pub boosts: Arc<dyn BoostCommand>,
    pub boosts_query: Arc<dyn BoostQuery>,
    pub referrals: Arc<dyn ReferralQuery>,
    pub tasks: Arc<dyn TaskCommand>,
    pub tasks_query: Arc<dyn TaskQuery>,
}

impl HttpState {
    /// Construct state from a ports bundle.
    ///
    /// # Examples
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    /// use pointminer::domain::{
    ///     BoostService, MiningService, ReferralBonusApplier, ReferralQueryService, TaskService,
    ///     UserDirectoryService,
    /// };
    /// use pointminer::inbound::http::state::{HttpState, HttpStatePorts};
    /// use pointminer::outbound::memory::InMemoryStore;
    ///
    /// let store = Arc::new(InMemoryStore::with_default_catalog());
    /// let clock = Arc::new(DefaultClock);
    /// let bonus = ReferralBonusApplier::new(store.clone(), store.clone(), clock.clone());
    /// let state = HttpState::new(HttpStatePorts {
    ///     users: Arc::new(UserDirectoryService::new(store.clone(), bonus, clock.clone())),
    ///     mining: Arc::new(MiningService::new(store.clone(), store.clone(), clock.clone())),
    ///     boosts: Arc::new(BoostService::new(store.clone(), clock.clone())),
    ///     boosts_query: Arc::new(BoostService::new(store.clone(), clock.clone())),
    ///     referrals: Arc::new(ReferralQueryService::new(store.clone(), store.clone())),
    ///     tasks: Arc::new(TaskService::new(store.clone(), clock.clone())),
    ///     tasks_query: Arc::new(TaskService::new(store, clock)),
    /// });
    /// let _users = state.users.clone();
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            users,
            mining,
            boosts,
            boosts_query,
            referrals,
            tasks,
            tasks_query,
        } = ports;
        Self {
            users,
            mining,
            boosts,
            boosts_query,
            referrals,
            tasks,
            tasks_query,
        }
    }
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}
