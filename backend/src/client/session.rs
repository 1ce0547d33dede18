//! Client authentication session.
//!
//! [`AuthSession`] drives identity resolution and the user lookup-or-create
//! call, publishing every transition on a `watch` channel:
//!
//! ```text
//! Idle -> Resolving -> Authenticated
//!            |  ^
//!            v  |          (bounded)
//!          Retrying ----> FallbackIdentity | Failed
//! ```
//!
//! A session-wide deadline races authentication. If it passes first the
//! session settles without a persisted user. Once authenticated, loading
//! boosts and the opening claim get whatever time is left; running out only
//! skips them. A generation counter discards any publish from a run that
//! has since been replaced. A fallback session holds a local user that is
//! never sent to the backend.

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::Clock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::ports::CreateUserRequest;
use crate::domain::{
    BoostDefinition, BoostDefinitionId, BoostGrant, BoostGrantDraft, BoostGrantId,
    DEFAULT_MINING_SPEED, DisplayName, ErrorCode, ExternalId, ReferralCode, ReferralRecord, User,
    UserDraft, UserId, UserValidationError, default_catalog, quote_accrual,
};

use super::backend::{BackendError, MiningBackend};
use super::cache::TimedCache;
use super::identity::{IdentityResolver, ResolveOptions};

/// Display name of the local placeholder user.
pub const FALLBACK_DISPLAY_NAME: &str = "Guest";
/// Referral code of the local placeholder user.
pub const FALLBACK_REFERRAL_CODE: &str = "LOCAL";
const FALLBACK_ID_PREFIX: &str = "local-";

/// Retry, timeout and refresh policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSessionConfig {
    /// Total resolution attempts before giving up.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
    /// Hard bound from start to a settled state.
    pub session_timeout: Duration,
    /// Settle on a local placeholder instead of failing.
    pub fallback_enabled: bool,
    /// Minimum age before [`AuthSession::refresh_user`] hits the backend.
    pub refresh_ttl: Duration,
}

impl Default for AuthSessionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            session_timeout: Duration::from_secs(5),
            fallback_enabled: true,
            refresh_ttl: Duration::from_secs(30),
        }
    }
}

/// Failures surfaced to the session's caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("authentication failed after {attempts} attempt(s)")]
    AuthenticationExhausted { attempts: u32 },
    #[error("mining backend unavailable: {message}")]
    PersistenceUnavailable { message: String },
    #[error("insufficient funds: {message}")]
    InsufficientFunds { message: String },
    #[error("unknown boost type: {message}")]
    UnknownBoostType { message: String },
    #[error("a concurrent update won; try again")]
    Conflict,
    #[error("request rejected: {message}")]
    Rejected { message: String },
    #[error("session has no user yet")]
    NotReady,
}

impl From<BackendError> for SessionError {
    fn from(error: BackendError) -> Self {
        let description = error.to_string();
        match error {
            BackendError::Rejected { code, message } => match code {
                ErrorCode::InsufficientFunds => Self::InsufficientFunds { message },
                ErrorCode::UnknownBoostType => Self::UnknownBoostType { message },
                ErrorCode::Conflict => Self::Conflict,
                ErrorCode::ServiceUnavailable => Self::PersistenceUnavailable { message },
                _ => Self::Rejected { message },
            },
            BackendError::Transport { .. } | BackendError::Timeout { .. } => {
                Self::PersistenceUnavailable {
                    message: description,
                }
            }
            BackendError::Decode { message } => Self::Rejected { message },
        }
    }
}

/// User plus the grants the session knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProfile {
    pub user: User,
    pub boosts: Vec<BoostGrant>,
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Resolving { attempt: u32 },
    Retrying { attempt: u32, delay: Duration },
    /// Backed by a persisted user.
    Authenticated(SessionProfile),
    /// Local placeholder; nothing is persisted.
    FallbackIdentity(SessionProfile),
    Failed(SessionError),
}

impl SessionState {
    /// A user is available, persisted or not.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Authenticated(_) | Self::FallbackIdentity(_))
    }

    /// No further transition happens without a restart.
    pub fn is_settled(&self) -> bool {
        self.is_ready() || matches!(self, Self::Failed(_))
    }

    /// Whether mutations reach durable storage.
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn profile(&self) -> Option<&SessionProfile> {
        match self {
            Self::Authenticated(profile) | Self::FallbackIdentity(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.profile().map(|profile| &profile.user)
    }
}

/// Parameters for one session start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOptions {
    pub resolve: ResolveOptions,
    /// Referral code passed on when the user has to be created.
    pub referred_by: Option<ReferralCode>,
}

#[derive(Debug, thiserror::Error)]
enum AttemptFailure {
    #[error("no identity source is populated")]
    NoIdentity,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl AttemptFailure {
    /// A rejection that another attempt would only repeat. A missing
    /// identity is never permanent: the host may inject it late.
    fn is_permanent(&self) -> bool {
        match self {
            Self::NoIdentity => false,
            Self::Backend(error) => !error.is_transient(),
        }
    }
}

struct Shared {
    backend: Arc<dyn MiningBackend>,
    resolver: IdentityResolver,
    clock: Arc<dyn Clock>,
    config: AuthSessionConfig,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
    attempts: AtomicU32,
    next_local_grant: AtomicI64,
    refresh: tokio::sync::Mutex<TimedCache<User>>,
}

/// Client-side session owning one user at a time.
pub struct AuthSession {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
    last_options: Mutex<StartOptions>,
}

impl AuthSession {
    pub fn new(
        backend: Arc<dyn MiningBackend>,
        resolver: IdentityResolver,
        clock: Arc<dyn Clock>,
        config: AuthSessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        let refresh = tokio::sync::Mutex::new(TimedCache::new(config.refresh_ttl));
        Self {
            shared: Arc::new(Shared {
                backend,
                resolver,
                clock,
                config,
                state,
                generation: AtomicU64::new(0),
                attempts: AtomicU32::new(0),
                next_local_grant: AtomicI64::new(1),
                refresh,
            }),
            task: Mutex::new(None),
            last_options: Mutex::new(StartOptions::default()),
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Begin a run, cancelling any run in progress. Must be called from
    /// within a Tokio runtime.
    pub fn start(&self, options: StartOptions) {
        *self
            .last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = options.clone();
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.attempts.store(0, Ordering::SeqCst);
        self.shared.state.send_replace(SessionState::Resolving { attempt: 1 });
        info!(generation, "session starting");

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move { shared.run(generation, options).await });
        self.replace_task(Some(handle));
    }

    /// Start again with the options of the previous start.
    pub fn restart(&self) {
        let options = self
            .last_options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.start(options);
    }

    /// Cancel timers and in-flight calls and return to `Idle`.
    pub fn shutdown(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.replace_task(None);
        self.shared.state.send_replace(SessionState::Idle);
        debug!("session shut down");
    }

    fn replace_task(&self, next: Option<JoinHandle<()>>) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = std::mem::replace(&mut *slot, next) {
            previous.abort();
        }
    }

    /// Wait until the session is ready or failed.
    pub async fn settled(&self) -> SessionState {
        let mut receiver = self.subscribe();
        match receiver.wait_for(SessionState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Credit elapsed mining time. Returns the points credited, which is
    /// zero when no whole hour has elapsed.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotReady`] before a user is available; otherwise the
    /// backend failure. Local state is only updated after the backend
    /// confirms.
    pub async fn claim_mining(&self) -> Result<u64, SessionError> {
        let generation = self.shared.generation();
        match self.state() {
            SessionState::Authenticated(profile) => {
                let response = self.shared.backend.claim_mining(&profile.user.id()).await?;
                info!(
                    user_id = %profile.user.id(),
                    credited = response.credited_points,
                    hours = response.credited_hours,
                    "mining claim confirmed"
                );
                self.shared.refresh.lock().await.put(response.user.clone());
                self.shared
                    .update_profile(generation, |current| current.user = response.user);
                Ok(response.credited_points)
            }
            SessionState::FallbackIdentity(_) => Ok(self.shared.claim_locally(generation)),
            _ => Err(SessionError::NotReady),
        }
    }

    /// Buy a boost for the session user.
    ///
    /// # Errors
    ///
    /// [`SessionError::InsufficientFunds`] or
    /// [`SessionError::UnknownBoostType`] leave the state untouched.
    pub async fn purchase_boost(
        &self,
        boost_definition_id: BoostDefinitionId,
    ) -> Result<BoostGrant, SessionError> {
        let generation = self.shared.generation();
        match self.state() {
            SessionState::Authenticated(profile) => {
                let receipt = self
                    .shared
                    .backend
                    .purchase_boost(&profile.user.id(), boost_definition_id)
                    .await?;
                let grant = receipt.grant.clone();
                self.shared.refresh.lock().await.put(receipt.user.clone());
                self.shared.update_profile(generation, |current| {
                    current.user = receipt.user;
                    current.boosts.push(receipt.grant);
                });
                Ok(grant)
            }
            SessionState::FallbackIdentity(_) => {
                self.shared.purchase_locally(generation, boost_definition_id)
            }
            _ => Err(SessionError::NotReady),
        }
    }

    /// Re-read the session user, at most once per refresh TTL. While the
    /// backend is briefly unreachable the last known user is returned as a
    /// read-only view.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotReady`] before a user is available, or the backend
    /// failure when nothing is cached.
    pub async fn refresh_user(&self) -> Result<User, SessionError> {
        let generation = self.shared.generation();
        match self.state() {
            SessionState::Authenticated(profile) => {
                let mut cache = self.shared.refresh.lock().await;
                if let Some(user) = cache.fresh() {
                    return Ok(user.clone());
                }
                let user = match self.shared.backend.find_user(&profile.user.id()).await {
                    Ok(user) => user,
                    Err(error) if error.is_transient() => {
                        let Some(stale) = cache.last() else {
                            return Err(error.into());
                        };
                        warn!(%error, "refresh failed; serving the last known user");
                        return Ok(stale.clone());
                    }
                    Err(error) => return Err(error.into()),
                };
                cache.put(user.clone());
                let refreshed = user.clone();
                self.shared
                    .update_profile(generation, |current| current.user = refreshed);
                Ok(user)
            }
            SessionState::FallbackIdentity(profile) => Ok(profile.user),
            _ => Err(SessionError::NotReady),
        }
    }

    /// Boosts on sale. A fallback session offers the built-in catalog.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotReady`] before a user is available, or the backend
    /// failure.
    pub async fn boost_catalog(&self) -> Result<Vec<BoostDefinition>, SessionError> {
        match self.state() {
            SessionState::Authenticated(_) => Ok(self.shared.backend.boost_catalog().await?),
            SessionState::FallbackIdentity(_) => Ok(local_catalog().collect()),
            _ => Err(SessionError::NotReady),
        }
    }

    /// Referrals credited to the session user. Always empty for a
    /// fallback user.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotReady`] before a user is available, or the backend
    /// failure.
    pub async fn list_referrals(&self) -> Result<Vec<ReferralRecord>, SessionError> {
        match self.state() {
            SessionState::Authenticated(profile) => Ok(self
                .shared
                .backend
                .list_referrals(&profile.user.id())
                .await?),
            SessionState::FallbackIdentity(_) => Ok(Vec::new()),
            _ => Err(SessionError::NotReady),
        }
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        self.replace_task(None);
    }
}

impl Shared {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Replace the state unless the run that computed it was superseded.
    fn publish(&self, generation: u64, next: SessionState) -> bool {
        let published = self.state.send_if_modified(|current| {
            if self.generation() != generation {
                return false;
            }
            *current = next;
            true
        });
        if !published {
            debug!(generation, "discarded state from a superseded run");
        }
        published
    }

    /// Mutate the ready profile in place. Returns whether it was applied.
    fn update_profile(&self, generation: u64, apply: impl FnOnce(&mut SessionProfile)) -> bool {
        self.state.send_if_modified(|current| {
            if self.generation() != generation {
                return false;
            }
            match current {
                SessionState::Authenticated(profile) | SessionState::FallbackIdentity(profile) => {
                    apply(profile);
                    true
                }
                _ => false,
            }
        })
    }

    async fn run(&self, generation: u64, options: StartOptions) {
        self.refresh.lock().await.invalidate();
        let deadline = Instant::now() + self.config.session_timeout;
        let outcome =
            tokio::time::timeout_at(deadline, self.authenticate(generation, &options)).await;
        let user = match outcome {
            Ok(Ok(user)) => user,
            Ok(Err(error)) => return self.settle_unauthenticated(generation, error),
            Err(_) => {
                let attempts = self.attempts.load(Ordering::SeqCst);
                warn!(
                    generation,
                    attempts,
                    timeout = ?self.config.session_timeout,
                    "session timed out before authenticating"
                );
                return self.settle_unauthenticated(
                    generation,
                    SessionError::AuthenticationExhausted { attempts },
                );
            }
        };
        let profile = self.establish(user, deadline).await;
        info!(user_id = %profile.user.id(), "session authenticated");
        self.publish(generation, SessionState::Authenticated(profile));
    }

    fn settle_unauthenticated(&self, generation: u64, error: SessionError) {
        if !self.config.fallback_enabled {
            warn!(%error, "session failed");
            self.publish(generation, SessionState::Failed(error));
            return;
        }
        match fallback_user(self.clock.utc()) {
            Ok(user) => {
                info!(external_id = %user.external_id(), "continuing with a local fallback user");
                self.publish(
                    generation,
                    SessionState::FallbackIdentity(SessionProfile {
                        user,
                        boosts: Vec::new(),
                    }),
                );
            }
            Err(reason) => {
                warn!(%reason, "fallback user could not be built");
                self.publish(generation, SessionState::Failed(error));
            }
        }
    }

    /// Load boosts, then claim if due, for an authenticated user. Both
    /// steps share what is left of the session deadline; a failure or an
    /// overrun is logged and the user is kept as authenticated.
    async fn establish(&self, user: User, deadline: Instant) -> SessionProfile {
        let user_id = user.id();
        let boosts = match tokio::time::timeout_at(
            deadline,
            self.backend.list_active_boosts(&user_id, None),
        )
        .await
        {
            Ok(Ok(boosts)) => boosts,
            Ok(Err(error)) => {
                warn!(%user_id, %error, "active boosts unavailable");
                Vec::new()
            }
            Err(_) => {
                warn!(%user_id, "active boosts did not arrive before the session deadline");
                Vec::new()
            }
        };

        let user = if quote_accrual(&user, &boosts, self.clock.utc()).is_some() {
            match tokio::time::timeout_at(deadline, self.backend.claim_mining(&user_id)).await {
                Ok(Ok(response)) => {
                    info!(
                        %user_id,
                        credited = response.credited_points,
                        "accrual claimed at session start"
                    );
                    response.user
                }
                Ok(Err(error)) => {
                    warn!(%user_id, %error, "accrual at session start failed");
                    user
                }
                Err(_) => {
                    warn!(%user_id, "accrual at session start overran the session deadline");
                    user
                }
            }
        } else {
            user
        };

        self.refresh.lock().await.put(user.clone());
        SessionProfile { user, boosts }
    }

    async fn authenticate(
        &self,
        generation: u64,
        options: &StartOptions,
    ) -> Result<User, SessionError> {
        let max_attempts = self.config.max_retries.max(1);
        for attempt in 1..=max_attempts {
            self.attempts.store(attempt, Ordering::SeqCst);
            self.publish(generation, SessionState::Resolving { attempt });
            match self.attempt(options).await {
                Ok(user) => return Ok(user),
                Err(reason) if reason.is_permanent() => {
                    warn!(attempt, %reason, "authentication rejected; not retrying");
                    return Err(SessionError::AuthenticationExhausted { attempts: attempt });
                }
                Err(reason) => warn!(attempt, max_attempts, %reason, "authentication attempt failed"),
            }
            if attempt < max_attempts {
                let delay = self.config.retry_delay;
                self.publish(generation, SessionState::Retrying { attempt, delay });
                tokio::time::sleep(delay).await;
            }
        }
        Err(SessionError::AuthenticationExhausted {
            attempts: max_attempts,
        })
    }

    async fn attempt(&self, options: &StartOptions) -> Result<User, AttemptFailure> {
        let candidate = self
            .resolver
            .resolve(&options.resolve)
            .ok_or(AttemptFailure::NoIdentity)?;
        if let Some(user) = self.backend.lookup_user(&candidate.external_id).await? {
            return Ok(user);
        }
        let request = CreateUserRequest {
            external_id: candidate.external_id,
            display_name: candidate.display_name,
            avatar_url: candidate.avatar_url,
            referred_by: options.referred_by.clone(),
        };
        let response = self.backend.create_user(&request).await?;
        debug!(created = response.created, "user registered");
        Ok(response.user)
    }

    fn claim_locally(&self, generation: u64) -> u64 {
        let now = self.clock.utc();
        let mut credited = 0;
        self.update_profile(generation, |profile| {
            if let Some(quote) = quote_accrual(&profile.user, &profile.boosts, now) {
                if profile.user.apply_accrual(&quote) {
                    credited = quote.earned();
                }
            }
        });
        debug!(credited, "local accrual applied");
        credited
    }

    fn purchase_locally(
        &self,
        generation: u64,
        boost_definition_id: BoostDefinitionId,
    ) -> Result<BoostGrant, SessionError> {
        let unknown = || SessionError::UnknownBoostType {
            message: format!("no boost with id {}", boost_definition_id.get()),
        };
        let definition = local_catalog()
            .find(|definition| definition.id() == boost_definition_id)
            .ok_or_else(unknown)?;

        let now = self.clock.utc();
        let grant_id = BoostGrantId::new(self.next_local_grant.fetch_add(1, Ordering::SeqCst));
        let mut outcome = Err(SessionError::NotReady);
        self.update_profile(generation, |profile| {
            outcome = local_grant(profile, &definition, grant_id, now);
        });
        outcome
    }
}

/// Active definitions of the built-in catalog.
fn local_catalog() -> impl Iterator<Item = BoostDefinition> {
    default_catalog()
        .into_iter()
        .filter_map(|draft| BoostDefinition::new(draft).ok())
        .filter(BoostDefinition::is_active)
}

fn local_grant(
    profile: &mut SessionProfile,
    definition: &BoostDefinition,
    grant_id: BoostGrantId,
    now: DateTime<Utc>,
) -> Result<BoostGrant, SessionError> {
    let (start_time, end_time) = definition.window_from(now);
    let grant = BoostGrant::new(BoostGrantDraft {
        id: grant_id,
        user_id: profile.user.id(),
        boost_definition_id: definition.id(),
        multiplier: definition.multiplier(),
        start_time,
        end_time,
        active: true,
    })
    .map_err(|err| SessionError::Rejected {
        message: err.to_string(),
    })?;
    let balance = profile.user.points();
    if !profile.user.debit_for_boost(definition.price()) {
        return Err(SessionError::InsufficientFunds {
            message: format!("balance {balance} is below price {}", definition.price()),
        });
    }
    profile.boosts.push(grant.clone());
    Ok(grant)
}

/// Placeholder user for a session that could not authenticate.
fn fallback_user(now: DateTime<Utc>) -> Result<User, UserValidationError> {
    User::new(UserDraft {
        id: UserId::random(),
        external_id: ExternalId::new(format!("{FALLBACK_ID_PREFIX}{}", Uuid::new_v4()))?,
        display_name: DisplayName::new(FALLBACK_DISPLAY_NAME)?,
        avatar_url: None,
        points: 0,
        mining_speed: DEFAULT_MINING_SPEED,
        last_accrual_time: now,
        referral_code: ReferralCode::new(FALLBACK_REFERRAL_CODE)?,
        referred_by: None,
        completed_tasks_count: 0,
        boost_usage_count: 0,
        created_at: now,
    })
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
