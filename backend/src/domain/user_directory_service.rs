//! User directory service: lookups and idempotent registration.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::mining_service::map_user_repository_error;
use crate::domain::ports::{
    CreateUserRequest, CreateUserResponse, InsertUserOutcome, ReferralRepository, UserDirectory,
    UserRepository, UserRepositoryError,
};
use crate::domain::referral_service::ReferralBonusApplier;
use crate::domain::{Error, ExternalId, ReferralCode, User, UserDraft, UserId};

/// Default base mining speed for new users, in points per hour.
pub const DEFAULT_MINING_SPEED: u32 = 10;
const REFERRAL_CODE_ATTEMPTS: u32 = 5;

/// Values assigned to every newly created user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewUserDefaults {
    pub mining_speed: u32,
}

impl Default for NewUserDefaults {
    fn default() -> Self {
        Self {
            mining_speed: DEFAULT_MINING_SPEED,
        }
    }
}

/// Service implementing [`UserDirectory`].
#[derive(Clone)]
pub struct UserDirectoryService<U, R> {
    users: Arc<U>,
    referrals: ReferralBonusApplier<U, R>,
    clock: Arc<dyn Clock>,
    defaults: NewUserDefaults,
}

impl<U, R> UserDirectoryService<U, R> {
    pub fn new(
        users: Arc<U>,
        referrals: ReferralBonusApplier<U, R>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            referrals,
            clock,
            defaults: NewUserDefaults::default(),
        }
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: NewUserDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

impl<U, R> UserDirectoryService<U, R> {
    fn draft_user(&self, request: &CreateUserRequest) -> Result<User, Error> {
        let now = self.clock.utc();
        User::new(UserDraft {
            id: UserId::random(),
            external_id: request.external_id.clone(),
            display_name: request.display_name.clone(),
            avatar_url: request.avatar_url.clone(),
            points: 0,
            mining_speed: self.defaults.mining_speed,
            last_accrual_time: now,
            referral_code: ReferralCode::generate(),
            referred_by: request.referred_by.clone(),
            completed_tasks_count: 0,
            boost_usage_count: 0,
            created_at: now,
        })
        .map_err(|err| Error::invalid_request(format!("invalid user: {err}")))
    }
}

impl<U, R> UserDirectoryService<U, R>
where
    U: UserRepository,
    R: ReferralRepository,
{
    /// Answer a repeated sign-up. The referral is replayed so a bonus lost
    /// to a failed write on the first call is still granted once.
    async fn existing(&self, user: User) -> CreateUserResponse {
        if user.referred_by().is_some() {
            self.referrals.apply(&user).await;
        }
        CreateUserResponse {
            user,
            created: false,
        }
    }
}

#[async_trait]
impl<U, R> UserDirectory for UserDirectoryService<U, R>
where
    U: UserRepository,
    R: ReferralRepository,
{
    async fn find_by_external_id(&self, external_id: &ExternalId) -> Result<User, Error> {
        self.users
            .find_by_external_id(external_id)
            .await
            .map_err(map_user_repository_error)?
            .ok_or_else(|| Error::not_found(format!("no user with external id {external_id}")))
    }

    async fn find_by_id(&self, user_id: &UserId) -> Result<User, Error> {
        self.users
            .find_by_id(user_id)
            .await
            .map_err(map_user_repository_error)?
            .ok_or_else(|| Error::not_found(format!("user {user_id} not found")))
    }

    async fn create_user(&self, request: CreateUserRequest) -> Result<CreateUserResponse, Error> {
        if let Some(user) = self
            .users
            .find_by_external_id(&request.external_id)
            .await
            .map_err(map_user_repository_error)?
        {
            return Ok(self.existing(user).await);
        }

        for attempt in 1..=REFERRAL_CODE_ATTEMPTS {
            let candidate = self.draft_user(&request)?;
            match self.users.insert(&candidate).await {
                Ok(InsertUserOutcome::Created(user)) => {
                    info!(
                        user_id = %user.id(),
                        external_id = %user.external_id(),
                        referred = user.referred_by().is_some(),
                        "user created"
                    );
                    self.referrals.apply(&user).await;
                    return Ok(CreateUserResponse {
                        user,
                        created: true,
                    });
                }
                Ok(InsertUserOutcome::Existing(user)) => return Ok(self.existing(user).await),
                Err(UserRepositoryError::DuplicateReferralCode { code }) => {
                    warn!(%code, attempt, "referral code collision; regenerating");
                }
                Err(error) => return Err(map_user_repository_error(error)),
            }
        }

        Err(Error::internal("could not allocate a unique referral code"))
    }
}

#[cfg(test)]
#[path = "user_directory_service_tests.rs"]
mod tests;
