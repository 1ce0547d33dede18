//! Mining claim service.
//!
//! Claims are optimistic: read the user and the grants live now, quote the
//! accrual, then commit it with a compare-and-swap on the checkpoint. A lost
//! race re-reads and re-quotes; the loser of two concurrent claims therefore
//! sees the advanced checkpoint and credits only what is still owed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    AccrualCommit, BoostRepository, BoostRepositoryError, ClaimMiningResponse, MiningCommand,
    UserRepository, UserRepositoryError,
};
use crate::domain::{Error, User, UserId, quote_accrual};

/// Default number of compare-and-swap attempts per claim.
pub const DEFAULT_MAX_ACCRUAL_ATTEMPTS: u32 = 3;

pub(crate) fn map_user_repository_error(error: UserRepositoryError) -> Error {
    match error {
        UserRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserRepositoryError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserRepositoryError::DuplicateReferralCode { code } => {
            Error::internal(format!("referral code collision: {code}"))
        }
    }
}

pub(crate) fn map_boost_repository_error(error: BoostRepositoryError) -> Error {
    match error {
        BoostRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("boost repository unavailable: {message}"))
        }
        BoostRepositoryError::Query { message } => {
            Error::internal(format!("boost repository error: {message}"))
        }
    }
}

/// Mining service implementing [`MiningCommand`].
#[derive(Clone)]
pub struct MiningService<U, B> {
    users: Arc<U>,
    boosts: Arc<B>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl<U, B> MiningService<U, B> {
    pub fn new(users: Arc<U>, boosts: Arc<B>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            boosts,
            clock,
            max_attempts: DEFAULT_MAX_ACCRUAL_ATTEMPTS,
        }
    }

    /// Override the number of compare-and-swap attempts (at least one).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

fn response(user: User, credited_points: u64, credited_hours: i64, rate: u64) -> ClaimMiningResponse {
    let next_accrual_at = user.last_accrual_time() + Duration::hours(1);
    ClaimMiningResponse {
        user,
        credited_points,
        credited_hours,
        rate_per_hour: rate,
        next_accrual_at,
    }
}

#[async_trait]
impl<U, B> MiningCommand for MiningService<U, B>
where
    U: UserRepository,
    B: BoostRepository,
{
    async fn claim(&self, user_id: &UserId) -> Result<ClaimMiningResponse, Error> {
        for attempt in 1..=self.max_attempts {
            let user = self
                .users
                .find_by_id(user_id)
                .await
                .map_err(map_user_repository_error)?
                .ok_or_else(|| Error::not_found(format!("user {user_id} not found")))?;
            let now = self.clock.utc();
            let grants = self
                .boosts
                .list_live_grants(user_id, now)
                .await
                .map_err(map_boost_repository_error)?;

            let Some(quote) = quote_accrual(&user, &grants, now) else {
                debug!(%user_id, "mining claim not due");
                let rate = crate::domain::effective_rate(user.mining_speed(), &grants, now);
                return Ok(response(user, 0, 0, rate));
            };

            let commit = AccrualCommit::from_quote(user.id(), &quote);
            match self
                .users
                .commit_accrual(&commit)
                .await
                .map_err(map_user_repository_error)?
            {
                Some(updated) => {
                    info!(
                        %user_id,
                        credited = quote.earned(),
                        hours = quote.elapsed_hours(),
                        rate = quote.rate(),
                        checkpoint = %quote.to(),
                        "mining accrual committed"
                    );
                    return Ok(response(
                        updated,
                        quote.earned(),
                        quote.elapsed_hours(),
                        quote.rate(),
                    ));
                }
                None => {
                    warn!(%user_id, attempt, "accrual checkpoint moved; retrying claim");
                }
            }
        }

        Err(Error::conflict(
            "mining claim kept colliding with concurrent claims; try again",
        ))
    }
}

#[cfg(test)]
#[path = "mining_service_tests.rs"]
mod tests;
