//! Referral bonus application and referral listings.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::mining_service::map_user_repository_error;
use crate::domain::ports::{
    ReferralQuery, ReferralRepository, ReferralRepositoryError, UserRepository,
};
use crate::domain::{Error, NewReferral, ReferralPolicy, ReferralRecord, User, UserId};

fn map_referral_repository_error(error: ReferralRepositoryError) -> Error {
    match error {
        ReferralRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("referral repository unavailable: {message}"))
        }
        ReferralRepositoryError::Query { message } => {
            Error::internal(format!("referral repository error: {message}"))
        }
    }
}

/// Credits referrers when a referred user is first created.
///
/// Failures are logged and swallowed: a broken referral must never block
/// the sign-up that triggered it.
#[derive(Clone)]
pub struct ReferralBonusApplier<U, R> {
    users: Arc<U>,
    referrals: Arc<R>,
    clock: Arc<dyn Clock>,
    policy: ReferralPolicy,
}

impl<U, R> ReferralBonusApplier<U, R> {
    pub fn new(users: Arc<U>, referrals: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            referrals,
            clock,
            policy: ReferralPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ReferralPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<U, R> ReferralBonusApplier<U, R>
where
    U: UserRepository,
    R: ReferralRepository,
{
    /// Apply the bonus for a signed-up user, if their referral code
    /// resolves to someone else. Repeating it is harmless: the repository
    /// records at most one referral per referred user.
    pub async fn apply(&self, new_user: &User) -> Option<ReferralRecord> {
        let code = new_user.referred_by()?;
        let candidates = match self.users.find_by_referral_code(code).await {
            Ok(candidates) => candidates,
            Err(error) => {
                warn!(%error, code = %code, "referral lookup failed; skipping bonus");
                return None;
            }
        };
        if candidates.len() > 1 {
            warn!(
                code = %code,
                matches = candidates.len(),
                "referral code is shared; crediting the oldest holder only"
            );
        }
        let Some(referrer) = candidates
            .into_iter()
            .filter(|candidate| candidate.id() != new_user.id())
            .min_by_key(|candidate| (candidate.created_at(), candidate.id()))
        else {
            debug!(code = %code, referred = %new_user.id(), "referral code did not resolve");
            return None;
        };

        let referral = NewReferral {
            referrer_id: referrer.id(),
            referred_id: new_user.id(),
            policy: self.policy,
            created_at: self.clock.utc(),
        };
        match self.referrals.record_referral(&referral).await {
            Ok(Some(record)) => {
                info!(
                    referrer = %record.referrer_id,
                    referred = %record.referred_id,
                    bonus = record.bonus_points,
                    "referral bonus applied"
                );
                Some(record)
            }
            Ok(None) => {
                debug!(referred = %new_user.id(), "referral already recorded");
                None
            }
            Err(error) => {
                warn!(%error, referred = %new_user.id(), "referral bonus not applied");
                None
            }
        }
    }
}

/// Referral listing service implementing [`ReferralQuery`].
#[derive(Clone)]
pub struct ReferralQueryService<U, R> {
    users: Arc<U>,
    referrals: Arc<R>,
}

impl<U, R> ReferralQueryService<U, R> {
    pub fn new(users: Arc<U>, referrals: Arc<R>) -> Self {
        Self { users, referrals }
    }
}

#[async_trait]
impl<U, R> ReferralQuery for ReferralQueryService<U, R>
where
    U: UserRepository,
    R: ReferralRepository,
{
    async fn list_referrals(&self, referrer_id: &UserId) -> Result<Vec<ReferralRecord>, Error> {
        self.users
            .find_by_id(referrer_id)
            .await
            .map_err(map_user_repository_error)?
            .ok_or_else(|| Error::not_found(format!("user {referrer_id} not found")))?;
        self.referrals
            .list_referrals(referrer_id)
            .await
            .map_err(map_referral_repository_error)
    }
}

#[cfg(test)]
#[path = "referral_service_tests.rs"]
mod tests;
