//! Driving port for referral listings.

use async_trait::async_trait;

use crate::domain::{Error, ReferralRecord, UserId};

/// Read referrals credited to a user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferralQuery: Send + Sync {
    async fn list_referrals(&self, referrer_id: &UserId) -> Result<Vec<ReferralRecord>, Error>;
}
