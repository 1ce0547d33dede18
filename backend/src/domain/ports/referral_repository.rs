//! Port for referral records.

use async_trait::async_trait;

use crate::domain::{NewReferral, ReferralRecord, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by referral repository adapters.
    pub enum ReferralRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "referral repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "referral repository query failed: {message}",
    }
}

/// Port for recording referrals and crediting referrers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Record the referral and credit the referrer in one transaction.
    ///
    /// Returns `None` without crediting anyone when the referred user
    /// already has a record.
    async fn record_referral(
        &self,
        referral: &NewReferral,
    ) -> Result<Option<ReferralRecord>, ReferralRepositoryError>;

    /// Referrals credited to `referrer_id`, oldest first.
    async fn list_referrals(
        &self,
        referrer_id: &UserId,
    ) -> Result<Vec<ReferralRecord>, ReferralRepositoryError>;
}
