//! Port through which the client session reaches the mining API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    ClaimMiningResponse, CreateUserRequest, CreateUserResponse, PurchaseReceipt,
    define_port_error,
};
use crate::domain::{
    BoostDefinition, BoostDefinitionId, BoostGrant, ErrorCode, ExternalId, ReferralRecord, UserId,
    User,
};

define_port_error! {
    /// Errors raised by mining backend adapters.
    pub enum BackendError {
        /// The request never produced a response.
        Transport { message: String } => "mining backend unreachable: {message}",
        /// The request did not complete within the client timeout.
        Timeout { message: String } => "mining backend timed out: {message}",
        /// The server answered with a domain error.
        Rejected { code: ErrorCode, message: String } => "mining backend rejected the request: {message}",
        /// The response body did not match the expected shape.
        Decode { message: String } => "mining backend response could not be decoded: {message}",
    }
}

impl BackendError {
    /// Whether retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Rejected { code, .. } => {
                matches!(
                    code,
                    ErrorCode::ServiceUnavailable | ErrorCode::Conflict | ErrorCode::InternalError
                )
            }
            Self::Decode { .. } => false,
        }
    }

    /// Domain code carried by a rejection.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Collaborator operations the session depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MiningBackend: Send + Sync {
    /// `Ok(None)` when no user holds `external_id`.
    async fn lookup_user(&self, external_id: &ExternalId) -> Result<Option<User>, BackendError>;

    /// Idempotent on the external id.
    async fn create_user(
        &self,
        request: &CreateUserRequest,
    ) -> Result<CreateUserResponse, BackendError>;

    async fn find_user(&self, user_id: &UserId) -> Result<User, BackendError>;

    /// Credit elapsed hours and advance the checkpoint atomically.
    async fn claim_mining(&self, user_id: &UserId) -> Result<ClaimMiningResponse, BackendError>;

    async fn boost_catalog(&self) -> Result<Vec<BoostDefinition>, BackendError>;

    async fn list_active_boosts(
        &self,
        user_id: &UserId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<BoostGrant>, BackendError>;

    async fn purchase_boost(
        &self,
        user_id: &UserId,
        boost_definition_id: BoostDefinitionId,
    ) -> Result<PurchaseReceipt, BackendError>;

    async fn list_referrals(&self, user_id: &UserId) -> Result<Vec<ReferralRecord>, BackendError>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(BackendError::transport("refused"), true)]
    #[case(BackendError::timeout("5s"), true)]
    #[case(BackendError::rejected(ErrorCode::ServiceUnavailable, "db down"), true)]
    #[case(BackendError::rejected(ErrorCode::InternalError, "boom"), true)]
    #[case(BackendError::rejected(ErrorCode::InvalidRequest, "bad id"), false)]
    #[case(BackendError::rejected(ErrorCode::InsufficientFunds, "short"), false)]
    #[case(BackendError::decode("not json"), false)]
    fn transient_failures_are_classified(#[case] error: BackendError, #[case] transient: bool) {
        assert_eq!(error.is_transient(), transient);
    }

    #[rstest]
    fn rejection_exposes_its_code() {
        let error = BackendError::rejected(ErrorCode::UnknownBoostType, "no such boost");
        assert_eq!(error.code(), Some(ErrorCode::UnknownBoostType));
        assert_eq!(BackendError::transport("x").code(), None);
    }
}
