//! Driving port for user lookup and idempotent creation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{DisplayName, Error, ExternalId, ReferralCode, User, UserId};

/// Payload for [`UserDirectory::create_user`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub external_id: ExternalId,
    #[serde(default)]
    pub display_name: DisplayName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Url>,
    /// Referral code of the user who invited this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<ReferralCode>,
}

/// Response for [`UserDirectory::create_user`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub user: User,
    /// `false` when the external id was already registered.
    pub created: bool,
}

/// Use-cases for finding and registering users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look a user up by host identity; `not_found` when absent.
    async fn find_by_external_id(&self, external_id: &ExternalId) -> Result<User, Error>;

    /// Look a user up by id; `not_found` when absent.
    async fn find_by_id(&self, user_id: &UserId) -> Result<User, Error>;

    /// Create a user, or return the existing one for the same external id.
    /// Referral bonuses are applied only on first creation.
    async fn create_user(&self, request: CreateUserRequest) -> Result<CreateUserResponse, Error>;
}
