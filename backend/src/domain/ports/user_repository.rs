//! Port for user persistence and the atomic accrual commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AccrualQuote, ExternalId, ReferralCode, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// The generated referral code collided with an existing user.
        DuplicateReferralCode { code: String } => "referral code {code} is already taken",
    }
}

/// Result of an idempotent insert keyed on the external identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertUserOutcome {
    /// No user held the external id; the supplied record was stored.
    Created(User),
    /// A user with the same external id already existed and is returned
    /// unchanged.
    Existing(User),
}

impl InsertUserOutcome {
    pub fn user(&self) -> &User {
        match self {
            Self::Created(user) | Self::Existing(user) => user,
        }
    }

    pub fn into_user(self) -> User {
        match self {
            Self::Created(user) | Self::Existing(user) => user,
        }
    }
}

/// Compare-and-swap accrual write.
///
/// Applied only while the stored checkpoint still equals
/// `expected_checkpoint`; the points increment and the checkpoint advance
/// land together or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualCommit {
    pub user_id: UserId,
    pub expected_checkpoint: DateTime<Utc>,
    pub new_checkpoint: DateTime<Utc>,
    pub earned: u64,
}

impl AccrualCommit {
    pub fn from_quote(user_id: UserId, quote: &AccrualQuote) -> Self {
        Self {
            user_id,
            expected_checkpoint: quote.from(),
            new_checkpoint: quote.to(),
            earned: quote.earned(),
        }
    }
}

/// Port for reading and writing user accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by primary key.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError>;

    /// Find a user by the identity assigned by the host platform.
    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, UserRepositoryError>;

    /// Every user holding `code`, oldest first (ties broken by id).
    ///
    /// Codes are unique in practice; callers must still cope with several
    /// matches.
    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Vec<User>, UserRepositoryError>;

    /// Insert `user` unless its external id is already taken.
    async fn insert(&self, user: &User) -> Result<InsertUserOutcome, UserRepositoryError>;

    /// Apply an accrual if the checkpoint is unchanged.
    ///
    /// Returns the updated user, or `None` when the checkpoint moved (or the
    /// user vanished) and nothing was written.
    async fn commit_accrual(
        &self,
        commit: &AccrualCommit,
    ) -> Result<Option<User>, UserRepositoryError>;
}
