//! Port for the boost catalogue and the grant ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{BoostDefinition, BoostDefinitionId, BoostGrant, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by boost repository adapters.
    pub enum BoostRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "boost repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "boost repository query failed: {message}",
    }
}

/// Purchase to execute as one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub user_id: UserId,
    pub definition: BoostDefinition,
    pub start_time: DateTime<Utc>,
}

/// Outcome of [`BoostRepository::purchase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// Price debited and grant stored.
    Granted { grant: BoostGrant, user: User },
    /// Balance below price at the time of the debit; nothing was written.
    InsufficientFunds { balance: u64, price: u64 },
    /// No user with the requested id.
    UserMissing,
}

/// Port for boost definitions and grants.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoostRepository: Send + Sync {
    /// Catalogue entries ordered by id; inactive ones only when asked.
    async fn list_definitions(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<BoostDefinition>, BoostRepositoryError>;

    async fn find_definition(
        &self,
        id: BoostDefinitionId,
    ) -> Result<Option<BoostDefinition>, BoostRepositoryError>;

    /// Grants whose window contains `as_of` (`start_time <= as_of < end_time`),
    /// ordered by id. The swept `active` flag is not consulted.
    async fn list_live_grants(
        &self,
        user_id: &UserId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<BoostGrant>, BoostRepositoryError>;

    /// Debit the price, bump the usage count and store the grant atomically.
    async fn purchase(
        &self,
        request: &PurchaseRequest,
    ) -> Result<PurchaseOutcome, BoostRepositoryError>;

    /// Clear the `active` flag of every grant with `end_time <= now`.
    /// Returns the number of grants flipped.
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, BoostRepositoryError>;
}
