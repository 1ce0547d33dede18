//! Driving ports for boost purchases and reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BoostDefinition, BoostDefinitionId, BoostGrant, Error, User, UserId};

/// Receipt for a successful purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub grant: BoostGrant,
    /// Buyer after the debit.
    pub user: User,
}

/// Boost purchase use-case.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoostCommand: Send + Sync {
    /// Fails with `insufficient_funds` or `unknown_boost_type` without
    /// mutating anything.
    async fn purchase(
        &self,
        user_id: &UserId,
        boost_definition_id: BoostDefinitionId,
    ) -> Result<PurchaseReceipt, Error>;
}

/// Boost read use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BoostQuery: Send + Sync {
    /// Purchasable catalogue entries.
    async fn catalog(&self) -> Result<Vec<BoostDefinition>, Error>;

    /// Grants live for `user_id` at `as_of` (defaults to now).
    async fn active_boosts(
        &self,
        user_id: &UserId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<BoostGrant>, Error>;
}
