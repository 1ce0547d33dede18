//! Boost ledger service: purchases, catalogue reads and expiry sweeps.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::mining_service::map_boost_repository_error;
use crate::domain::ports::{
    BoostCommand, BoostQuery, BoostRepository, PurchaseOutcome, PurchaseReceipt, PurchaseRequest,
};
use crate::domain::{BoostDefinition, BoostDefinitionId, BoostGrant, Error, UserId};

/// Boost service implementing [`BoostCommand`] and [`BoostQuery`].
#[derive(Clone)]
pub struct BoostService<B> {
    boosts: Arc<B>,
    clock: Arc<dyn Clock>,
}

impl<B> BoostService<B> {
    pub fn new(boosts: Arc<B>, clock: Arc<dyn Clock>) -> Self {
        Self { boosts, clock }
    }
}

impl<B> BoostService<B>
where
    B: BoostRepository,
{
    /// Flip the `active` flag of grants whose window closed at or before now.
    ///
    /// The flag is informational; accrual never relies on it.
    pub async fn sweep_expired(&self) -> Result<u64, Error> {
        let now = self.clock.utc();
        let flipped = self
            .boosts
            .deactivate_expired(now)
            .await
            .map_err(map_boost_repository_error)?;
        if flipped > 0 {
            info!(flipped, cutoff = %now, "expired boost grants deactivated");
        } else {
            debug!(cutoff = %now, "no expired boost grants to deactivate");
        }
        Ok(flipped)
    }

    async fn purchasable_definition(
        &self,
        id: BoostDefinitionId,
    ) -> Result<BoostDefinition, Error> {
        self.boosts
            .find_definition(id)
            .await
            .map_err(map_boost_repository_error)?
            .filter(BoostDefinition::is_active)
            .ok_or_else(|| Error::unknown_boost_type(format!("boost {id} is not available")))
    }
}

#[async_trait]
impl<B> BoostCommand for BoostService<B>
where
    B: BoostRepository,
{
    async fn purchase(
        &self,
        user_id: &UserId,
        boost_definition_id: BoostDefinitionId,
    ) -> Result<PurchaseReceipt, Error> {
        let definition = self.purchasable_definition(boost_definition_id).await?;
        let request = PurchaseRequest {
            user_id: *user_id,
            definition,
            start_time: self.clock.utc(),
        };

        match self
            .boosts
            .purchase(&request)
            .await
            .map_err(map_boost_repository_error)?
        {
            PurchaseOutcome::Granted { grant, user } => {
                info!(
                    %user_id,
                    boost = %boost_definition_id,
                    grant = grant.id().get(),
                    ends = %grant.end_time(),
                    "boost purchased"
                );
                Ok(PurchaseReceipt { grant, user })
            }
            PurchaseOutcome::InsufficientFunds { balance, price } => {
                Err(Error::insufficient_funds(format!(
                    "boost {boost_definition_id} costs {price} points but the balance is {balance}"
                ))
                .with_details(json!({ "balance": balance, "price": price })))
            }
            PurchaseOutcome::UserMissing => {
                Err(Error::not_found(format!("user {user_id} not found")))
            }
        }
    }
}

#[async_trait]
impl<B> BoostQuery for BoostService<B>
where
    B: BoostRepository,
{
    async fn catalog(&self) -> Result<Vec<BoostDefinition>, Error> {
        self.boosts
            .list_definitions(false)
            .await
            .map_err(map_boost_repository_error)
    }

    async fn active_boosts(
        &self,
        user_id: &UserId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<BoostGrant>, Error> {
        let as_of = as_of.unwrap_or_else(|| self.clock.utc());
        self.boosts
            .list_live_grants(user_id, as_of)
            .await
            .map_err(map_boost_repository_error)
    }
}

#[cfg(test)]
#[path = "boost_service_tests.rs"]
mod tests;
