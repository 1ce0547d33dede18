//! PostgreSQL-backed `BoostRepository` implementation using Diesel ORM.
//!
//! Purchases run in one transaction: a conditional debit guarded by
//! `points >= price`, then the grant insert. A debit that matches no row
//! leaves nothing behind, so the outcome is read back without a rollback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;

use crate::domain::ports::{
    BoostRepository, BoostRepositoryError, PurchaseOutcome, PurchaseRequest,
};
use crate::domain::{BoostDefinition, BoostDefinitionId, BoostGrant, User, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{BoostDefinitionRow, BoostGrantRow, NewBoostGrantRow, UserRow, convert_int};
use super::pool::{DbPool, PoolError};
use super::schema::{boost_definitions, boost_grants, users};

/// Diesel-backed implementation of the boost repository port.
#[derive(Clone)]
pub struct DieselBoostRepository {
    pool: DbPool,
}

impl DieselBoostRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Rows produced inside the purchase transaction, converted afterwards.
enum PurchaseRows {
    Granted(BoostGrantRow, UserRow),
    Short(i64),
    Missing,
}

fn map_pool(error: PoolError) -> BoostRepositoryError {
    map_pool_error(error, |message| BoostRepositoryError::connection(message))
}

fn map_diesel(error: diesel::result::Error) -> BoostRepositoryError {
    map_diesel_error(
        error,
        BoostRepositoryError::query,
        BoostRepositoryError::connection,
    )
}

fn to_definition(row: BoostDefinitionRow) -> Result<BoostDefinition, BoostRepositoryError> {
    BoostDefinition::try_from(row).map_err(BoostRepositoryError::query)
}

fn to_grant(row: BoostGrantRow) -> Result<BoostGrant, BoostRepositoryError> {
    BoostGrant::try_from(row).map_err(BoostRepositoryError::query)
}

#[async_trait]
impl BoostRepository for DieselBoostRepository {
    async fn list_definitions(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<BoostDefinition>, BoostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let mut query = boost_definitions::table
            .select(BoostDefinitionRow::as_select())
            .order(boost_definitions::id.asc())
            .into_boxed();
        if !include_inactive {
            query = query.filter(boost_definitions::active.eq(true));
        }
        let rows: Vec<BoostDefinitionRow> = query.load(&mut conn).await.map_err(map_diesel)?;
        rows.into_iter().map(to_definition).collect()
    }

    async fn find_definition(
        &self,
        id: BoostDefinitionId,
    ) -> Result<Option<BoostDefinition>, BoostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row = boost_definitions::table
            .find(id.get())
            .select(BoostDefinitionRow::as_select())
            .first::<BoostDefinitionRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        row.map(to_definition).transpose()
    }

    async fn list_live_grants(
        &self,
        user_id: &UserId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<BoostGrant>, BoostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows: Vec<BoostGrantRow> = boost_grants::table
            .filter(boost_grants::user_id.eq(user_id.as_uuid()))
            .filter(boost_grants::start_time.le(as_of))
            .filter(boost_grants::end_time.gt(as_of))
            .order(boost_grants::id.asc())
            .select(BoostGrantRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;
        rows.into_iter().map(to_grant).collect()
    }

    async fn purchase(
        &self,
        request: &PurchaseRequest,
    ) -> Result<PurchaseOutcome, BoostRepositoryError> {
        let definition = &request.definition;
        let price: i64 = convert_int(definition.price(), "price").map_err(BoostRepositoryError::query)?;
        let (start_time, end_time) = definition.window_from(request.start_time);
        let grant_row = NewBoostGrantRow {
            user_id: *request.user_id.as_uuid(),
            boost_definition_id: definition.id().get(),
            multiplier_permille: convert_int(definition.multiplier().get(), "multiplier_permille")
                .map_err(BoostRepositoryError::query)?,
            start_time,
            end_time,
            active: true,
        };
        let user_uuid = *request.user_id.as_uuid();
        let grant_row = &grant_row;

        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows = conn
            .transaction(|conn| {
                async move {
                    let debited = diesel::update(
                        users::table
                            .filter(users::id.eq(user_uuid))
                            .filter(users::points.ge(price)),
                    )
                    .set((
                        users::points.eq(users::points - price),
                        users::boost_usage_count.eq(users::boost_usage_count + 1),
                    ))
                    .returning(UserRow::as_returning())
                    .get_result::<UserRow>(conn)
                    .await
                    .optional()?;

                    let Some(user) = debited else {
                        let balance = users::table
                            .find(user_uuid)
                            .select(users::points)
                            .first::<i64>(conn)
                            .await
                            .optional()?;
                        return Ok(balance.map_or(PurchaseRows::Missing, PurchaseRows::Short));
                    };

                    let grant = diesel::insert_into(boost_grants::table)
                        .values(grant_row)
                        .returning(BoostGrantRow::as_returning())
                        .get_result::<BoostGrantRow>(conn)
                        .await?;
                    Ok::<_, diesel::result::Error>(PurchaseRows::Granted(grant, user))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel)?;

        match rows {
            PurchaseRows::Granted(grant, user) => Ok(PurchaseOutcome::Granted {
                grant: to_grant(grant)?,
                user: User::try_from(user).map_err(BoostRepositoryError::query)?,
            }),
            PurchaseRows::Short(balance) => Ok(PurchaseOutcome::InsufficientFunds {
                balance: convert_int(balance, "points").map_err(BoostRepositoryError::query)?,
                price: definition.price(),
            }),
            PurchaseRows::Missing => Ok(PurchaseOutcome::UserMissing),
        }
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, BoostRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let flipped = diesel::update(
            boost_grants::table
                .filter(boost_grants::active.eq(true))
                .filter(boost_grants::end_time.le(now)),
        )
        .set(boost_grants::active.eq(false))
        .execute(&mut conn)
        .await
        .map_err(map_diesel)?;
        convert_int(flipped, "deactivated").map_err(BoostRepositoryError::query)
    }
}
