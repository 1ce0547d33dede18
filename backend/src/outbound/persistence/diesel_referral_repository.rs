//! PostgreSQL-backed `ReferralRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;

use crate::domain::ports::{ReferralRepository, ReferralRepositoryError};
use crate::domain::{NewReferral, PERMILLE_SCALE, ReferralRecord, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewReferralRow, ReferralRow, convert_int};
use super::pool::{DbPool, PoolError};
use super::schema::{referrals, users};

/// Diesel-backed implementation of the referral repository port.
#[derive(Clone)]
pub struct DieselReferralRepository {
    pool: DbPool,
}

impl DieselReferralRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool(error: PoolError) -> ReferralRepositoryError {
    map_pool_error(error, |message| ReferralRepositoryError::connection(message))
}

fn map_diesel(error: diesel::result::Error) -> ReferralRepositoryError {
    map_diesel_error(
        error,
        ReferralRepositoryError::query,
        ReferralRepositoryError::connection,
    )
}

fn to_record(row: ReferralRow) -> Result<ReferralRecord, ReferralRepositoryError> {
    ReferralRecord::try_from(row).map_err(ReferralRepositoryError::query)
}

#[async_trait]
impl ReferralRepository for DieselReferralRepository {
    async fn record_referral(
        &self,
        referral: &NewReferral,
    ) -> Result<Option<ReferralRecord>, ReferralRepositoryError> {
        let bonus: i64 = convert_int(referral.policy.bonus_points, "bonus_points")
            .map_err(ReferralRepositoryError::query)?;
        let permille: i32 = convert_int(referral.policy.speed_bonus_permille, "speed_bonus_permille")
            .map_err(ReferralRepositoryError::query)?;
        let scale: i32 =
            convert_int(PERMILLE_SCALE, "permille_scale").map_err(ReferralRepositoryError::query)?;
        let new_row = NewReferralRow {
            referrer_id: *referral.referrer_id.as_uuid(),
            referred_id: *referral.referred_id.as_uuid(),
            bonus_points: bonus,
            created_at: referral.created_at,
        };
        let referrer = new_row.referrer_id;
        let new_row = &new_row;

        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row = conn
            .transaction(|conn| {
                async move {
                    let inserted = diesel::insert_into(referrals::table)
                        .values(new_row)
                        .on_conflict(referrals::referred_id)
                        .do_nothing()
                        .returning(ReferralRow::as_returning())
                        .get_result::<ReferralRow>(conn)
                        .await
                        .optional()?;
                    let Some(row) = inserted else {
                        return Ok(None);
                    };

                    // Integer division on int4 floors for non-negative speeds.
                    let credited = diesel::update(users::table.find(referrer))
                        .set((
                            users::points.eq(users::points + bonus),
                            users::mining_speed
                                .eq(users::mining_speed + users::mining_speed * permille / scale),
                        ))
                        .execute(conn)
                        .await?;
                    if credited == 0 {
                        // Unwinds the referral insert.
                        return Err(diesel::result::Error::NotFound);
                    }
                    Ok::<_, diesel::result::Error>(Some(row))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel)?;

        row.map(to_record).transpose()
    }

    async fn list_referrals(
        &self,
        referrer_id: &UserId,
    ) -> Result<Vec<ReferralRecord>, ReferralRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows: Vec<ReferralRow> = referrals::table
            .filter(referrals::referrer_id.eq(referrer_id.as_uuid()))
            .order((referrals::created_at.asc(), referrals::id.asc()))
            .select(ReferralRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;
        rows.into_iter().map(to_record).collect()
    }
}
