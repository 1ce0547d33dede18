//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! Creation is idempotent on `external_id` through `ON CONFLICT DO NOTHING`;
//! the accrual commit is a single conditional `UPDATE` keyed on the expected
//! checkpoint, so concurrent claims cannot both land.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{AccrualCommit, InsertUserOutcome, UserRepository, UserRepositoryError};
use crate::domain::{ExternalId, ReferralCode, User, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error, violated_unique_constraint};
use super::models::{NewUserRow, UserRow, convert_int};
use super::pool::{DbPool, PoolError};
use super::schema::users;

const REFERRAL_CODE_CONSTRAINT: &str = "users_referral_code_key";

/// Diesel-backed implementation of the user repository port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool(error: PoolError) -> UserRepositoryError {
    map_pool_error(error, |message| UserRepositoryError::connection(message))
}

fn map_diesel(error: diesel::result::Error) -> UserRepositoryError {
    map_diesel_error(
        error,
        UserRepositoryError::query,
        UserRepositoryError::connection,
    )
}

fn row_to_user(row: UserRow) -> Result<User, UserRepositoryError> {
    User::try_from(row).map_err(UserRepositoryError::query)
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row = users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        row.map(row_to_user).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row = users::table
            .filter(users::external_id.eq(external_id.as_ref()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        row.map(row_to_user).transpose()
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Vec<User>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows: Vec<UserRow> = users::table
            .filter(users::referral_code.eq(code.as_ref()))
            .order((users::created_at.asc(), users::id.asc()))
            .select(UserRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;
        rows.into_iter().map(row_to_user).collect()
    }

    async fn insert(&self, user: &User) -> Result<InsertUserOutcome, UserRepositoryError> {
        let new_row = NewUserRow::from_user(user).map_err(UserRepositoryError::query)?;
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let inserted = diesel::insert_into(users::table)
            .values(&new_row)
            .on_conflict(users::external_id)
            .do_nothing()
            .returning(UserRow::as_returning())
            .get_result::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(|error| {
                if violated_unique_constraint(&error) == Some(REFERRAL_CODE_CONSTRAINT) {
                    UserRepositoryError::duplicate_referral_code(user.referral_code().as_ref())
                } else {
                    map_diesel(error)
                }
            })?;

        if let Some(row) = inserted {
            return row_to_user(row).map(InsertUserOutcome::Created);
        }

        let existing = users::table
            .filter(users::external_id.eq(user.external_id().as_ref()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .map_err(map_diesel)?;
        row_to_user(existing).map(InsertUserOutcome::Existing)
    }

    async fn commit_accrual(
        &self,
        commit: &AccrualCommit,
    ) -> Result<Option<User>, UserRepositoryError> {
        let earned: i64 = convert_int(commit.earned, "earned").map_err(UserRepositoryError::query)?;
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = diesel::update(
            users::table
                .filter(users::id.eq(commit.user_id.as_uuid()))
                .filter(users::last_accrual_time.eq(commit.expected_checkpoint)),
        )
        .set((
            users::points.eq(users::points + earned),
            users::last_accrual_time.eq(commit.new_checkpoint),
        ))
        .returning(UserRow::as_returning())
        .get_result::<UserRow>(&mut conn)
        .await
        .optional()
        .map_err(map_diesel)?;

        row.map(row_to_user).transpose()
    }
}
