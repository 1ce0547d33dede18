//! PostgreSQL-backed `TaskRepository` implementation using Diesel ORM.
//!
//! Progress reports lock the user row first, so two reports for the same
//! user serialise and a task is credited at most once.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;

use crate::domain::ports::{
    TaskProgressOutcome, TaskProgressUpdate, TaskRepository, TaskRepositoryError,
};
use crate::domain::{TaskDefinition, TaskId, TaskKind, User, UserId, UserTask};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{TaskRow, UserRow, UserTaskRow, convert_int};
use super::pool::{DbPool, PoolError};
use super::schema::{tasks, user_tasks, users};

/// Diesel-backed implementation of the task repository port.
#[derive(Clone)]
pub struct DieselTaskRepository {
    pool: DbPool,
}

impl DieselTaskRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside the progress transaction.
enum ProgressError {
    Diesel(diesel::result::Error),
    Row(String),
}

impl From<diesel::result::Error> for ProgressError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

enum ProgressRows {
    Recorded {
        user_task: UserTask,
        user: UserRow,
        credited: u64,
    },
    Missing,
}

fn map_pool(error: PoolError) -> TaskRepositoryError {
    map_pool_error(error, |message| TaskRepositoryError::connection(message))
}

fn map_diesel(error: diesel::result::Error) -> TaskRepositoryError {
    map_diesel_error(
        error,
        TaskRepositoryError::query,
        TaskRepositoryError::connection,
    )
}

fn to_task(row: TaskRow) -> Result<TaskDefinition, TaskRepositoryError> {
    TaskDefinition::try_from(row).map_err(TaskRepositoryError::query)
}

#[async_trait]
impl TaskRepository for DieselTaskRepository {
    async fn list_tasks(
        &self,
        kind: Option<TaskKind>,
    ) -> Result<Vec<TaskDefinition>, TaskRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let mut query = tasks::table
            .filter(tasks::active.eq(true))
            .select(TaskRow::as_select())
            .order(tasks::id.asc())
            .into_boxed();
        if let Some(kind) = kind {
            query = query.filter(tasks::kind.eq(kind.as_str()));
        }
        let rows: Vec<TaskRow> = query.load(&mut conn).await.map_err(map_diesel)?;
        rows.into_iter().map(to_task).collect()
    }

    async fn find_task(&self, id: TaskId) -> Result<Option<TaskDefinition>, TaskRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row = tasks::table
            .find(id.get())
            .select(TaskRow::as_select())
            .first::<TaskRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;
        row.map(to_task).transpose()
    }

    async fn list_user_tasks(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<UserTask>, TaskRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows: Vec<UserTaskRow> = user_tasks::table
            .filter(user_tasks::user_id.eq(user_id.as_uuid()))
            .order(user_tasks::task_id.asc())
            .select(UserTaskRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;
        rows.into_iter()
            .map(|row| UserTask::try_from(row).map_err(TaskRepositoryError::query))
            .collect()
    }

    async fn record_progress(
        &self,
        update: &TaskProgressUpdate,
    ) -> Result<TaskProgressOutcome, TaskRepositoryError> {
        let credit: i64 =
            convert_int(update.task.points(), "points").map_err(TaskRepositoryError::query)?;
        let user_uuid = *update.user_id.as_uuid();
        let task_id = update.task.id().get();

        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows = conn
            .transaction(|conn| {
                async move {
                    let locked = users::table
                        .find(user_uuid)
                        .select(UserRow::as_select())
                        .for_update()
                        .first::<UserRow>(conn)
                        .await
                        .optional()?;
                    let Some(user) = locked else {
                        return Ok(ProgressRows::Missing);
                    };

                    let stored = user_tasks::table
                        .find((user_uuid, task_id))
                        .select(UserTaskRow::as_select())
                        .first::<UserTaskRow>(conn)
                        .await
                        .optional()?;
                    let mut user_task = match stored {
                        Some(row) => UserTask::try_from(row).map_err(ProgressError::Row)?,
                        None => UserTask::start(update.user_id, update.task.id()),
                    };
                    let completed = user_task.advance(&update.task, update.progress, update.at);

                    let row = UserTaskRow::from_user_task(&user_task).map_err(ProgressError::Row)?;
                    diesel::insert_into(user_tasks::table)
                        .values(&row)
                        .on_conflict((user_tasks::user_id, user_tasks::task_id))
                        .do_update()
                        .set((
                            user_tasks::progress.eq(row.progress),
                            user_tasks::completed_at.eq(row.completed_at),
                        ))
                        .execute(conn)
                        .await?;

                    if !completed {
                        return Ok(ProgressRows::Recorded {
                            user_task,
                            user,
                            credited: 0,
                        });
                    }
                    let user = diesel::update(users::table.find(user_uuid))
                        .set((
                            users::points.eq(users::points + credit),
                            users::completed_tasks_count.eq(users::completed_tasks_count + 1),
                        ))
                        .returning(UserRow::as_returning())
                        .get_result::<UserRow>(conn)
                        .await?;
                    Ok::<_, ProgressError>(ProgressRows::Recorded {
                        user_task,
                        user,
                        credited: update.task.points(),
                    })
                }
                .scope_boxed()
            })
            .await
            .map_err(|error| match error {
                ProgressError::Diesel(error) => map_diesel(error),
                ProgressError::Row(message) => TaskRepositoryError::query(message),
            })?;

        match rows {
            ProgressRows::Recorded {
                user_task,
                user,
                credited,
            } => Ok(TaskProgressOutcome::Recorded {
                user_task,
                user: User::try_from(user).map_err(TaskRepositoryError::query)?,
                credited,
            }),
            ProgressRows::Missing => Ok(TaskProgressOutcome::UserMissing),
        }
    }
}
