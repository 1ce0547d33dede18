//! Port for the task catalogue and per-user progress.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{TaskDefinition, TaskId, TaskKind, User, UserId, UserTask};

use super::define_port_error;

define_port_error! {
    /// Errors raised by task repository adapters.
    pub enum TaskRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "task repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "task repository query failed: {message}",
    }
}

/// Progress report to record as one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskProgressUpdate {
    pub user_id: UserId,
    pub task: TaskDefinition,
    pub progress: u32,
    pub at: DateTime<Utc>,
}

/// Outcome of [`TaskRepository::record_progress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskProgressOutcome {
    /// Progress stored. `credited` is the task's points when this update
    /// completed it, zero otherwise.
    Recorded {
        user_task: UserTask,
        user: User,
        credited: u64,
    },
    /// No user with the requested id.
    UserMissing,
}

/// Port for task definitions and user progress.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Active tasks ordered by id, optionally of one kind.
    async fn list_tasks(
        &self,
        kind: Option<TaskKind>,
    ) -> Result<Vec<TaskDefinition>, TaskRepositoryError>;

    async fn find_task(&self, id: TaskId) -> Result<Option<TaskDefinition>, TaskRepositoryError>;

    /// Progress records of `user_id` ordered by task id.
    async fn list_user_tasks(&self, user_id: &UserId)
    -> Result<Vec<UserTask>, TaskRepositoryError>;

    /// Raise the stored progress and, on the first completion, credit the
    /// task's points and bump `completed_tasks_count` atomically.
    async fn record_progress(
        &self,
        update: &TaskProgressUpdate,
    ) -> Result<TaskProgressOutcome, TaskRepositoryError>;
}
