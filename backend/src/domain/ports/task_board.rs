//! Driving ports for task listings and progress reports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Error, TaskDefinition, TaskId, TaskKind, User, UserId, UserTask};

/// Result of a progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgressReceipt {
    pub user_task: UserTask,
    /// User after any completion credit.
    pub user: User,
    /// Points credited by this report; zero unless it completed the task.
    pub credited_points: u64,
}

/// Task progress use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskCommand: Send + Sync {
    /// Raise progress to `progress`, completing the task when it reaches the
    /// requirement.
    async fn update_progress(
        &self,
        user_id: &UserId,
        task_id: TaskId,
        progress: u32,
    ) -> Result<TaskProgressReceipt, Error>;

    /// Mark the task done regardless of current progress.
    async fn complete(&self, user_id: &UserId, task_id: TaskId)
    -> Result<TaskProgressReceipt, Error>;
}

/// Task read use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskQuery: Send + Sync {
    /// Active catalogue tasks, optionally of one kind.
    async fn tasks(&self, kind: Option<TaskKind>) -> Result<Vec<TaskDefinition>, Error>;

    /// Progress records of a user.
    async fn user_tasks(&self, user_id: &UserId) -> Result<Vec<UserTask>, Error>;
}
