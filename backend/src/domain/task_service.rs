//! Task board service: catalogue reads and progress reports.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info};

use crate::domain::ports::{
    TaskCommand, TaskProgressOutcome, TaskProgressReceipt, TaskProgressUpdate, TaskQuery,
    TaskRepository, TaskRepositoryError,
};
use crate::domain::{Error, TaskDefinition, TaskId, TaskKind, UserId, UserTask};

fn map_task_repository_error(error: TaskRepositoryError) -> Error {
    match error {
        TaskRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("task repository unavailable: {message}"))
        }
        TaskRepositoryError::Query { message } => {
            Error::internal(format!("task repository error: {message}"))
        }
    }
}

/// Task service implementing [`TaskCommand`] and [`TaskQuery`].
#[derive(Clone)]
pub struct TaskService<T> {
    tasks: Arc<T>,
    clock: Arc<dyn Clock>,
}

impl<T> TaskService<T> {
    pub fn new(tasks: Arc<T>, clock: Arc<dyn Clock>) -> Self {
        Self { tasks, clock }
    }
}

impl<T> TaskService<T>
where
    T: TaskRepository,
{
    async fn active_task(&self, id: TaskId) -> Result<TaskDefinition, Error> {
        self.tasks
            .find_task(id)
            .await
            .map_err(map_task_repository_error)?
            .filter(TaskDefinition::is_active)
            .ok_or_else(|| Error::not_found(format!("task {id} not found")))
    }

    async fn record(
        &self,
        user_id: &UserId,
        task: TaskDefinition,
        progress: u32,
    ) -> Result<TaskProgressReceipt, Error> {
        let task_id = task.id();
        let update = TaskProgressUpdate {
            user_id: *user_id,
            task,
            progress,
            at: self.clock.utc(),
        };
        match self
            .tasks
            .record_progress(&update)
            .await
            .map_err(map_task_repository_error)?
        {
            TaskProgressOutcome::Recorded {
                user_task,
                user,
                credited,
            } => {
                if credited > 0 {
                    info!(%user_id, task = %task_id, credited, "task completed");
                } else {
                    debug!(%user_id, task = %task_id, progress = user_task.progress, "task progress recorded");
                }
                Ok(TaskProgressReceipt {
                    user_task,
                    user,
                    credited_points: credited,
                })
            }
            TaskProgressOutcome::UserMissing => {
                Err(Error::not_found(format!("user {user_id} not found")))
            }
        }
    }
}

#[async_trait]
impl<T> TaskCommand for TaskService<T>
where
    T: TaskRepository,
{
    async fn update_progress(
        &self,
        user_id: &UserId,
        task_id: TaskId,
        progress: u32,
    ) -> Result<TaskProgressReceipt, Error> {
        let task = self.active_task(task_id).await?;
        self.record(user_id, task, progress).await
    }

    async fn complete(
        &self,
        user_id: &UserId,
        task_id: TaskId,
    ) -> Result<TaskProgressReceipt, Error> {
        let task = self.active_task(task_id).await?;
        let required = task.required_amount();
        self.record(user_id, task, required).await
    }
}

#[async_trait]
impl<T> TaskQuery for TaskService<T>
where
    T: TaskRepository,
{
    async fn tasks(&self, kind: Option<TaskKind>) -> Result<Vec<TaskDefinition>, Error> {
        self.tasks
            .list_tasks(kind)
            .await
            .map_err(map_task_repository_error)
    }

    async fn user_tasks(&self, user_id: &UserId) -> Result<Vec<UserTask>, Error> {
        self.tasks
            .list_user_tasks(user_id)
            .await
            .map_err(map_task_repository_error)
    }
}

#[cfg(test)]
#[path = "task_service_tests.rs"]
mod tests;
