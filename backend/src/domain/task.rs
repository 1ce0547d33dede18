//! Task catalogue and per-user progress.
//!
//! A task is completed once its progress reaches `required_amount`.
//! Completion is irrevocable and credits the task's points exactly once;
//! tasks never reset, whatever their kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Validation errors raised by task constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskValidationError {
    #[error("task title must not be empty")]
    EmptyTitle,
    #[error("required amount must be at least one")]
    ZeroRequiredAmount,
    #[error("unknown task type: {0}")]
    UnknownKind(String),
}

/// Identifier of a catalogue task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cadence label of a task. Purely descriptive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Daily,
    Weekly,
    Special,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Special => "special",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = TaskValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "special" => Ok(Self::Special),
            other => Err(TaskValidationError::UnknownKind(other.to_owned())),
        }
    }
}

/// Input for [`TaskDefinition::new`].
#[derive(Debug, Clone)]
pub struct TaskDefinitionDraft {
    pub id: TaskId,
    pub kind: TaskKind,
    pub title: String,
    pub description: String,
    pub points: u64,
    pub required_amount: u32,
    pub active: bool,
    pub action: Option<String>,
    pub target: Option<String>,
}

/// Catalogue entry a user can make progress on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    id: TaskId,
    #[serde(rename = "type")]
    kind: TaskKind,
    title: String,
    description: String,
    points: u64,
    required_amount: u32,
    active: bool,
    action: Option<String>,
    target: Option<String>,
}

impl TaskDefinition {
    pub fn new(draft: TaskDefinitionDraft) -> Result<Self, TaskValidationError> {
        if draft.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        if draft.required_amount == 0 {
            return Err(TaskValidationError::ZeroRequiredAmount);
        }
        Ok(Self {
            id: draft.id,
            kind: draft.kind,
            title: draft.title.trim().to_owned(),
            description: draft.description,
            points: draft.points,
            required_amount: draft.required_amount,
            active: draft.active,
            action: draft.action,
            target: draft.target,
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn required_amount(&self) -> u32 {
        self.required_amount
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Client-side action hint, such as `join_channel`.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Target of [`TaskDefinition::action`], such as a channel handle.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

/// Tasks shipped with a fresh installation, ids 1..=4 in catalogue order.
pub fn default_task_catalog() -> Vec<TaskDefinitionDraft> {
    let entry = |id: i64,
                 kind: TaskKind,
                 title: &str,
                 description: &str,
                 points: u64,
                 required_amount: u32,
                 action: &str,
                 target: Option<&str>| TaskDefinitionDraft {
        id: TaskId::new(id),
        kind,
        title: title.to_owned(),
        description: description.to_owned(),
        points,
        required_amount,
        active: true,
        action: Some(action.to_owned()),
        target: target.map(str::to_owned),
    };
    vec![
        entry(1, TaskKind::Daily, "Open the app", "Open the app once", 10, 1, "open_app", None),
        entry(
            2,
            TaskKind::Daily,
            "Send messages to the group",
            "Send 3 messages to the community group",
            50,
            3,
            "send_message",
            Some("@mining_group"),
        ),
        entry(3, TaskKind::Weekly, "Invite 5 friends", "Invite 5 friends to mine with you", 200, 5, "invite_friends", None),
        entry(
            4,
            TaskKind::Special,
            "Join the channel",
            "Subscribe to the announcements channel",
            100,
            1,
            "join_channel",
            Some("@mining_channel"),
        ),
    ]
}

/// Progress of one user on one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTask {
    pub user_id: UserId,
    pub task_id: TaskId,
    pub progress: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

impl UserTask {
    /// Fresh progress record with nothing done yet.
    pub fn start(user_id: UserId, task_id: TaskId) -> Self {
        Self {
            user_id,
            task_id,
            progress: 0,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Raise progress towards `task`'s requirement.
    ///
    /// Progress never decreases and is capped at the requirement. Returns
    /// `true` only on the call that completes the task.
    pub fn advance(&mut self, task: &TaskDefinition, progress: u32, at: DateTime<Utc>) -> bool {
        let required = task.required_amount();
        self.progress = self.progress.max(progress.min(required));
        if self.is_completed() || self.progress < required {
            return false;
        }
        self.completed_at = Some(at);
        true
    }
}
