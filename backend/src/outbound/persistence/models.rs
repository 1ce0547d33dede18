//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions back into domain types go
//! through the validating constructors and report failures as plain strings
//! that each repository wraps in its own error type.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    BoostDefinition, BoostDefinitionDraft, BoostDefinitionId, BoostGrant, BoostGrantDraft,
    BoostGrantId, DisplayName, ExternalId, MultiplierPermille, ReferralCode, ReferralId,
    ReferralRecord, TaskDefinition, TaskDefinitionDraft, TaskId, TaskKind, User, UserDraft, UserId,
    UserTask, parse_avatar_url,
};

use super::schema::{boost_definitions, boost_grants, referrals, tasks, user_tasks, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub external_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub points: i64,
    pub mining_speed: i32,
    pub last_accrual_time: DateTime<Utc>,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub completed_tasks_count: i32,
    pub boost_usage_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating new user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub external_id: &'a str,
    pub display_name: &'a str,
    pub avatar_url: Option<&'a str>,
    pub points: i64,
    pub mining_speed: i32,
    pub last_accrual_time: DateTime<Utc>,
    pub referral_code: &'a str,
    pub referred_by: Option<&'a str>,
    pub completed_tasks_count: i32,
    pub boost_usage_count: i32,
    pub created_at: DateTime<Utc>,
}

pub(crate) fn convert_int<T, D>(value: T, field: &str) -> Result<D, String>
where
    D: TryFrom<T>,
    T: Copy + std::fmt::Display,
{
    D::try_from(value).map_err(|_| format!("{field} value {value} is out of range"))
}

impl<'a> NewUserRow<'a> {
    pub(crate) fn from_user(user: &'a User) -> Result<Self, String> {
        Ok(Self {
            id: *user.id().as_uuid(),
            external_id: user.external_id().as_ref(),
            display_name: user.display_name().as_ref(),
            avatar_url: user.avatar_url().map(url::Url::as_str),
            points: convert_int(user.points(), "points")?,
            mining_speed: convert_int(user.mining_speed(), "mining_speed")?,
            last_accrual_time: user.last_accrual_time(),
            referral_code: user.referral_code().as_ref(),
            referred_by: user.referred_by().map(AsRef::as_ref),
            completed_tasks_count: convert_int(user.completed_tasks_count(), "completed_tasks_count")?,
            boost_usage_count: convert_int(user.boost_usage_count(), "boost_usage_count")?,
            created_at: user.created_at(),
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let UserRow {
            id,
            external_id,
            display_name,
            avatar_url,
            points,
            mining_speed,
            last_accrual_time,
            referral_code,
            referred_by,
            completed_tasks_count,
            boost_usage_count,
            created_at,
        } = row;

        let avatar_url = avatar_url
            .as_deref()
            .map(parse_avatar_url)
            .transpose()
            .map_err(|err| err.to_string())?;
        let referred_by = referred_by
            .map(ReferralCode::new)
            .transpose()
            .map_err(|err| err.to_string())?;

        User::new(UserDraft {
            id: UserId::from_uuid(id),
            external_id: ExternalId::new(external_id).map_err(|err| err.to_string())?,
            display_name: DisplayName::new(display_name).map_err(|err| err.to_string())?,
            avatar_url,
            points: convert_int(points, "points")?,
            mining_speed: convert_int(mining_speed, "mining_speed")?,
            last_accrual_time,
            referral_code: ReferralCode::new(referral_code).map_err(|err| err.to_string())?,
            referred_by,
            completed_tasks_count: convert_int(completed_tasks_count, "completed_tasks_count")?,
            boost_usage_count: convert_int(boost_usage_count, "boost_usage_count")?,
            created_at,
        })
        .map_err(|err| err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Boost models
// ---------------------------------------------------------------------------

/// Row struct for reading from the boost_definitions table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = boost_definitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BoostDefinitionRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub multiplier_permille: i32,
    pub duration_hours: i32,
    pub price: i64,
    pub active: bool,
}

impl TryFrom<BoostDefinitionRow> for BoostDefinition {
    type Error = String;

    fn try_from(row: BoostDefinitionRow) -> Result<Self, Self::Error> {
        let multiplier = MultiplierPermille::new(convert_int(row.multiplier_permille, "multiplier_permille")?)
            .map_err(|err| err.to_string())?;
        BoostDefinition::new(BoostDefinitionDraft {
            id: BoostDefinitionId::new(row.id),
            name: row.name,
            description: row.description,
            multiplier,
            duration_hours: convert_int(row.duration_hours, "duration_hours")?,
            price: convert_int(row.price, "price")?,
            active: row.active,
        })
        .map_err(|err| err.to_string())
    }
}

/// Row struct for reading from the boost_grants table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = boost_grants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BoostGrantRow {
    pub id: i64,
    pub user_id: Uuid,
    pub boost_definition_id: i64,
    pub multiplier_permille: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub active: bool,
}

/// Insertable struct for recording a purchase.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = boost_grants)]
pub(crate) struct NewBoostGrantRow {
    pub user_id: Uuid,
    pub boost_definition_id: i64,
    pub multiplier_permille: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub active: bool,
}

impl TryFrom<BoostGrantRow> for BoostGrant {
    type Error = String;

    fn try_from(row: BoostGrantRow) -> Result<Self, Self::Error> {
        let multiplier = MultiplierPermille::new(convert_int(row.multiplier_permille, "multiplier_permille")?)
            .map_err(|err| err.to_string())?;
        BoostGrant::new(BoostGrantDraft {
            id: BoostGrantId::new(row.id),
            user_id: UserId::from_uuid(row.user_id),
            boost_definition_id: BoostDefinitionId::new(row.boost_definition_id),
            multiplier,
            start_time: row.start_time,
            end_time: row.end_time,
            active: row.active,
        })
        .map_err(|err| err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Referral models
// ---------------------------------------------------------------------------

/// Row struct for reading from the referrals table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = referrals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReferralRow {
    pub id: i64,
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub bonus_points: i64,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for recording a referral.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = referrals)]
pub(crate) struct NewReferralRow {
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub bonus_points: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReferralRow> for ReferralRecord {
    type Error = String;

    fn try_from(row: ReferralRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReferralId::new(row.id),
            referrer_id: UserId::from_uuid(row.referrer_id),
            referred_id: UserId::from_uuid(row.referred_id),
            bonus_points: convert_int(row.bonus_points, "bonus_points")?,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Task models
// ---------------------------------------------------------------------------

/// Row struct for reading from the tasks table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TaskRow {
    pub id: i64,
    pub kind: String,
    pub title: String,
    pub description: String,
    pub points: i64,
    pub required_amount: i32,
    pub active: bool,
    pub action: Option<String>,
    pub target: Option<String>,
}

impl TryFrom<TaskRow> for TaskDefinition {
    type Error = String;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        TaskDefinition::new(TaskDefinitionDraft {
            id: TaskId::new(row.id),
            kind: row.kind.parse::<TaskKind>().map_err(|err| err.to_string())?,
            title: row.title,
            description: row.description,
            points: convert_int(row.points, "points")?,
            required_amount: convert_int(row.required_amount, "required_amount")?,
            active: row.active,
            action: row.action,
            target: row.target,
        })
        .map_err(|err| err.to_string())
    }
}

/// Row struct for reading and upserting the user_tasks table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = user_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserTaskRow {
    pub user_id: Uuid,
    pub task_id: i64,
    pub progress: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

impl UserTaskRow {
    pub(crate) fn from_user_task(user_task: &UserTask) -> Result<Self, String> {
        Ok(Self {
            user_id: *user_task.user_id.as_uuid(),
            task_id: user_task.task_id.get(),
            progress: convert_int(user_task.progress, "progress")?,
            completed_at: user_task.completed_at,
        })
    }
}

impl TryFrom<UserTaskRow> for UserTask {
    type Error = String;

    fn try_from(row: UserTaskRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::from_uuid(row.user_id),
            task_id: TaskId::new(row.task_id),
            progress: convert_int(row.progress, "progress")?,
            completed_at: row.completed_at,
        })
    }
}
