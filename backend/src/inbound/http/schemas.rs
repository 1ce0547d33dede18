//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. This
//! module provides the schema definitions required for OpenAPI documentation
//! using utoipa's external schema registration.
//!
//! The schema wrappers mirror the structure of their corresponding domain
//! types but live in the inbound adapter layer where framework concerns belong.

#![expect(
    dead_code,
    reason = "Schema mirrors are only read by utoipa while generating OpenAPI"
)]

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
///
/// Stable machine-readable error codes returned in API error responses.
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// A concurrent write won; retry the operation.
    #[schema(rename = "conflict")]
    Conflict,
    /// The balance does not cover the purchase.
    #[schema(rename = "insufficient_funds")]
    InsufficientFunds,
    /// The boost definition is unknown or inactive.
    #[schema(rename = "unknown_boost_type")]
    UnknownBoostType,
    /// Persistence is unavailable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
///
/// API error response payload with machine-readable code and human-readable
/// message.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "insufficient_funds")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "balance 10 does not cover price 500")]
    message: String,
    /// Correlation identifier for tracing this error across systems.
    #[schema(example = "5f0c8c3e-0a52-4a39-9d7c-6b1f3f1a2b3c")]
    trace_id: Option<String>,
    /// Supplementary error details for clients.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::User`].
#[derive(ToSchema)]
#[schema(as = crate::domain::User, rename_all = "camelCase")]
pub struct UserSchema {
    /// Stable user identifier.
    #[schema(value_type = String, format = Uuid, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    id: String,
    /// Identity assigned by the host platform.
    #[schema(example = "123456789")]
    external_id: String,
    /// Display name; may be empty.
    #[schema(example = "Ada Lovelace")]
    display_name: String,
    /// Absolute avatar URL.
    #[schema(format = "uri")]
    avatar_url: Option<String>,
    /// Settled point balance.
    points: u64,
    /// Base mining rate in points per hour.
    #[schema(example = 10)]
    mining_speed: u32,
    /// Whole-hour accrual checkpoint.
    #[schema(value_type = String, format = DateTime)]
    last_accrual_time: String,
    /// Code other users present when signing up.
    #[schema(example = "REF-A1B2C3")]
    referral_code: String,
    /// Referral code presented at sign-up.
    referred_by: Option<String>,
    completed_tasks_count: u32,
    /// Number of boosts purchased.
    boost_usage_count: u32,
    #[schema(value_type = String, format = DateTime)]
    created_at: String,
}

/// OpenAPI schema for [`crate::domain::BoostDefinition`].
#[derive(ToSchema)]
#[schema(as = crate::domain::BoostDefinition, rename_all = "camelCase")]
pub struct BoostDefinitionSchema {
    #[schema(example = 1)]
    id: i64,
    #[schema(example = "Double Mining")]
    name: String,
    description: String,
    /// Rate multiplier in thousandths; 2000 doubles the rate.
    #[schema(example = 2000, minimum = 1)]
    multiplier_permille: u32,
    #[schema(example = 24, minimum = 1)]
    duration_hours: u32,
    #[schema(example = 500)]
    price: u64,
    active: bool,
}

/// OpenAPI schema for [`crate::domain::BoostGrant`].
#[derive(ToSchema)]
#[schema(as = crate::domain::BoostGrant, rename_all = "camelCase")]
pub struct BoostGrantSchema {
    id: i64,
    #[schema(value_type = String, format = Uuid)]
    user_id: String,
    boost_definition_id: i64,
    /// Multiplier copied from the definition at purchase time.
    multiplier_permille: u32,
    /// Inclusive start of the boost window.
    #[schema(value_type = String, format = DateTime)]
    start_time: String,
    /// Exclusive end of the boost window.
    #[schema(value_type = String, format = DateTime)]
    end_time: String,
    /// Informational; cleared by the expiry sweep.
    active: bool,
}

/// OpenAPI schema for [`crate::domain::ReferralRecord`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ReferralRecord, rename_all = "camelCase")]
pub struct ReferralRecordSchema {
    id: i64,
    #[schema(value_type = String, format = Uuid)]
    referrer_id: String,
    #[schema(value_type = String, format = Uuid)]
    referred_id: String,
    #[schema(example = 100)]
    bonus_points: u64,
    #[schema(value_type = String, format = DateTime)]
    created_at: String,
}

/// OpenAPI schema for [`crate::domain::ports::CreateUserRequest`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ports::CreateUserRequest, rename_all = "camelCase")]
pub struct CreateUserRequestSchema {
    #[schema(example = "123456789")]
    external_id: String,
    display_name: Option<String>,
    #[schema(format = "uri")]
    avatar_url: Option<String>,
    /// Referral code of the inviting user.
    referred_by: Option<String>,
}

/// OpenAPI schema for [`crate::domain::ports::CreateUserResponse`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ports::CreateUserResponse)]
pub struct CreateUserResponseSchema {
    user: UserSchema,
    /// False when the external id was already registered.
    created: bool,
}

/// OpenAPI schema for [`crate::domain::ports::ClaimMiningResponse`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ports::ClaimMiningResponse, rename_all = "camelCase")]
pub struct ClaimMiningResponseSchema {
    user: UserSchema,
    credited_points: u64,
    credited_hours: i64,
    /// Effective rate used for the credited hours.
    rate_per_hour: u64,
    #[schema(value_type = String, format = DateTime)]
    next_accrual_at: String,
}

/// OpenAPI schema for [`crate::domain::ports::PurchaseReceipt`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ports::PurchaseReceipt)]
pub struct PurchaseReceiptSchema {
    grant: BoostGrantSchema,
    /// Buyer after the debit.
    user: UserSchema,
}

/// OpenAPI schema for [`crate::domain::TaskKind`].
#[derive(ToSchema)]
#[schema(as = crate::domain::TaskKind, rename_all = "lowercase")]
pub enum TaskKindSchema {
    Daily,
    Weekly,
    Special,
}

/// OpenAPI schema for [`crate::domain::TaskDefinition`].
#[derive(ToSchema)]
#[schema(as = crate::domain::TaskDefinition, rename_all = "camelCase")]
pub struct TaskDefinitionSchema {
    #[schema(example = 1)]
    id: i64,
    #[schema(rename = "type")]
    kind: TaskKindSchema,
    #[schema(example = "Join the channel")]
    title: String,
    description: String,
    /// Points credited once on completion.
    #[schema(example = 100)]
    points: u64,
    #[schema(example = 1, minimum = 1)]
    required_amount: u32,
    active: bool,
    /// Client-side action hint.
    #[schema(example = "join_channel")]
    action: Option<String>,
    #[schema(example = "@mining_channel")]
    target: Option<String>,
}

/// OpenAPI schema for [`crate::domain::UserTask`].
#[derive(ToSchema)]
#[schema(as = crate::domain::UserTask, rename_all = "camelCase")]
pub struct UserTaskSchema {
    #[schema(value_type = String, format = Uuid)]
    user_id: String,
    task_id: i64,
    /// Capped at the task's required amount.
    progress: u32,
    /// Set once, when progress first reaches the requirement.
    #[schema(value_type = Option<String>, format = DateTime)]
    completed_at: Option<String>,
}

/// OpenAPI schema for [`crate::domain::ports::TaskProgressReceipt`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ports::TaskProgressReceipt, rename_all = "camelCase")]
pub struct TaskProgressReceiptSchema {
    user_task: UserTaskSchema,
    /// User after any completion credit.
    user: UserSchema,
    /// Zero unless this report completed the task.
    credited_points: u64,
}
