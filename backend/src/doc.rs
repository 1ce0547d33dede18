//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every REST handler in the inbound layer together with
//! the schema mirrors from [`crate::inbound::http::schemas`], so domain types
//! stay free of utoipa derives. Swagger UI serves it in debug builds and the
//! `openapi-dump` binary prints it for external tooling.

use utoipa::OpenApi;

use crate::inbound::http::boosts::PurchaseBoostRequest;
use crate::inbound::http::schemas::{
    BoostDefinitionSchema, BoostGrantSchema, ClaimMiningResponseSchema, CreateUserRequestSchema,
    CreateUserResponseSchema, ErrorCodeSchema, ErrorSchema, PurchaseReceiptSchema,
    ReferralRecordSchema, TaskDefinitionSchema, TaskKindSchema, TaskProgressReceiptSchema,
    UserSchema, UserTaskSchema,
};
use crate::inbound::http::tasks::TaskProgressRequest;

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pointminer API",
        description = "Users, mining claims, boosts, referrals and tasks for the point mining app."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::users::get_user_by_external_id,
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::create_user,
        crate::inbound::http::mining::claim_mining,
        crate::inbound::http::boosts::list_catalog,
        crate::inbound::http::boosts::list_active_boosts,
        crate::inbound::http::boosts::purchase_boost,
        crate::inbound::http::referrals::list_referrals,
        crate::inbound::http::tasks::list_tasks,
        crate::inbound::http::tasks::list_user_tasks,
        crate::inbound::http::tasks::update_task_progress,
        crate::inbound::http::tasks::complete_task,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        UserSchema,
        ErrorSchema,
        ErrorCodeSchema,
        BoostDefinitionSchema,
        BoostGrantSchema,
        ReferralRecordSchema,
        CreateUserRequestSchema,
        CreateUserResponseSchema,
        ClaimMiningResponseSchema,
        PurchaseReceiptSchema,
        PurchaseBoostRequest,
        TaskKindSchema,
        TaskDefinitionSchema,
        UserTaskSchema,
        TaskProgressReceiptSchema,
        TaskProgressRequest,
    )),
    tags(
        (name = "users", description = "User lookup and registration"),
        (name = "mining", description = "Point accrual"),
        (name = "boosts", description = "Boost catalogue and purchases"),
        (name = "referrals", description = "Referral records"),
        (name = "tasks", description = "Task catalogue and progress"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
