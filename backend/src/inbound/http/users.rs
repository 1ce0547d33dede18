//! Users API handlers.
//!
//! ```text
//! GET  /api/v1/users/by-external-id/{externalId}
//! GET  /api/v1/users/{id}
//! POST /api/v1/users {"externalId":"123","displayName":"Ada","referredBy":"REF-AB12CD"}
//! ```

use actix_web::{HttpResponse, get, post, web};

use crate::domain::User;
use crate::domain::ports::CreateUserRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{
    CreateUserRequestSchema, CreateUserResponseSchema, ErrorSchema, UserSchema,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_external_id, parse_user_id};

pub(crate) const USER_ID_FIELD: FieldName = FieldName::new("id");
const EXTERNAL_ID_FIELD: FieldName = FieldName::new("externalId");

/// Look up a user by the identity the host platform assigned.
#[utoipa::path(
    get,
    path = "/api/v1/users/by-external-id/{externalId}",
    params(("externalId" = String, Path, description = "Host platform identity")),
    responses(
        (status = 200, description = "User", body = UserSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "getUserByExternalId"
)]
#[get("/users/by-external-id/{external_id}")]
pub async fn get_user_by_external_id(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<User>> {
    let external_id = parse_external_id(&path, EXTERNAL_ID_FIELD)?;
    let user = state.users.find_by_external_id(&external_id).await?;
    Ok(web::Json(user))
}

/// Fetch a user by identifier.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, format = Uuid, description = "User identifier")),
    responses(
        (status = 200, description = "User", body = UserSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<User>> {
    let user_id = parse_user_id(&path, USER_ID_FIELD)?;
    let user = state.users.find_by_id(&user_id).await?;
    Ok(web::Json(user))
}

/// Create a user, or return the existing one for a known external id.
///
/// Responds `201 Created` when a user was inserted and `200 OK` when the
/// external id was already registered; the body is identical otherwise.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequestSchema,
    responses(
        (status = 201, description = "User created", body = CreateUserResponseSchema),
        (status = 200, description = "User already existed", body = CreateUserResponseSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Conflict", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "createUser"
)]
#[post("/users")]
pub async fn create_user(
    state: web::Data<HttpState>,
    payload: web::Json<CreateUserRequest>,
) -> ApiResult<HttpResponse> {
    let response = state.users.create_user(payload.into_inner()).await?;
    let mut builder = if response.created {
        HttpResponse::Created()
    } else {
        HttpResponse::Ok()
    };
    Ok(builder.json(response))
}
