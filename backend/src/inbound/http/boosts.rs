//! Boost API handlers.
//!
//! ```text
//! GET  /api/v1/boosts
//! GET  /api/v1/users/{id}/boosts?asOf=2026-01-01T00:00:00Z
//! POST /api/v1/users/{id}/boosts {"boostDefinitionId":1}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{BoostDefinition, BoostDefinitionId, BoostGrant};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{
    BoostDefinitionSchema, BoostGrantSchema, ErrorSchema, PurchaseReceiptSchema,
};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::USER_ID_FIELD;
use crate::inbound::http::validation::{
    FieldName, parse_optional_rfc3339_timestamp, parse_user_id,
};

const AS_OF_FIELD: FieldName = FieldName::new("asOf");

/// Query string for `GET /api/v1/users/{id}/boosts`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ActiveBoostsQuery {
    /// Evaluation instant; defaults to the server clock.
    #[param(format = DateTime)]
    pub as_of: Option<String>,
}

/// Request body for `POST /api/v1/users/{id}/boosts`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseBoostRequest {
    #[schema(value_type = i64, example = 1)]
    pub boost_definition_id: BoostDefinitionId,
}

/// List purchasable boost definitions.
#[utoipa::path(
    get,
    path = "/api/v1/boosts",
    responses(
        (status = 200, description = "Active catalogue entries", body = [BoostDefinitionSchema]),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["boosts"],
    operation_id = "listBoostCatalog"
)]
#[get("/boosts")]
pub async fn list_catalog(state: web::Data<HttpState>) -> ApiResult<web::Json<Vec<BoostDefinition>>> {
    let catalog = state.boosts_query.catalog().await?;
    Ok(web::Json(catalog))
}

/// List the user's live boost grants.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/boosts",
    params(
        ("id" = String, Path, format = Uuid, description = "User identifier"),
        ActiveBoostsQuery
    ),
    responses(
        (status = 200, description = "Live grants ordered by id", body = [BoostGrantSchema]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["boosts"],
    operation_id = "listActiveBoosts"
)]
#[get("/users/{id}/boosts")]
pub async fn list_active_boosts(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<ActiveBoostsQuery>,
) -> ApiResult<web::Json<Vec<BoostGrant>>> {
    let user_id = parse_user_id(&path, USER_ID_FIELD)?;
    let as_of = parse_optional_rfc3339_timestamp(query.as_of.as_deref(), AS_OF_FIELD)?;
    let grants = state.boosts_query.active_boosts(&user_id, as_of).await?;
    Ok(web::Json(grants))
}

/// Purchase a boost for the user.
///
/// The debit, usage counter and grant are written atomically; a rejected
/// purchase leaves the balance untouched.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/boosts",
    params(("id" = String, Path, format = Uuid, description = "User identifier")),
    request_body = PurchaseBoostRequest,
    responses(
        (status = 201, description = "Boost purchased", body = PurchaseReceiptSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 402, description = "Insufficient funds", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 422, description = "Unknown or inactive boost", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["boosts"],
    operation_id = "purchaseBoost"
)]
#[post("/users/{id}/boosts")]
pub async fn purchase_boost(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<PurchaseBoostRequest>,
) -> ApiResult<HttpResponse> {
    let user_id = parse_user_id(&path, USER_ID_FIELD)?;
    let receipt = state
        .boosts
        .purchase(&user_id, payload.boost_definition_id)
        .await?;
    Ok(HttpResponse::Created().json(receipt))
}
