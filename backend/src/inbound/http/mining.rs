//! Mining API handlers.
//!
//! ```text
//! POST /api/v1/users/{id}/mining/claim
//! ```

use actix_web::{post, web};

use crate::domain::ports::ClaimMiningResponse;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ClaimMiningResponseSchema, ErrorSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::USER_ID_FIELD;
use crate::inbound::http::validation::parse_user_id;

/// Settle every whole hour elapsed since the user's last checkpoint.
///
/// Claiming before a full hour has passed is not an error: the response
/// reports zero credited points and leaves the checkpoint untouched.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/mining/claim",
    params(("id" = String, Path, format = Uuid, description = "User identifier")),
    responses(
        (status = 200, description = "Claim settled", body = ClaimMiningResponseSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Concurrent claims exhausted retries", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["mining"],
    operation_id = "claimMining"
)]
#[post("/users/{id}/mining/claim")]
pub async fn claim_mining(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<ClaimMiningResponse>> {
    let user_id = parse_user_id(&path, USER_ID_FIELD)?;
    let response = state.mining.claim(&user_id).await?;
    Ok(web::Json(response))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::Duration;
    use rstest::rstest;
    use serde_json::Value;

    use super::*;
    use crate::domain::Error;
    use crate::inbound::http::test_utils::{TestPorts, test_app};
    use crate::test_support::{UserBuilder, at_hour};

    #[rstest]
    #[actix_web::test]
    async fn claim_returns_credited_points_and_next_checkpoint() {
        let user = UserBuilder::new("42")
            .points(30)
            .last_accrual_time(at_hour(3))
            .build();
        let user_id = user.id();
        let mut ports = TestPorts::default();
        ports
            .mining
            .expect_claim()
            .withf(move |id| *id == user_id)
            .times(1)
            .return_once(move |_| {
                Ok(ClaimMiningResponse {
                    next_accrual_at: at_hour(3) + Duration::hours(1),
                    user,
                    credited_points: 30,
                    credited_hours: 3,
                    rate_per_hour: 10,
                })
            });
        let app = actix_test::init_service(test_app(ports)).await;

        let request = actix_test::TestRequest::post()
            .uri(&format!("/api/v1/users/{user_id}/mining/claim"))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["creditedPoints"], 30);
        assert_eq!(body["creditedHours"], 3);
        assert_eq!(body["ratePerHour"], 10);
        assert_eq!(body["user"]["points"], 30);
        assert_eq!(
            body["nextAccrualAt"],
            (at_hour(3) + Duration::hours(1)).to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn exhausted_claim_retries_surface_as_conflict() {
        let mut ports = TestPorts::default();
        ports
            .mining
            .expect_claim()
            .times(1)
            .return_once(|_| Err(Error::conflict("accrual raced; retry")));
        let app = actix_test::init_service(test_app(ports)).await;

        let request = actix_test::TestRequest::post()
            .uri(&format!(
                "/api/v1/users/{}/mining/claim",
                crate::domain::UserId::random()
            ))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
