//! Referral API handlers.
//!
//! ```text
//! GET /api/v1/users/{id}/referrals
//! ```

use actix_web::{get, web};

use crate::domain::ReferralRecord;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, ReferralRecordSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::USER_ID_FIELD;
use crate::inbound::http::validation::parse_user_id;

/// List the referral records where the user is the referrer.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/referrals",
    params(("id" = String, Path, format = Uuid, description = "Referrer identifier")),
    responses(
        (status = 200, description = "Referrals, oldest first", body = [ReferralRecordSchema]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["referrals"],
    operation_id = "listReferrals"
)]
#[get("/users/{id}/referrals")]
pub async fn list_referrals(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<ReferralRecord>>> {
    let user_id = parse_user_id(&path, USER_ID_FIELD)?;
    let referrals = state.referrals.list_referrals(&user_id).await?;
    Ok(web::Json(referrals))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::Value;

    use super::*;
    use crate::domain::{Error, ReferralId, UserId};
    use crate::inbound::http::test_utils::{TestPorts, test_app};
    use crate::test_support::at_hour;

    #[rstest]
    #[actix_web::test]
    async fn referrals_are_listed_in_store_order() {
        let referrer_id = UserId::random();
        let records: Vec<ReferralRecord> = (1..=2)
            .map(|n| ReferralRecord {
                id: ReferralId::new(n),
                referrer_id,
                referred_id: UserId::random(),
                bonus_points: 100,
                created_at: at_hour(n),
            })
            .collect();
        let mut ports = TestPorts::default();
        ports
            .referrals
            .expect_list_referrals()
            .withf(move |id| *id == referrer_id)
            .times(1)
            .return_once(move |_| Ok(records));
        let app = actix_test::init_service(test_app(ports)).await;

        let request = actix_test::TestRequest::get()
            .uri(&format!("/api/v1/users/{referrer_id}/referrals"))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Vec<Value> = actix_test::read_body_json(response).await;
        let ids: Vec<_> = body.iter().map(|record| record["id"].clone()).collect();
        assert_eq!(ids, vec![Value::from(1), Value::from(2)]);
        assert_eq!(
            body.first().expect("first record")["referrerId"],
            referrer_id.to_string()
        );
    }

    #[rstest]
    #[actix_web::test]
    async fn unknown_referrer_is_not_found() {
        let mut ports = TestPorts::default();
        ports
            .referrals
            .expect_list_referrals()
            .times(1)
            .return_once(|_| Err(Error::not_found("user not found")));
        let app = actix_test::init_service(test_app(ports)).await;

        let request = actix_test::TestRequest::get()
            .uri(&format!("/api/v1/users/{}/referrals", UserId::random()))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
