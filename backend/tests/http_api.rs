//! End-to-end HTTP tests over the in-memory store.
//!
//! The real services and route table run against one store and a manual
//! clock, covering sign-up with a referral, claims, boost purchases and
//! task completion.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use mockable::Clock;
use pointminer::Trace;
use pointminer::domain::{
    BoostService, MiningService, ReferralBonusApplier, ReferralQueryService, TaskService,
    UserDirectoryService,
};
use pointminer::inbound::http::state::{HttpState, HttpStatePorts};
use pointminer::inbound::http::{api_scope, json_error_handler};
use pointminer::outbound::memory::InMemoryStore;
use pointminer::test_support::{MutableClock, at_hour};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

struct Wiring {
    state: HttpState,
    clock: Arc<MutableClock>,
}

#[fixture]
fn wiring() -> Wiring {
    let store = Arc::new(InMemoryStore::with_default_catalog());
    let clock = Arc::new(MutableClock::new(at_hour(0)));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let bonus = ReferralBonusApplier::new(store.clone(), store.clone(), dyn_clock.clone());
    let boosts = Arc::new(BoostService::new(store.clone(), dyn_clock.clone()));
    let tasks = Arc::new(TaskService::new(store.clone(), dyn_clock.clone()));
    let state = HttpState::new(HttpStatePorts {
        users: Arc::new(UserDirectoryService::new(store.clone(), bonus, dyn_clock.clone())),
        mining: Arc::new(MiningService::new(store.clone(), store.clone(), dyn_clock)),
        boosts: boosts.clone(),
        boosts_query: boosts,
        referrals: Arc::new(ReferralQueryService::new(store.clone(), store)),
        tasks: tasks.clone(),
        tasks_query: tasks,
    });
    Wiring { state, clock }
}

macro_rules! call {
    ($app:expr, $request:expr) => {{
        let response = actix_test::call_service(&$app, $request.to_request()).await;
        let status = response.status();
        let body: Value = actix_test::read_body_json(response).await;
        (status, body)
    }};
}

#[rstest]
#[actix_web::test]
async fn sign_up_claim_and_boost_round_trip(wiring: Wiring) {
    let Wiring { state, clock } = wiring;
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .wrap(Trace)
            .service(api_scope()),
    )
    .await;

    let (status, referrer) = call!(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users")
            .set_json(json!({ "externalId": "1001", "displayName": "Ada" }))
    );
    assert_eq!(status, StatusCode::CREATED);
    let referrer_id = referrer["user"]["id"].as_str().expect("id").to_owned();
    let code = referrer["user"]["referralCode"].as_str().expect("code").to_owned();
    assert_eq!(referrer["user"]["miningSpeed"], 10);
    assert_eq!(referrer["user"]["points"], 0);

    let (status, again) = call!(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users")
            .set_json(json!({ "externalId": "1001", "displayName": "Someone else" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["created"], false);
    assert_eq!(again["user"]["id"], referrer_id.as_str());

    let (status, _) = call!(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users")
            .set_json(json!({ "externalId": "2002", "referredBy": code }))
    );
    assert_eq!(status, StatusCode::CREATED);

    let (status, referrals) = call!(
        app,
        actix_test::TestRequest::get().uri(&format!("/api/v1/users/{referrer_id}/referrals"))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(referrals.as_array().map(Vec::len), Some(1));

    let (_, credited) = call!(
        app,
        actix_test::TestRequest::get().uri(&format!("/api/v1/users/{referrer_id}"))
    );
    assert_eq!(credited["points"], 100);

    clock.advance_minutes(5 * 60 + 20);
    let (status, claim) = call!(
        app,
        actix_test::TestRequest::post().uri(&format!("/api/v1/users/{referrer_id}/mining/claim"))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claim["creditedHours"], 5);
    assert_eq!(claim["creditedPoints"], 50);
    assert_eq!(claim["user"]["points"], 150);

    let (status, rejected) = call!(
        app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/users/{referrer_id}/boosts"))
            .set_json(json!({ "boostDefinitionId": 2 }))
    );
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(rejected["code"], "insufficient_funds");
    assert!(rejected["traceId"].is_string());

    let (status, unknown) = call!(
        app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/users/{referrer_id}/boosts"))
            .set_json(json!({ "boostDefinitionId": 99 }))
    );
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(unknown["code"], "unknown_boost_type");

    let (_, catalog) = call!(app, actix_test::TestRequest::get().uri("/api/v1/boosts"));
    assert_eq!(catalog.as_array().map(Vec::len), Some(4));
}

#[rstest]
#[actix_web::test]
async fn purchased_boost_is_listed_until_its_window_closes(wiring: Wiring) {
    let Wiring { state, clock } = wiring;
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .service(api_scope()),
    )
    .await;

    let (_, created) = call!(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users")
            .set_json(json!({ "externalId": "3003" }))
    );
    let user_id = created["user"]["id"].as_str().expect("id").to_owned();

    // 50 hours at 10 points per hour covers the 500 point boost.
    clock.advance_minutes(50 * 60);
    let (_, claim) = call!(
        app,
        actix_test::TestRequest::post().uri(&format!("/api/v1/users/{user_id}/mining/claim"))
    );
    assert_eq!(claim["user"]["points"], 500);

    let (status, receipt) = call!(
        app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/users/{user_id}/boosts"))
            .set_json(json!({ "boostDefinitionId": 1 }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["user"]["points"], 0);
    assert_eq!(receipt["user"]["boostUsageCount"], 1);
    assert_eq!(receipt["grant"]["multiplierPermille"], 1500);

    let (_, live) = call!(
        app,
        actix_test::TestRequest::get().uri(&format!("/api/v1/users/{user_id}/boosts"))
    );
    assert_eq!(live.as_array().map(Vec::len), Some(1));

    let (_, after) = call!(
        app,
        actix_test::TestRequest::get().uri(&format!(
            "/api/v1/users/{user_id}/boosts?asOf={}",
            (at_hour(50) + chrono::Duration::hours(24))
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        ))
    );
    assert_eq!(after.as_array().map(Vec::len), Some(0));

    clock.advance_minutes(2 * 60);
    let (_, boosted) = call!(
        app,
        actix_test::TestRequest::post().uri(&format!("/api/v1/users/{user_id}/mining/claim"))
    );
    assert_eq!(boosted["ratePerHour"], 15);
    assert_eq!(boosted["creditedPoints"], 30);
}

#[rstest]
#[actix_web::test]
async fn task_progress_completes_and_credits_once(wiring: Wiring) {
    let Wiring { state, .. } = wiring;
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(api_scope()),
    )
    .await;

    let (_, created) = call!(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users")
            .set_json(json!({ "externalId": "4004" }))
    );
    let user_id = created["user"]["id"].as_str().expect("id").to_owned();

    let (status, daily) = call!(app, actix_test::TestRequest::get().uri("/api/v1/tasks?type=daily"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(daily.as_array().map(Vec::len), Some(2));

    let (status, partial) = call!(
        app,
        actix_test::TestRequest::put()
            .uri(&format!("/api/v1/users/{user_id}/tasks/2"))
            .set_json(json!({ "progress": 2 }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(partial["creditedPoints"], 0);
    assert!(partial["userTask"]["completedAt"].is_null());

    let (_, done) = call!(
        app,
        actix_test::TestRequest::post().uri(&format!("/api/v1/users/{user_id}/tasks/2/complete"))
    );
    assert_eq!(done["creditedPoints"], 50);
    assert_eq!(done["userTask"]["progress"], 3);
    assert_eq!(done["user"]["points"], 50);
    assert_eq!(done["user"]["completedTasksCount"], 1);

    let (_, repeat) = call!(
        app,
        actix_test::TestRequest::put()
            .uri(&format!("/api/v1/users/{user_id}/tasks/2"))
            .set_json(json!({ "progress": 3 }))
    );
    assert_eq!(repeat["creditedPoints"], 0);
    assert_eq!(repeat["user"]["points"], 50);

    let (_, progress) = call!(
        app,
        actix_test::TestRequest::get().uri(&format!("/api/v1/users/{user_id}/tasks"))
    );
    assert_eq!(progress.as_array().map(Vec::len), Some(1));

    let (status, missing) = call!(
        app,
        actix_test::TestRequest::post().uri(&format!("/api/v1/users/{user_id}/tasks/99/complete"))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["code"], "not_found");
}
