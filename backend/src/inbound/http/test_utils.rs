//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::{App, web};

use crate::domain::ports::{
    MockBoostCommand, MockBoostQuery, MockMiningCommand, MockReferralQuery, MockTaskCommand,
    MockTaskQuery, MockUserDirectory,
};
use crate::inbound::http::error::json_error_handler;
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::inbound::http::{api_scope, health};

/// Mock ports for handler tests; set expectations before [`TestPorts::into_state`].
///
/// Mocks without expectations panic when called, so any port a test leaves
/// untouched doubles as a "never called" assertion.
#[derive(Default)]
pub struct TestPorts {
    pub users: MockUserDirectory,
    pub mining: MockMiningCommand,
    pub boosts: MockBoostCommand,
    pub boosts_query: MockBoostQuery,
    pub referrals: MockReferralQuery,
    pub tasks: MockTaskCommand,
    pub tasks_query: MockTaskQuery,
}

impl TestPorts {
    pub fn into_state(self) -> HttpState {
        HttpState::new(HttpStatePorts {
            users: Arc::new(self.users),
            mining: Arc::new(self.mining),
            boosts: Arc::new(self.boosts),
            boosts_query: Arc::new(self.boosts_query),
            referrals: Arc::new(self.referrals),
            tasks: Arc::new(self.tasks),
            tasks_query: Arc::new(self.tasks_query),
        })
    }
}

/// Build the production route table around the given ports.
pub fn test_app(
    ports: TestPorts,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(ports.into_state()))
        .app_data(web::Data::new(health::HealthState::new()))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(api_scope())
}
