//! HTTP inbound adapter exposing REST endpoints.
//!
//! Every API route lives under `/api/v1`; probes sit at the root so load
//! balancers can reach them without knowing the API version.

pub mod boosts;
pub mod error;
pub mod health;
pub mod mining;
pub mod referrals;
pub mod schemas;
pub mod state;
pub mod tasks;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod validation;

use actix_web::{Scope, web};

pub use error::{ApiResult, json_error_handler};

/// Versioned API scope with every REST handler registered.
///
/// The scope expects [`state::HttpState`] in the application data.
pub fn api_scope() -> Scope {
    web::scope("/api/v1")
        .service(users::get_user_by_external_id)
        .service(users::get_user)
        .service(users::create_user)
        .service(mining::claim_mining)
        .service(boosts::list_catalog)
        .service(boosts::list_active_boosts)
        .service(boosts::purchase_boost)
        .service(referrals::list_referrals)
        .service(tasks::list_tasks)
        .service(tasks::list_user_tasks)
        .service(tasks::update_task_progress)
        .service(tasks::complete_task)
}
