//! Server construction and middleware wiring.

mod config;

pub use config::{ServerConfig, Store};

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::{Clock, DefaultClock};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use pointminer::Trace;
#[cfg(debug_assertions)]
use pointminer::doc::ApiDoc;
use pointminer::domain::ports::{
    BoostRepository, ReferralRepository, TaskRepository, UserRepository,
};
use pointminer::domain::{
    BoostService, MiningService, ReferralBonusApplier, ReferralQueryService, TaskService, TraceId,
    UserDirectoryService,
};
use pointminer::inbound::http::health::{HealthState, live, ready};
use pointminer::inbound::http::state::{HttpState, HttpStatePorts};
use pointminer::inbound::http::{api_scope, json_error_handler};
use pointminer::outbound::persistence::{
    DieselBoostRepository, DieselReferralRepository, DieselTaskRepository, DieselUserRepository,
};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Wire domain services over the given repositories.
///
/// Returns the handler state and the boost service used by the sweeper.
fn build_services<U, B, R, T>(
    users: Arc<U>,
    boosts: Arc<B>,
    referrals: Arc<R>,
    tasks: Arc<T>,
    config: &ServerConfig,
) -> (HttpState, Arc<BoostService<B>>)
where
    U: UserRepository + 'static,
    B: BoostRepository + 'static,
    R: ReferralRepository + 'static,
    T: TaskRepository + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let bonus = ReferralBonusApplier::new(users.clone(), referrals.clone(), clock.clone())
        .with_policy(config.referral_policy);
    let directory = UserDirectoryService::new(users.clone(), bonus, clock.clone())
        .with_defaults(config.new_user_defaults);
    let mining = MiningService::new(users.clone(), boosts.clone(), clock.clone())
        .with_max_attempts(config.max_accrual_attempts);
    let boost_service = Arc::new(BoostService::new(boosts, clock.clone()));
    let task_service = Arc::new(TaskService::new(tasks, clock));
    let state = HttpState::new(HttpStatePorts {
        users: Arc::new(directory),
        mining: Arc::new(mining),
        boosts: boost_service.clone(),
        boosts_query: boost_service.clone(),
        referrals: Arc::new(ReferralQueryService::new(users, referrals)),
        tasks: task_service.clone(),
        tasks_query: task_service,
    });
    (state, boost_service)
}

/// Periodically flip the informational `active` flag on expired grants.
fn spawn_sweeper<B>(service: Arc<BoostService<B>>, period: Duration)
where
    B: BoostRepository + 'static,
{
    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(error) = TraceId::detached(service.sweep_expired()).await {
                warn!(code = ?error.code(), message = error.message(), "expired boost sweep failed");
            }
        }
    });
    info!(?period, "expired boost sweeper started");
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .wrap(Trace)
        .service(api_scope())
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server for the configured store.
///
/// Starts the expired-boost sweeper when an interval is configured and marks
/// the health state ready once the listener is bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let (http_state, sweep) = match &config.store {
        Store::Memory(store) => {
            let (state, boosts) =
                build_services(store.clone(), store.clone(), store.clone(), store.clone(), &config);
            let sweep: Box<dyn FnOnce(Duration)> =
                Box::new(move |period| spawn_sweeper(boosts, period));
            (state, sweep)
        }
        Store::Postgres(pool) => {
            let (state, boosts) = build_services(
                Arc::new(DieselUserRepository::new(pool.clone())),
                Arc::new(DieselBoostRepository::new(pool.clone())),
                Arc::new(DieselReferralRepository::new(pool.clone())),
                Arc::new(DieselTaskRepository::new(pool.clone())),
                &config,
            );
            let sweep: Box<dyn FnOnce(Duration)> =
                Box::new(move |period| spawn_sweeper(boosts, period));
            (state, sweep)
        }
    };
    if let Some(period) = config.sweep_interval {
        sweep(period);
    }

    let http_state = web::Data::new(http_state);
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || build_app(server_health_state.clone(), http_state.clone()))
        .bind(config.bind_addr())?
        .run();

    health_state.mark_ready();
    info!(addr = %config.bind_addr(), "http server listening");
    Ok(server)
}
