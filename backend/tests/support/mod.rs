//! Shared helpers for the Diesel adapter suites.
//!
//! Integration tests compile as separate crates, so each suite pulls this
//! module in with `mod support;`.

pub mod embedded_postgres;

use pg_embedded_setup_unpriv::TemporaryDatabase;
use pointminer::outbound::persistence::{DbPool, PoolConfig};
use tokio::runtime::Runtime;

pub use embedded_postgres::{provision_database, shared_cluster};

/// A migrated scratch database with a pool and the runtime that owns it.
///
/// Tests stay synchronous and drive the adapters through `runtime`, since
/// the cluster helpers block and must not run inside a Tokio runtime.
/// Fields drop in order: connections close before the database is dropped.
pub struct PgWorld {
    pub pool: DbPool,
    pub runtime: Runtime,
    _database: TemporaryDatabase,
}

impl PgWorld {
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn setup_world() -> Result<PgWorld, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster()?;
    let database = provision_database(cluster)?;
    let config = PoolConfig::new(database.url())
        .with_max_size(4)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| err.to_string())?;
    Ok(PgWorld {
        pool,
        runtime,
        _database: database,
    })
}

/// Scratch database for one test, or `None` when the cluster is skipped.
pub fn pg_world() -> Option<PgWorld> {
    match setup_world() {
        Ok(world) => Some(world),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

/// Returns true when `SKIP_TEST_CLUSTER` is set to a truthy value.
///
/// Truthy values: "1", "true", "yes" (case-insensitive).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Handles embedded cluster setup failures consistently across suites.
///
/// When `SKIP_TEST_CLUSTER` is truthy, prints a skip marker and returns
/// `None`. Otherwise panics so CI breakage is not masked.
#[expect(clippy::print_stderr, reason = "skip marker for CI logs")]
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
