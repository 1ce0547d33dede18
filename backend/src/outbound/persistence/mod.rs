//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repositories here are thin translators between Diesel rows and domain
//! types; the mining rules stay in [`crate::domain`]. Row structs and the
//! schema are private to this module. Every database failure is mapped to
//! the owning port's error enum, with SQL details kept to debug logs.
//!
//! ```ignore
//! use pointminer::outbound::persistence::{DbPool, DieselUserRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/pointminer")).await?;
//! let users = DieselUserRepository::new(pool);
//! ```

mod diesel_boost_repository;
mod diesel_error_mapping;
mod diesel_referral_repository;
mod diesel_task_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_boost_repository::DieselBoostRepository;
pub use diesel_referral_repository::DieselReferralRepository;
pub use diesel_task_repository::DieselTaskRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
