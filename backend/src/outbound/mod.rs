//! Outbound adapters implementing domain and client ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel ORM.
//! - **memory**: a process-local store implementing the same repository
//!   ports, used when no database is configured and throughout the tests.
//! - **http_backend**: the `reqwest` client the authentication session uses
//!   to reach the HTTP API.

pub mod http_backend;
pub mod memory;
pub mod persistence;
