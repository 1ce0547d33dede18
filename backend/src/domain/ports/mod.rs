//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`) are implemented by outbound adapters;
//! driving ports (`UserDirectory`, `MiningCommand`, `BoostCommand`,
//! `BoostQuery`, `ReferralQuery`, `TaskCommand`, `TaskQuery`) are implemented by domain services and
//! consumed by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod boost_ledger;
mod boost_repository;
mod mining_command;
mod referral_query;
mod referral_repository;
mod task_board;
mod task_repository;
mod user_directory;
mod user_repository;

#[cfg(test)]
pub use boost_ledger::{MockBoostCommand, MockBoostQuery};
pub use boost_ledger::{BoostCommand, BoostQuery, PurchaseReceipt};
#[cfg(test)]
pub use boost_repository::MockBoostRepository;
pub use boost_repository::{
    BoostRepository, BoostRepositoryError, PurchaseOutcome, PurchaseRequest,
};
#[cfg(test)]
pub use mining_command::MockMiningCommand;
pub use mining_command::{ClaimMiningResponse, MiningCommand};
#[cfg(test)]
pub use referral_query::MockReferralQuery;
pub use referral_query::ReferralQuery;
#[cfg(test)]
pub use referral_repository::MockReferralRepository;
pub use referral_repository::{ReferralRepository, ReferralRepositoryError};
#[cfg(test)]
pub use task_board::{MockTaskCommand, MockTaskQuery};
pub use task_board::{TaskCommand, TaskProgressReceipt, TaskQuery};
#[cfg(test)]
pub use task_repository::MockTaskRepository;
pub use task_repository::{
    TaskProgressOutcome, TaskProgressUpdate, TaskRepository, TaskRepositoryError,
};
#[cfg(test)]
pub use user_directory::MockUserDirectory;
pub use user_directory::{CreateUserRequest, CreateUserResponse, UserDirectory};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{
    AccrualCommit, InsertUserOutcome, UserRepository, UserRepositoryError,
};
