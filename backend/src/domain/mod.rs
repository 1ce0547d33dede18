//! Domain primitives, services and ports.
//!
//! Purpose: hold the mining rules (accrual arithmetic, boost stacking,
//! referral bonuses) free of transport and storage concerns. Types are
//! immutable outside the documented mutators and carry their serde
//! contracts in their Rustdoc.
//!
//! Public surface:
//! - [`User`], [`BoostDefinition`], [`BoostGrant`], [`ReferralRecord`],
//!   [`TaskDefinition`], [`UserTask`]: persisted aggregates.
//! - [`quote_accrual`] and [`effective_rate`]: the accrual arithmetic shared
//!   with the client session.
//! - Services implementing the driving ports in [`ports`].
//! - [`Error`] / [`ErrorCode`]: transport-agnostic failures.

pub mod boost;
pub mod error;
pub mod mining;
pub mod ports;
pub mod referral;
pub mod task;
pub mod trace_id;
pub mod user;

mod boost_service;
mod mining_service;
mod referral_service;
mod task_service;
mod user_directory_service;

pub use self::boost::{
    BoostDefinition, BoostDefinitionDraft, BoostDefinitionId, BoostGrant, BoostGrantDraft,
    BoostGrantId, BoostValidationError, MultiplierPermille, PERMILLE_SCALE, default_catalog,
};
pub use self::boost_service::BoostService;
pub use self::error::{Error, ErrorCode};
pub use self::mining::{AccrualQuote, effective_rate, quote_accrual};
pub use self::mining_service::{DEFAULT_MAX_ACCRUAL_ATTEMPTS, MiningService};
pub use self::referral::{
    NewReferral, ReferralId, ReferralPolicy, ReferralRecord, boosted_speed,
};
pub use self::referral_service::{ReferralBonusApplier, ReferralQueryService};
pub use self::task::{
    TaskDefinition, TaskDefinitionDraft, TaskId, TaskKind, TaskValidationError, UserTask,
    default_task_catalog,
};
pub use self::task_service::TaskService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{
    DisplayName, ExternalId, ReferralCode, User, UserDraft, UserId, UserValidationError,
    parse_avatar_url,
};
pub use self::user_directory_service::{
    DEFAULT_MINING_SPEED, NewUserDefaults, UserDirectoryService,
};
