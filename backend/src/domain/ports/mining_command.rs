//! Driving port for mining claims.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, User, UserId};

/// Result of a claim. A claim made before a whole hour has elapsed is not an
/// error; it credits nothing and reports when the next hour completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMiningResponse {
    pub user: User,
    pub credited_points: u64,
    pub credited_hours: i64,
    /// Boosted rate used for the credited window (points per hour).
    pub rate_per_hour: u64,
    pub next_accrual_at: DateTime<Utc>,
}

/// Credit elapsed mining time and advance the checkpoint in one call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MiningCommand: Send + Sync {
    async fn claim(&self, user_id: &UserId) -> Result<ClaimMiningResponse, Error>;
}
