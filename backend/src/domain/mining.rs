//! Accrual arithmetic shared by the server service and the client session.
//!
//! Everything here is pure: callers supply the user, the grants they loaded
//! and the instant to evaluate at.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{BoostGrant, User};

/// Points earned per hour at `base_speed` under the grants live at `now`.
///
/// Grants are applied one at a time in ascending id order and the rate is
/// truncated after every step, so the result is independent of the order the
/// grants were loaded in. Grants outside their window are ignored regardless
/// of their swept `active` flag.
///
/// # Examples
/// ```
/// use chrono::{Duration, Utc};
/// use pointminer::domain::{
///     effective_rate, BoostDefinitionId, BoostGrant, BoostGrantDraft, BoostGrantId,
///     MultiplierPermille, UserId,
/// };
///
/// let now = Utc::now();
/// let grant = BoostGrant::new(BoostGrantDraft {
///     id: BoostGrantId::new(1),
///     user_id: UserId::random(),
///     boost_definition_id: BoostDefinitionId::new(1),
///     multiplier: MultiplierPermille::new(1_500).expect("positive"),
///     start_time: now,
///     end_time: now + Duration::hours(24),
///     active: true,
/// })
/// .expect("valid grant");
/// assert_eq!(effective_rate(10, &[grant], now), 15);
/// ```
pub fn effective_rate(base_speed: u32, grants: &[BoostGrant], now: DateTime<Utc>) -> u64 {
    let mut live: Vec<&BoostGrant> = grants.iter().filter(|g| g.is_live_at(now)).collect();
    live.sort_by_key(|g| g.id());
    live.iter()
        .fold(u64::from(base_speed), |rate, grant| grant.multiplier().apply(rate))
}

/// Credit owed for the whole hours elapsed since a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccrualQuote {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    elapsed_hours: i64,
    rate: u64,
    earned: u64,
}

impl AccrualQuote {
    /// Checkpoint the quote was computed against.
    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    /// Checkpoint after the credit: `from` plus the whole hours credited.
    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn elapsed_hours(&self) -> i64 {
        self.elapsed_hours
    }

    /// Boosted points per hour used for the whole window.
    pub fn rate(&self) -> u64 {
        self.rate
    }

    pub fn earned(&self) -> u64 {
        self.earned
    }
}

/// Quote the accrual owed to `user` at `now`, or `None` when less than one
/// whole hour has passed since the checkpoint.
///
/// The multiplier snapshot is taken at `now` and applies to every hour in
/// the window. The checkpoint advances by whole hours only, so fractional
/// progress carries into the next claim.
pub fn quote_accrual(user: &User, grants: &[BoostGrant], now: DateTime<Utc>) -> Option<AccrualQuote> {
    let from = user.last_accrual_time();
    let elapsed_hours = (now - from).num_hours();
    if elapsed_hours <= 0 {
        return None;
    }
    let rate = effective_rate(user.mining_speed(), grants, now);
    let hours = u64::try_from(elapsed_hours).ok()?;
    Some(AccrualQuote {
        from,
        to: from + Duration::hours(elapsed_hours),
        elapsed_hours,
        rate,
        earned: hours.saturating_mul(rate),
    })
}

#[cfg(test)]
#[path = "mining_tests.rs"]
mod tests;
