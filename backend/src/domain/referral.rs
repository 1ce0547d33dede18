//! Referral records and the bonus policy applied to referrers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;
use super::boost::PERMILLE_SCALE;

/// Identifier of a referral record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferralId(i64);

impl ReferralId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

/// One credited referral. A user appears as `referred_id` at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRecord {
    pub id: ReferralId,
    pub referrer_id: UserId,
    pub referred_id: UserId,
    pub bonus_points: u64,
    pub created_at: DateTime<Utc>,
}

/// Bonus granted to a referrer when someone signs up with their code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralPolicy {
    pub bonus_points: u64,
    /// Permanent speed increase in permille (50 = +5 %), rounded down.
    pub speed_bonus_permille: u32,
}

impl Default for ReferralPolicy {
    fn default() -> Self {
        Self {
            bonus_points: 100,
            speed_bonus_permille: 50,
        }
    }
}

/// Mining speed after a referral bonus of `bonus_permille`.
///
/// # Examples
/// ```
/// use pointminer::domain::boosted_speed;
///
/// assert_eq!(boosted_speed(10, 50), 10);
/// assert_eq!(boosted_speed(20, 50), 21);
/// ```
pub fn boosted_speed(speed: u32, bonus_permille: u32) -> u32 {
    let scaled = u64::from(speed).saturating_mul(PERMILLE_SCALE + u64::from(bonus_permille));
    // Unsigned Euclidean division is floor division.
    u32::try_from(scaled.div_euclid(PERMILLE_SCALE)).unwrap_or(u32::MAX)
}

/// Request to record a referral and credit the referrer atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReferral {
    pub referrer_id: UserId,
    pub referred_id: UserId,
    pub policy: ReferralPolicy,
    pub created_at: DateTime<Utc>,
}
