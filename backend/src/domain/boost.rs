//! Boost catalogue and purchased grants.
//!
//! Multipliers are integer permille (1500 = ×1.5) so stacking never drifts
//! through floating point.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Scale of a permille multiplier.
pub const PERMILLE_SCALE: u64 = 1_000;

/// Validation errors raised by boost constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoostValidationError {
    #[error("multiplier must be positive")]
    ZeroMultiplier,
    #[error("duration must be at least one hour")]
    ZeroDuration,
    #[error("boost name must not be empty")]
    EmptyName,
    #[error("grant must end after it starts")]
    EmptyWindow,
}

/// Identifier of a catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoostDefinitionId(i64);

impl BoostDefinitionId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for BoostDefinitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a purchased grant. Grants are applied in ascending id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoostGrantId(i64);

impl BoostGrantId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

/// Positive multiplier expressed in permille.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MultiplierPermille(u32);

impl MultiplierPermille {
    pub fn new(value: u32) -> Result<Self, BoostValidationError> {
        if value == 0 {
            return Err(BoostValidationError::ZeroMultiplier);
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Scale `rate` by this multiplier, truncating toward zero.
    ///
    /// # Examples
    /// ```
    /// use pointminer::domain::MultiplierPermille;
    ///
    /// let boost = MultiplierPermille::new(150).expect("positive");
    /// assert_eq!(boost.apply(10), 1);
    /// let double = MultiplierPermille::new(2_000).expect("positive");
    /// assert_eq!(double.apply(15), 30);
    /// ```
    pub fn apply(self, rate: u64) -> u64 {
        // Unsigned Euclidean division is floor division.
        rate.saturating_mul(u64::from(self.0))
            .div_euclid(PERMILLE_SCALE)
    }
}

impl TryFrom<u32> for MultiplierPermille {
    type Error = BoostValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MultiplierPermille> for u32 {
    fn from(value: MultiplierPermille) -> Self {
        value.0
    }
}

/// Input for [`BoostDefinition::new`].
#[derive(Debug, Clone)]
pub struct BoostDefinitionDraft {
    pub id: BoostDefinitionId,
    pub name: String,
    pub description: String,
    pub multiplier: MultiplierPermille,
    pub duration_hours: u32,
    pub price: u64,
    pub active: bool,
}

/// Catalogue entry a user can purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostDefinition {
    id: BoostDefinitionId,
    name: String,
    description: String,
    #[serde(rename = "multiplierPermille")]
    multiplier: MultiplierPermille,
    duration_hours: u32,
    price: u64,
    active: bool,
}

impl BoostDefinition {
    pub fn new(draft: BoostDefinitionDraft) -> Result<Self, BoostValidationError> {
        if draft.duration_hours == 0 {
            return Err(BoostValidationError::ZeroDuration);
        }
        if draft.name.trim().is_empty() {
            return Err(BoostValidationError::EmptyName);
        }
        Ok(Self {
            id: draft.id,
            name: draft.name.trim().to_owned(),
            description: draft.description,
            multiplier: draft.multiplier,
            duration_hours: draft.duration_hours,
            price: draft.price,
            active: draft.active,
        })
    }

    pub fn id(&self) -> BoostDefinitionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn multiplier(&self) -> MultiplierPermille {
        self.multiplier
    }

    pub fn duration_hours(&self) -> u32 {
        self.duration_hours
    }

    pub fn duration(&self) -> Duration {
        Duration::hours(i64::from(self.duration_hours))
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    /// Whether the entry can currently be purchased.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Window a grant bought at `start` would cover.
    pub fn window_from(&self, start: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (start, start + self.duration())
    }
}

/// Catalogue shipped with a fresh installation.
///
/// Ids are assigned by the store; the drafts carry placeholder ids of 1..=4
/// in catalogue order.
pub fn default_catalog() -> Vec<BoostDefinitionDraft> {
    let entry = |id: i64, name: &str, description: &str, permille: u32, hours: u32, price: u64| {
        BoostDefinitionDraft {
            id: BoostDefinitionId::new(id),
            name: name.to_owned(),
            description: description.to_owned(),
            multiplier: MultiplierPermille(permille),
            duration_hours: hours,
            price,
            active: true,
        }
    };
    vec![
        entry(1, "Speed Boost", "Mine 1.5x faster for 24 hours", 1_500, 24, 500),
        entry(2, "Super Boost", "Mine 2x faster for 24 hours", 2_000, 24, 1_000),
        entry(3, "Mega Boost", "Mine 3x faster for 24 hours", 3_000, 24, 2_000),
        entry(4, "Ultra Boost", "Mine 2x faster for a week", 2_000, 168, 5_000),
    ]
}

/// Input for [`BoostGrant::new`].
#[derive(Debug, Clone)]
pub struct BoostGrantDraft {
    pub id: BoostGrantId,
    pub user_id: UserId,
    pub boost_definition_id: BoostDefinitionId,
    pub multiplier: MultiplierPermille,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub active: bool,
}

/// A purchased boost with a fixed window.
///
/// The multiplier is copied from the definition at purchase time so later
/// catalogue edits do not change grants already sold. `active` is a swept
/// flag only; liveness is always decided by [`BoostGrant::is_live_at`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostGrant {
    id: BoostGrantId,
    user_id: UserId,
    boost_definition_id: BoostDefinitionId,
    #[serde(rename = "multiplierPermille")]
    multiplier: MultiplierPermille,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    active: bool,
}

impl BoostGrant {
    pub fn new(draft: BoostGrantDraft) -> Result<Self, BoostValidationError> {
        if draft.end_time <= draft.start_time {
            return Err(BoostValidationError::EmptyWindow);
        }
        Ok(Self {
            id: draft.id,
            user_id: draft.user_id,
            boost_definition_id: draft.boost_definition_id,
            multiplier: draft.multiplier,
            start_time: draft.start_time,
            end_time: draft.end_time,
            active: draft.active,
        })
    }

    pub fn id(&self) -> BoostGrantId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn boost_definition_id(&self) -> BoostDefinitionId {
        self.boost_definition_id
    }

    pub fn multiplier(&self) -> MultiplierPermille {
        self.multiplier
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Swept flag; may lag behind [`BoostGrant::is_live_at`].
    pub fn active_flag(&self) -> bool {
        self.active
    }

    /// Whether the window has closed at `now`. Shared by the lazy filter
    /// and the sweep so both agree on the cutoff.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    /// Whether the grant contributes to the multiplier at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && !self.is_expired_at(now)
    }

    /// Clear the swept flag.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    fn grant(start: DateTime<Utc>, hours: i64) -> BoostGrant {
        BoostGrant::new(BoostGrantDraft {
            id: BoostGrantId::new(1),
            user_id: UserId::random(),
            boost_definition_id: BoostDefinitionId::new(1),
            multiplier: MultiplierPermille::new(1_500).expect("positive"),
            start_time: start,
            end_time: start + Duration::hours(hours),
            active: true,
        })
        .expect("valid grant")
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[rstest]
    #[case(Duration::zero(), true)]
    #[case(Duration::hours(23), true)]
    #[case(Duration::hours(24), false)]
    #[case(Duration::hours(25), false)]
    #[case(Duration::seconds(-1), false)]
    fn liveness_uses_half_open_window(#[case] offset: Duration, #[case] live: bool) {
        let grant = grant(noon(), 24);
        assert_eq!(grant.is_live_at(noon() + offset), live);
    }

    #[rstest]
    fn expiry_cutoff_matches_liveness_end() {
        let grant = grant(noon(), 24);
        let end = grant.end_time();
        assert!(grant.is_expired_at(end));
        assert!(!grant.is_live_at(end));
        assert!(!grant.is_expired_at(end - Duration::seconds(1)));
    }

    #[rstest]
    fn stale_active_flag_does_not_keep_grant_live() {
        let grant = grant(noon(), 1);
        assert!(grant.active_flag());
        assert!(!grant.is_live_at(noon() + Duration::hours(2)));
    }

    #[rstest]
    fn empty_window_is_rejected() {
        let result = BoostGrant::new(BoostGrantDraft {
            id: BoostGrantId::new(1),
            user_id: UserId::random(),
            boost_definition_id: BoostDefinitionId::new(1),
            multiplier: MultiplierPermille::new(2_000).expect("positive"),
            start_time: noon(),
            end_time: noon(),
            active: true,
        });
        assert_eq!(result, Err(BoostValidationError::EmptyWindow));
    }

    #[rstest]
    #[case(1_500, 10, 15)]
    #[case(150, 10, 1)]
    #[case(200, 1, 0)]
    #[case(3_000, 7, 21)]
    fn multiplier_truncates(#[case] permille: u32, #[case] rate: u64, #[case] expected: u64) {
        let multiplier = MultiplierPermille::new(permille).expect("positive");
        assert_eq!(multiplier.apply(rate), expected);
    }

    #[rstest]
    fn zero_multiplier_is_rejected() {
        assert_eq!(
            MultiplierPermille::new(0),
            Err(BoostValidationError::ZeroMultiplier)
        );
    }

    #[rstest]
    fn default_catalog_lists_four_purchasable_boosts() {
        let catalog: Vec<BoostDefinition> = default_catalog()
            .into_iter()
            .map(|draft| BoostDefinition::new(draft).expect("valid catalogue entry"))
            .collect();
        let summary: Vec<(u32, u32, u64)> = catalog
            .iter()
            .map(|def| (def.multiplier().get(), def.duration_hours(), def.price()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1_500, 24, 500),
                (2_000, 24, 1_000),
                (3_000, 24, 2_000),
                (2_000, 168, 5_000)
            ]
        );
        assert!(catalog.iter().all(BoostDefinition::is_active));
    }
}
