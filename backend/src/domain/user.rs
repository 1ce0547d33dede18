//! User identity and balance state.
//!
//! The core only ever changes `points`, `mining_speed`,
//! `last_accrual_time` and `boost_usage_count`; identity fields are fixed at
//! creation.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::mining::AccrualQuote;

/// Maximum accepted length of an external identity.
pub const EXTERNAL_ID_MAX: usize = 128;
/// Maximum accepted length of a display name.
pub const DISPLAY_NAME_MAX: usize = 128;
/// Maximum accepted length of a referral code.
pub const REFERRAL_CODE_MAX: usize = 32;
/// Prefix of generated referral codes.
pub const REFERRAL_CODE_PREFIX: &str = "REF-";
const REFERRAL_CODE_SUFFIX_LEN: usize = 6;

/// Validation errors raised by user constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    #[error("external id must not be empty")]
    EmptyExternalId,
    #[error("external id must be at most {max} characters")]
    ExternalIdTooLong { max: usize },
    #[error("display name must be at most {max} characters")]
    DisplayNameTooLong { max: usize },
    #[error("referral code must be 1-{max} ASCII letters, digits or hyphens")]
    InvalidReferralCode { max: usize },
    #[error("avatar url is not a valid absolute url")]
    InvalidAvatarUrl,
    #[error("mining speed must be positive")]
    ZeroMiningSpeed,
}

/// Stable user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identity assigned by the host platform; unique per user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalId(String);

impl ExternalId {
    /// Validate and wrap an external identity.
    ///
    /// # Examples
    /// ```
    /// use pointminer::domain::ExternalId;
    ///
    /// let id = ExternalId::new(" 12345 ").expect("valid id");
    /// assert_eq!(id.as_ref(), "12345");
    /// assert!(ExternalId::new("  ").is_err());
    /// ```
    pub fn new(value: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyExternalId);
        }
        if trimmed.chars().count() > EXTERNAL_ID_MAX {
            return Err(UserValidationError::ExternalIdTooLong {
                max: EXTERNAL_ID_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ExternalId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExternalId> for String {
    fn from(value: ExternalId) -> Self {
        value.0
    }
}

/// Human-readable name. May be empty when the identity source omitted it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and wrap a display name; surrounding whitespace is dropped.
    pub fn new(value: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.chars().count() > DISPLAY_NAME_MAX {
            return Err(UserValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Whether the identity source supplied no name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

/// Code a user shares so new users can name them as referrer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Validate and wrap a referral code.
    pub fn new(value: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = value.as_ref().trim();
        let valid_chars = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if trimmed.is_empty() || trimmed.len() > REFERRAL_CODE_MAX || !valid_chars {
            return Err(UserValidationError::InvalidReferralCode {
                max: REFERRAL_CODE_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Generate a random `REF-XXXXXX` code.
    ///
    /// # Examples
    /// ```
    /// use pointminer::domain::ReferralCode;
    ///
    /// let code = ReferralCode::generate();
    /// assert!(code.as_ref().starts_with("REF-"));
    /// assert_eq!(code.as_ref().len(), 10);
    /// ```
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(REFERRAL_CODE_SUFFIX_LEN)
            .map(|byte| char::from(byte).to_ascii_uppercase())
            .collect();
        Self(format!("{REFERRAL_CODE_PREFIX}{suffix}"))
    }
}

impl AsRef<str> for ReferralCode {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ReferralCode {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReferralCode> for String {
    fn from(value: ReferralCode) -> Self {
        value.0
    }
}

/// Parse an optional avatar URL, rejecting relative or malformed values.
pub fn parse_avatar_url(value: &str) -> Result<Url, UserValidationError> {
    Url::parse(value.trim()).map_err(|_| UserValidationError::InvalidAvatarUrl)
}

/// Input for [`User::new`].
#[derive(Debug, Clone)]
pub struct UserDraft {
    pub id: UserId,
    pub external_id: ExternalId,
    pub display_name: DisplayName,
    pub avatar_url: Option<Url>,
    pub points: u64,
    pub mining_speed: u32,
    pub last_accrual_time: DateTime<Utc>,
    pub referral_code: ReferralCode,
    pub referred_by: Option<ReferralCode>,
    pub completed_tasks_count: u32,
    pub boost_usage_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Mining account of a single user.
///
/// ## Invariants
/// - `mining_speed` is positive.
/// - `last_accrual_time` never moves backwards.
/// - `points` is unsigned, so a debit that exceeds the balance is refused
///   rather than wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UserDto", into = "UserDto")]
pub struct User {
    id: UserId,
    external_id: ExternalId,
    display_name: DisplayName,
    avatar_url: Option<Url>,
    points: u64,
    mining_speed: u32,
    last_accrual_time: DateTime<Utc>,
    referral_code: ReferralCode,
    referred_by: Option<ReferralCode>,
    completed_tasks_count: u32,
    boost_usage_count: u32,
    created_at: DateTime<Utc>,
}

impl User {
    /// Build a user from validated parts.
    pub fn new(draft: UserDraft) -> Result<Self, UserValidationError> {
        if draft.mining_speed == 0 {
            return Err(UserValidationError::ZeroMiningSpeed);
        }
        Ok(Self {
            id: draft.id,
            external_id: draft.external_id,
            display_name: draft.display_name,
            avatar_url: draft.avatar_url,
            points: draft.points,
            mining_speed: draft.mining_speed,
            last_accrual_time: draft.last_accrual_time,
            referral_code: draft.referral_code,
            referred_by: draft.referred_by,
            completed_tasks_count: draft.completed_tasks_count,
            boost_usage_count: draft.boost_usage_count,
            created_at: draft.created_at,
        })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn external_id(&self) -> &ExternalId {
        &self.external_id
    }

    pub fn display_name(&self) -> &DisplayName {
        &self.display_name
    }

    pub fn avatar_url(&self) -> Option<&Url> {
        self.avatar_url.as_ref()
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    /// Base mining speed in points per hour, before boosts.
    pub fn mining_speed(&self) -> u32 {
        self.mining_speed
    }

    /// Checkpoint up to which points have been credited.
    pub fn last_accrual_time(&self) -> DateTime<Utc> {
        self.last_accrual_time
    }

    pub fn referral_code(&self) -> &ReferralCode {
        &self.referral_code
    }

    pub fn referred_by(&self) -> Option<&ReferralCode> {
        self.referred_by.as_ref()
    }

    pub fn completed_tasks_count(&self) -> u32 {
        self.completed_tasks_count
    }

    pub fn boost_usage_count(&self) -> u32 {
        self.boost_usage_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Credit an accrual quote and advance the checkpoint by the whole hours
    /// it covers. Returns `false` and leaves the user untouched when the
    /// quote was computed against a different checkpoint.
    pub fn apply_accrual(&mut self, quote: &AccrualQuote) -> bool {
        self.advance_checkpoint(quote.from(), quote.to(), quote.earned())
    }

    /// Compare-and-swap form of [`User::apply_accrual`] used by stores.
    pub fn advance_checkpoint(
        &mut self,
        expected: DateTime<Utc>,
        new_checkpoint: DateTime<Utc>,
        earned: u64,
    ) -> bool {
        if self.last_accrual_time != expected || new_checkpoint < expected {
            return false;
        }
        self.points = self.points.saturating_add(earned);
        self.last_accrual_time = new_checkpoint;
        true
    }

    /// Debit `price` for a boost purchase. Refuses when the balance is short.
    pub fn debit_for_boost(&mut self, price: u64) -> bool {
        match self.points.checked_sub(price) {
            Some(remaining) => {
                self.points = remaining;
                self.boost_usage_count = self.boost_usage_count.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Credit a referral bonus and raise the base speed.
    pub fn credit_referral(&mut self, bonus_points: u64, speed_bonus_permille: u32) {
        self.points = self.points.saturating_add(bonus_points);
        self.mining_speed = super::referral::boosted_speed(self.mining_speed, speed_bonus_permille);
    }

    /// Credit a completed task's points and count the completion.
    pub fn credit_task(&mut self, points: u64) {
        self.points = self.points.saturating_add(points);
        self.completed_tasks_count = self.completed_tasks_count.saturating_add(1);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    id: UserId,
    external_id: ExternalId,
    #[serde(default)]
    display_name: DisplayName,
    #[serde(default)]
    avatar_url: Option<Url>,
    points: u64,
    mining_speed: u32,
    last_accrual_time: DateTime<Utc>,
    referral_code: ReferralCode,
    #[serde(default)]
    referred_by: Option<ReferralCode>,
    #[serde(default)]
    completed_tasks_count: u32,
    #[serde(default)]
    boost_usage_count: u32,
    created_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            external_id: value.external_id,
            display_name: value.display_name,
            avatar_url: value.avatar_url,
            points: value.points,
            mining_speed: value.mining_speed,
            last_accrual_time: value.last_accrual_time,
            referral_code: value.referral_code,
            referred_by: value.referred_by,
            completed_tasks_count: value.completed_tasks_count,
            boost_usage_count: value.boost_usage_count,
            created_at: value.created_at,
        }
    }
}

impl TryFrom<UserDto> for User {
    type Error = UserValidationError;

    fn try_from(value: UserDto) -> Result<Self, Self::Error> {
        Self::new(UserDraft {
            id: value.id,
            external_id: value.external_id,
            display_name: value.display_name,
            avatar_url: value.avatar_url,
            points: value.points,
            mining_speed: value.mining_speed,
            last_accrual_time: value.last_accrual_time,
            referral_code: value.referral_code,
            referred_by: value.referred_by,
            completed_tasks_count: value.completed_tasks_count,
            boost_usage_count: value.boost_usage_count,
            created_at: value.created_at,
        })
    }
}

#[cfg(test)]
#[path = "user_tests.rs"]
mod tests;
