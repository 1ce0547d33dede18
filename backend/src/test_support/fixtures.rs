//! Builders for users and grants with sensible defaults.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{
    BoostDefinitionId, BoostGrant, BoostGrantDraft, BoostGrantId, DisplayName, ExternalId,
    MultiplierPermille, ReferralCode, User, UserDraft, UserId,
};

/// `2025-01-01T00:00:00Z` plus `hour` hours; a stable epoch for tests.
pub fn at_hour(hour: i64) -> DateTime<Utc> {
    let Some(epoch) = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single() else {
        panic!("fixture epoch must be a valid timestamp");
    };
    epoch + Duration::hours(hour)
}

/// Builder for [`User`] values.
#[derive(Debug, Clone)]
pub struct UserBuilder {
    draft: UserDraft,
}

impl UserBuilder {
    pub fn new(external_id: &str) -> Self {
        let Ok(external) = ExternalId::new(external_id) else {
            panic!("fixture external id must be valid: {external_id:?}");
        };
        Self {
            draft: UserDraft {
                id: UserId::random(),
                external_id: external,
                display_name: DisplayName::default(),
                avatar_url: None,
                points: 0,
                mining_speed: 10,
                last_accrual_time: at_hour(0),
                referral_code: ReferralCode::generate(),
                referred_by: None,
                completed_tasks_count: 0,
                boost_usage_count: 0,
                created_at: at_hour(0),
            },
        }
    }

    pub fn id(mut self, id: UserId) -> Self {
        self.draft.id = id;
        self
    }

    pub fn display_name(mut self, name: &str) -> Self {
        let Ok(name) = DisplayName::new(name) else {
            panic!("fixture display name must be valid");
        };
        self.draft.display_name = name;
        self
    }

    pub fn points(mut self, points: u64) -> Self {
        self.draft.points = points;
        self
    }

    pub fn mining_speed(mut self, speed: u32) -> Self {
        self.draft.mining_speed = speed;
        self
    }

    pub fn last_accrual_time(mut self, at: DateTime<Utc>) -> Self {
        self.draft.last_accrual_time = at;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.draft.created_at = at;
        self
    }

    pub fn referral_code(mut self, code: &str) -> Self {
        self.draft.referral_code = code_or_panic(code);
        self
    }

    pub fn referred_by(mut self, code: &str) -> Self {
        self.draft.referred_by = Some(code_or_panic(code));
        self
    }

    pub fn build(self) -> User {
        match User::new(self.draft) {
            Ok(user) => user,
            Err(error) => panic!("fixture user must be valid: {error}"),
        }
    }
}

fn code_or_panic(code: &str) -> ReferralCode {
    match ReferralCode::new(code) {
        Ok(code) => code,
        Err(error) => panic!("fixture referral code must be valid: {error}"),
    }
}

/// Builder for [`BoostGrant`] values.
#[derive(Debug, Clone)]
pub struct GrantBuilder {
    draft: BoostGrantDraft,
}

impl GrantBuilder {
    /// A 24 hour grant starting at [`at_hour`]`(0)`.
    pub fn new(id: i64, user_id: UserId, permille: u32) -> Self {
        let Ok(multiplier) = MultiplierPermille::new(permille) else {
            panic!("fixture multiplier must be positive");
        };
        Self {
            draft: BoostGrantDraft {
                id: BoostGrantId::new(id),
                user_id,
                boost_definition_id: BoostDefinitionId::new(1),
                multiplier,
                start_time: at_hour(0),
                end_time: at_hour(24),
                active: true,
            },
        }
    }

    pub fn window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.draft.start_time = start;
        self.draft.end_time = end;
        self
    }

    pub fn definition(mut self, id: i64) -> Self {
        self.draft.boost_definition_id = BoostDefinitionId::new(id);
        self
    }

    pub fn build(self) -> BoostGrant {
        match BoostGrant::new(self.draft) {
            Ok(grant) => grant,
            Err(error) => panic!("fixture grant must be valid: {error}"),
        }
    }
}
