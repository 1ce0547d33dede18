//! In-process store implementing every repository port.
//!
//! Used when no database URL is configured and in tests. One
//! `tokio::sync::Mutex` guards the whole state, so each port call is atomic
//! in the same way the Diesel adapter's single statements and transactions
//! are.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::ports::{
    AccrualCommit, BoostRepository, BoostRepositoryError, InsertUserOutcome, PurchaseOutcome,
    PurchaseRequest, ReferralRepository, ReferralRepositoryError, TaskProgressOutcome,
    TaskProgressUpdate, TaskRepository, TaskRepositoryError, UserRepository, UserRepositoryError,
};
use crate::domain::{
    BoostDefinition, BoostDefinitionId, BoostGrant, BoostGrantDraft, BoostGrantId, ExternalId,
    NewReferral, ReferralCode, ReferralId, ReferralRecord, TaskDefinition, TaskId, TaskKind,
    User, UserId, UserTask, default_catalog, default_task_catalog,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    definitions: BTreeMap<BoostDefinitionId, BoostDefinition>,
    grants: Vec<BoostGrant>,
    referrals: Vec<ReferralRecord>,
    tasks: BTreeMap<TaskId, TaskDefinition>,
    user_tasks: BTreeMap<(UserId, TaskId), UserTask>,
    next_grant_id: i64,
    next_referral_id: i64,
}

impl State {
    fn user_by_external_id(&self, external_id: &ExternalId) -> Option<&User> {
        self.users
            .values()
            .find(|user| user.external_id() == external_id)
    }

    fn allocate_grant_id(&mut self) -> BoostGrantId {
        self.next_grant_id += 1;
        BoostGrantId::new(self.next_grant_id)
    }

    fn allocate_referral_id(&mut self) -> ReferralId {
        self.next_referral_id += 1;
        ReferralId::new(self.next_referral_id)
    }
}

/// Mutex-guarded maps standing in for the database.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// An empty store with no boost or task definitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with the default boost and task catalogues.
    pub fn with_default_catalog() -> Self {
        let definitions = default_catalog()
            .into_iter()
            .filter_map(|draft| BoostDefinition::new(draft).ok())
            .map(|definition| (definition.id(), definition))
            .collect();
        let tasks = default_task_catalog()
            .into_iter()
            .filter_map(|draft| TaskDefinition::new(draft).ok())
            .map(|task| (task.id(), task))
            .collect();
        Self {
            state: Mutex::new(State {
                definitions,
                tasks,
                ..State::default()
            }),
        }
    }

    /// Insert or replace a user without the idempotency rules of
    /// [`UserRepository::insert`].
    pub async fn insert_user(&self, user: &User) {
        self.state.lock().await.users.insert(user.id(), user.clone());
    }

    /// Snapshot of a stored user.
    pub async fn user(&self, id: &UserId) -> Option<User> {
        self.state.lock().await.users.get(id).cloned()
    }

    /// Store a grant as-is, bypassing the purchase debit.
    pub async fn insert_grant(&self, grant: BoostGrant) {
        let mut state = self.state.lock().await;
        state.next_grant_id = state.next_grant_id.max(grant.id().get());
        state.grants.push(grant);
        state.grants.sort_by_key(BoostGrant::id);
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, UserRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .user_by_external_id(external_id)
            .cloned())
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Vec<User>, UserRepositoryError> {
        let state = self.state.lock().await;
        let mut matches: Vec<User> = state
            .users
            .values()
            .filter(|user| user.referral_code() == code)
            .cloned()
            .collect();
        matches.sort_by_key(|user| (user.created_at(), user.id()));
        Ok(matches)
    }

    async fn insert(&self, user: &User) -> Result<InsertUserOutcome, UserRepositoryError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.user_by_external_id(user.external_id()) {
            return Ok(InsertUserOutcome::Existing(existing.clone()));
        }
        if state
            .users
            .values()
            .any(|other| other.referral_code() == user.referral_code())
        {
            return Err(UserRepositoryError::duplicate_referral_code(
                user.referral_code().as_ref(),
            ));
        }
        state.users.insert(user.id(), user.clone());
        Ok(InsertUserOutcome::Created(user.clone()))
    }

    async fn commit_accrual(
        &self,
        commit: &AccrualCommit,
    ) -> Result<Option<User>, UserRepositoryError> {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.get_mut(&commit.user_id) else {
            return Ok(None);
        };
        if user.advance_checkpoint(
            commit.expected_checkpoint,
            commit.new_checkpoint,
            commit.earned,
        ) {
            Ok(Some(user.clone()))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl BoostRepository for InMemoryStore {
    async fn list_definitions(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<BoostDefinition>, BoostRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .definitions
            .values()
            .filter(|definition| include_inactive || definition.is_active())
            .cloned()
            .collect())
    }

    async fn find_definition(
        &self,
        id: BoostDefinitionId,
    ) -> Result<Option<BoostDefinition>, BoostRepositoryError> {
        Ok(self.state.lock().await.definitions.get(&id).cloned())
    }

    async fn list_live_grants(
        &self,
        user_id: &UserId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<BoostGrant>, BoostRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .grants
            .iter()
            .filter(|grant| grant.user_id() == *user_id && grant.is_live_at(as_of))
            .cloned()
            .collect())
    }

    async fn purchase(
        &self,
        request: &PurchaseRequest,
    ) -> Result<PurchaseOutcome, BoostRepositoryError> {
        let mut state = self.state.lock().await;
        let price = request.definition.price();
        let Some(user) = state.users.get_mut(&request.user_id) else {
            return Ok(PurchaseOutcome::UserMissing);
        };
        if !user.debit_for_boost(price) {
            return Ok(PurchaseOutcome::InsufficientFunds {
                balance: user.points(),
                price,
            });
        }
        let user = user.clone();

        let (start_time, end_time) = request.definition.window_from(request.start_time);
        let grant = BoostGrant::new(BoostGrantDraft {
            id: state.allocate_grant_id(),
            user_id: request.user_id,
            boost_definition_id: request.definition.id(),
            multiplier: request.definition.multiplier(),
            start_time,
            end_time,
            active: true,
        })
        .map_err(|err| BoostRepositoryError::query(err.to_string()))?;
        state.grants.push(grant.clone());
        Ok(PurchaseOutcome::Granted { grant, user })
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, BoostRepositoryError> {
        let mut state = self.state.lock().await;
        let mut flipped = 0_u64;
        for grant in state
            .grants
            .iter_mut()
            .filter(|grant| grant.active_flag() && grant.is_expired_at(now))
        {
            grant.deactivate();
            flipped += 1;
        }
        Ok(flipped)
    }
}

#[async_trait]
impl ReferralRepository for InMemoryStore {
    async fn record_referral(
        &self,
        referral: &NewReferral,
    ) -> Result<Option<ReferralRecord>, ReferralRepositoryError> {
        let mut state = self.state.lock().await;
        if state
            .referrals
            .iter()
            .any(|record| record.referred_id == referral.referred_id)
        {
            return Ok(None);
        }
        let Some(referrer) = state.users.get_mut(&referral.referrer_id) else {
            return Err(ReferralRepositoryError::query(format!(
                "referrer {} does not exist",
                referral.referrer_id
            )));
        };
        referrer.credit_referral(
            referral.policy.bonus_points,
            referral.policy.speed_bonus_permille,
        );

        let record = ReferralRecord {
            id: state.allocate_referral_id(),
            referrer_id: referral.referrer_id,
            referred_id: referral.referred_id,
            bonus_points: referral.policy.bonus_points,
            created_at: referral.created_at,
        };
        state.referrals.push(record.clone());
        Ok(Some(record))
    }

    async fn list_referrals(
        &self,
        referrer_id: &UserId,
    ) -> Result<Vec<ReferralRecord>, ReferralRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .referrals
            .iter()
            .filter(|record| record.referrer_id == *referrer_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TaskRepository for InMemoryStore {
    async fn list_tasks(
        &self,
        kind: Option<TaskKind>,
    ) -> Result<Vec<TaskDefinition>, TaskRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .tasks
            .values()
            .filter(|task| task.is_active() && kind.is_none_or(|kind| task.kind() == kind))
            .cloned()
            .collect())
    }

    async fn find_task(&self, id: TaskId) -> Result<Option<TaskDefinition>, TaskRepositoryError> {
        Ok(self.state.lock().await.tasks.get(&id).cloned())
    }

    async fn list_user_tasks(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<UserTask>, TaskRepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .user_tasks
            .values()
            .filter(|user_task| user_task.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn record_progress(
        &self,
        update: &TaskProgressUpdate,
    ) -> Result<TaskProgressOutcome, TaskRepositoryError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let Some(user) = state.users.get_mut(&update.user_id) else {
            return Ok(TaskProgressOutcome::UserMissing);
        };
        let user_task = state
            .user_tasks
            .entry((update.user_id, update.task.id()))
            .or_insert_with(|| UserTask::start(update.user_id, update.task.id()));
        let credited = if user_task.advance(&update.task, update.progress, update.at) {
            user.credit_task(update.task.points());
            update.task.points()
        } else {
            0
        };
        Ok(TaskProgressOutcome::Recorded {
            user_task: user_task.clone(),
            user: user.clone(),
            credited,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;
    use crate::domain::ReferralPolicy;
    use crate::test_support::{GrantBuilder, UserBuilder, at_hour};

    #[rstest]
    #[tokio::test]
    async fn insert_is_idempotent_on_external_id() {
        let store = InMemoryStore::new();
        let first = UserBuilder::new("1").build();
        let clash = UserBuilder::new("1").build();

        assert!(matches!(
            store.insert(&first).await.expect("insert"),
            InsertUserOutcome::Created(_)
        ));
        let outcome = store.insert(&clash).await.expect("insert");
        assert_eq!(outcome, InsertUserOutcome::Existing(first));
    }

    #[rstest]
    #[tokio::test]
    async fn insert_rejects_taken_referral_code() {
        let store = InMemoryStore::new();
        store
            .insert(&UserBuilder::new("1").referral_code("REF-AAAAAA").build())
            .await
            .expect("insert");

        let err = store
            .insert(&UserBuilder::new("2").referral_code("REF-AAAAAA").build())
            .await
            .expect_err("duplicate code");
        assert_eq!(err, UserRepositoryError::duplicate_referral_code("REF-AAAAAA"));
    }

    #[rstest]
    #[tokio::test]
    async fn commit_accrual_is_compare_and_swap() {
        let store = InMemoryStore::new();
        let user = UserBuilder::new("1").last_accrual_time(at_hour(0)).build();
        store.insert_user(&user).await;
        let commit = AccrualCommit {
            user_id: user.id(),
            expected_checkpoint: at_hour(0),
            new_checkpoint: at_hour(2),
            earned: 20,
        };

        let first = store.commit_accrual(&commit).await.expect("commit");
        let second = store.commit_accrual(&commit).await.expect("commit");

        assert_eq!(first.map(|u| u.points()), Some(20));
        assert!(second.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn live_grants_are_filtered_by_window_and_ordered() {
        let store = InMemoryStore::new();
        let user_id = UserId::random();
        store
            .insert_grant(GrantBuilder::new(3, user_id, 2_000).build())
            .await;
        store
            .insert_grant(GrantBuilder::new(1, user_id, 1_500).build())
            .await;
        store
            .insert_grant(
                GrantBuilder::new(2, user_id, 3_000)
                    .window(at_hour(0), at_hour(1))
                    .build(),
            )
            .await;

        let live = store
            .list_live_grants(&user_id, at_hour(1))
            .await
            .expect("list");
        let ids: Vec<i64> = live.iter().map(|grant| grant.id().get()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[rstest]
    #[tokio::test]
    async fn second_referral_for_same_user_is_ignored() {
        let store = InMemoryStore::new();
        let referrer = UserBuilder::new("ref").build();
        let other = UserBuilder::new("other").build();
        store.insert_user(&referrer).await;
        store.insert_user(&other).await;
        let referred = UserId::random();
        let referral = |referrer_id| NewReferral {
            referrer_id,
            referred_id: referred,
            policy: ReferralPolicy::default(),
            created_at: at_hour(1),
        };

        assert!(
            store
                .record_referral(&referral(referrer.id()))
                .await
                .expect("record")
                .is_some()
        );
        assert!(
            store
                .record_referral(&referral(other.id()))
                .await
                .expect("record")
                .is_none()
        );
        let other_after = store.user(&other.id()).await.expect("stored");
        assert_eq!(other_after.points(), 0);
    }

    fn progress(user_id: UserId, task: &TaskDefinition, progress: u32) -> TaskProgressUpdate {
        TaskProgressUpdate {
            user_id,
            task: task.clone(),
            progress,
            at: at_hour(3),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn task_completion_credits_once() {
        let store = InMemoryStore::with_default_catalog();
        let user = UserBuilder::new("1").points(5).build();
        store.insert_user(&user).await;
        let task = store
            .find_task(TaskId::new(2))
            .await
            .expect("find")
            .expect("seeded task");

        let mut credited = Vec::new();
        for amount in [1, 3, 3] {
            match store
                .record_progress(&progress(user.id(), &task, amount))
                .await
                .expect("record")
            {
                TaskProgressOutcome::Recorded { credited: c, .. } => credited.push(c),
                TaskProgressOutcome::UserMissing => panic!("user is stored"),
            }
        }

        assert_eq!(credited, vec![0, 50, 0]);
        let stored = store.user(&user.id()).await.expect("stored");
        assert_eq!(stored.points(), 55);
        assert_eq!(stored.completed_tasks_count(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn progress_for_unknown_user_writes_nothing() {
        let store = InMemoryStore::with_default_catalog();
        let task = store
            .find_task(TaskId::new(1))
            .await
            .expect("find")
            .expect("seeded task");
        let stranger = UserId::random();

        let outcome = store
            .record_progress(&progress(stranger, &task, 1))
            .await
            .expect("record");

        assert_eq!(outcome, TaskProgressOutcome::UserMissing);
        assert!(
            store
                .list_user_tasks(&stranger)
                .await
                .expect("list")
                .is_empty()
        );
    }

    #[rstest]
    #[case(None, vec![1, 2, 3, 4])]
    #[case(Some(TaskKind::Daily), vec![1, 2])]
    #[case(Some(TaskKind::Weekly), vec![3])]
    #[tokio::test]
    async fn tasks_filter_by_kind(#[case] kind: Option<TaskKind>, #[case] expected: Vec<i64>) {
        let store = InMemoryStore::with_default_catalog();
        let ids: Vec<i64> = store
            .list_tasks(kind)
            .await
            .expect("list")
            .iter()
            .map(|task| task.id().get())
            .collect();
        assert_eq!(ids, expected);
    }
}
