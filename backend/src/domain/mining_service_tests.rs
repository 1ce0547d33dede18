//! Tests for the mining claim service.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mockable::MockClock;
use mockall::Sequence;
use rstest::{fixture, rstest};
use tokio::sync::Barrier;

use super::*;
use crate::domain::ports::{InsertUserOutcome, MockBoostRepository, MockUserRepository};
use crate::domain::{ErrorCode, ExternalId, ReferralCode};
use crate::outbound::memory::InMemoryStore;
use crate::test_support::{GrantBuilder, MutableClock, UserBuilder, at_hour};

fn clock_at(hour: i64) -> Arc<dyn Clock> {
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(at_hour(hour));
    Arc::new(clock)
}

#[fixture]
fn user() -> User {
    UserBuilder::new("42")
        .mining_speed(10)
        .last_accrual_time(at_hour(0))
        .build()
}

fn boosts_returning(grants: Vec<crate::domain::BoostGrant>) -> MockBoostRepository {
    let mut boosts = MockBoostRepository::new();
    boosts
        .expect_list_live_grants()
        .returning(move |_, _| Ok(grants.clone()));
    boosts
}

#[rstest]
#[tokio::test]
async fn claim_commits_quoted_accrual(user: User) {
    let user_id = user.id();
    let grants = vec![GrantBuilder::new(1, user_id, 150).build()];
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .times(1)
        .return_once(move |_| Ok(Some(user)));
    users
        .expect_commit_accrual()
        .withf(|commit| {
            commit.expected_checkpoint == at_hour(0)
                && commit.new_checkpoint == at_hour(3)
                && commit.earned == 3
        })
        .times(1)
        .returning(|commit| {
            Ok(Some(
                UserBuilder::new("42")
                    .id(commit.user_id)
                    .points(commit.earned)
                    .last_accrual_time(commit.new_checkpoint)
                    .build(),
            ))
        });

    let service = MiningService::new(
        Arc::new(users),
        Arc::new(boosts_returning(grants)),
        clock_at(3),
    );
    let response = service.claim(&user_id).await.expect("claim succeeds");

    assert_eq!(response.credited_points, 3);
    assert_eq!(response.credited_hours, 3);
    assert_eq!(response.rate_per_hour, 1);
    assert_eq!(response.user.points(), 3);
    assert_eq!(response.next_accrual_at, at_hour(4));
}

#[rstest]
#[tokio::test]
async fn claim_before_a_whole_hour_credits_nothing(user: User) {
    let user_id = user.id();
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(user)));
    users.expect_commit_accrual().never();

    let mut clock = MockClock::new();
    clock
        .expect_utc()
        .return_const(at_hour(0) + chrono::Duration::minutes(59));
    let service = MiningService::new(
        Arc::new(users),
        Arc::new(boosts_returning(Vec::new())),
        Arc::new(clock),
    );

    let response = service.claim(&user_id).await.expect("claim succeeds");
    assert_eq!(response.credited_points, 0);
    assert_eq!(response.rate_per_hour, 10);
    assert_eq!(response.next_accrual_at, at_hour(1));
}

#[rstest]
#[tokio::test]
async fn lost_race_rereads_and_does_not_credit_twice(user: User) {
    let user_id = user.id();
    let mut seq = Sequence::new();
    let mut users = MockUserRepository::new();
    let stale = user.clone();
    users
        .expect_find_by_id()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_| Ok(Some(stale)));
    users
        .expect_commit_accrual()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(|_| Ok(None));
    let advanced = UserBuilder::new("42")
        .id(user_id)
        .points(30)
        .last_accrual_time(at_hour(3))
        .build();
    users
        .expect_find_by_id()
        .times(1)
        .in_sequence(&mut seq)
        .return_once(move |_| Ok(Some(advanced)));

    let service = MiningService::new(
        Arc::new(users),
        Arc::new(boosts_returning(Vec::new())),
        clock_at(3),
    );
    let response = service.claim(&user_id).await.expect("claim succeeds");

    assert_eq!(response.credited_points, 0);
    assert_eq!(response.user.points(), 30);
}

#[rstest]
#[tokio::test]
async fn repeated_conflicts_surface_after_max_attempts(user: User) {
    let user_id = user.id();
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .times(2)
        .returning(move |_| Ok(Some(user.clone())));
    users
        .expect_commit_accrual()
        .times(2)
        .returning(|_| Ok(None));

    let service = MiningService::new(
        Arc::new(users),
        Arc::new(boosts_returning(Vec::new())),
        clock_at(3),
    )
    .with_max_attempts(2);
    let err = service.claim(&user_id).await.expect_err("claim conflicts");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn unknown_user_is_not_found() {
    let mut users = MockUserRepository::new();
    users.expect_find_by_id().return_once(|_| Ok(None));
    let service = MiningService::new(
        Arc::new(users),
        Arc::new(MockBoostRepository::new()),
        clock_at(3),
    );

    let err = service
        .claim(&UserId::random())
        .await
        .expect_err("missing user");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[case(UserRepositoryError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(UserRepositoryError::query("syntax"), ErrorCode::InternalError)]
#[tokio::test]
async fn repository_failures_map_to_domain_codes(
    #[case] failure: UserRepositoryError,
    #[case] expected: ErrorCode,
) {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .return_once(move |_| Err(failure));
    let service = MiningService::new(
        Arc::new(users),
        Arc::new(MockBoostRepository::new()),
        clock_at(3),
    );

    let err = service
        .claim(&UserId::random())
        .await
        .expect_err("repository failure");
    assert_eq!(err.code(), expected);
}

/// Holds the first two reads of a user until both claims have made them,
/// so both quote against the same checkpoint before either commits.
struct BarrierUsers {
    inner: Arc<InMemoryStore>,
    gate: Barrier,
    gated_reads: AtomicUsize,
}

impl BarrierUsers {
    fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            gate: Barrier::new(2),
            gated_reads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl UserRepository for BarrierUsers {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let found = self.inner.find_by_id(id).await;
        if self.gated_reads.fetch_add(1, Ordering::SeqCst) < 2 {
            self.gate.wait().await;
        }
        found
    }

    async fn find_by_external_id(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<User>, UserRepositoryError> {
        self.inner.find_by_external_id(external_id).await
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Vec<User>, UserRepositoryError> {
        self.inner.find_by_referral_code(code).await
    }

    async fn insert(&self, user: &User) -> Result<InsertUserOutcome, UserRepositoryError> {
        self.inner.insert(user).await
    }

    async fn commit_accrual(
        &self,
        commit: &AccrualCommit,
    ) -> Result<Option<User>, UserRepositoryError> {
        self.inner.commit_accrual(commit).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_claims_from_one_checkpoint_credit_once() {
    let store = Arc::new(InMemoryStore::with_default_catalog());
    let user = UserBuilder::new("42").last_accrual_time(at_hour(0)).build();
    store.insert_user(&user).await;
    let users = Arc::new(BarrierUsers::new(store.clone()));
    let clock = Arc::new(MutableClock::new(at_hour(3)));

    let service = Arc::new(MiningService::new(users.clone(), store.clone(), clock));
    let user_id = user.id();
    let first = tokio::spawn({
        let service = service.clone();
        async move { service.claim(&user_id).await }
    });
    let second = tokio::spawn({
        let service = service.clone();
        async move { service.claim(&user_id).await }
    });
    let first = first.await.expect("join").expect("first claim");
    let second = second.await.expect("join").expect("second claim");

    // Both opening reads saw hour 0; the loser re-read after the winner committed.
    assert_eq!(users.gated_reads.load(Ordering::SeqCst), 3);
    let mut credited = [first.credited_points, second.credited_points];
    credited.sort_unstable();
    assert_eq!(credited, [0, 30]);
    let stored = store.user(&user_id).await.expect("user stored");
    assert_eq!(stored.points(), 30);
    assert_eq!(stored.last_accrual_time(), at_hour(3));
}
