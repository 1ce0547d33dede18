//! `DieselReferralRepository` against embedded PostgreSQL.
//!
//! The speed bonus is computed in SQL on int4 columns; it must floor the
//! same way the domain arithmetic does.

mod support;

use pointminer::domain::ports::{ReferralRepository, UserRepository};
use pointminer::domain::{NewReferral, ReferralPolicy, boosted_speed};
use pointminer::outbound::persistence::{DieselReferralRepository, DieselUserRepository};
use pointminer::test_support::{UserBuilder, at_hour};
use rstest::{fixture, rstest};
use support::{PgWorld, pg_world};

#[fixture]
fn world() -> Option<PgWorld> {
    pg_world()
}

#[rstest]
#[case(10, 10)]
#[case(39, 40)]
#[case(40, 42)]
#[case(1_000, 1_050)]
fn duplicate_referral_credits_the_referrer_once(
    world: Option<PgWorld>,
    #[case] speed: u32,
    #[case] boosted: u32,
) {
    let Some(world) = world else { return };
    let users = DieselUserRepository::new(world.pool.clone());
    let referrals = DieselReferralRepository::new(world.pool.clone());
    let referrer = UserBuilder::new("8008").points(5).mining_speed(speed).build();
    let referred = UserBuilder::new("9009").build();
    world.block_on(users.insert(&referrer)).expect("insert");
    world.block_on(users.insert(&referred)).expect("insert");
    let referral = NewReferral {
        referrer_id: referrer.id(),
        referred_id: referred.id(),
        policy: ReferralPolicy::default(),
        created_at: at_hour(1),
    };

    let first = world
        .block_on(referrals.record_referral(&referral))
        .expect("record");
    let second = world
        .block_on(referrals.record_referral(&referral))
        .expect("record");

    let first = first.expect("first referral is recorded");
    assert_eq!(first.bonus_points, 100);
    assert!(second.is_none(), "a referred user is credited at most once");
    let stored = world
        .block_on(users.find_by_id(&referrer.id()))
        .expect("find")
        .expect("stored");
    assert_eq!(stored.points(), 105);
    assert_eq!(stored.mining_speed(), boosted);
    assert_eq!(stored.mining_speed(), boosted_speed(speed, 50));
    let listed = world
        .block_on(referrals.list_referrals(&referrer.id()))
        .expect("list");
    assert_eq!(listed, vec![first]);
}

#[rstest]
fn missing_referrer_leaves_no_referral_row(world: Option<PgWorld>) {
    let Some(world) = world else { return };
    let users = DieselUserRepository::new(world.pool.clone());
    let referrals = DieselReferralRepository::new(world.pool.clone());
    let ghost = UserBuilder::new("1111").build();
    let referred = UserBuilder::new("2222").build();
    world.block_on(users.insert(&referred)).expect("insert");

    let result = world.block_on(referrals.record_referral(&NewReferral {
        referrer_id: ghost.id(),
        referred_id: referred.id(),
        policy: ReferralPolicy::default(),
        created_at: at_hour(1),
    }));

    assert!(result.is_err());
    let listed = world
        .block_on(referrals.list_referrals(&ghost.id()))
        .expect("list");
    assert!(listed.is_empty());
}
