//! `DieselBoostRepository` against embedded PostgreSQL.
//!
//! A purchase is one transaction: a short balance must leave no grant, no
//! debit and no usage count behind.

mod support;

use pointminer::domain::ports::{BoostRepository, PurchaseOutcome, PurchaseRequest, UserRepository};
use pointminer::domain::{BoostDefinitionId, User};
use pointminer::outbound::persistence::{DieselBoostRepository, DieselUserRepository};
use pointminer::test_support::{UserBuilder, at_hour};
use rstest::{fixture, rstest};
use support::{PgWorld, pg_world};

#[fixture]
fn world() -> Option<PgWorld> {
    pg_world()
}

fn request(world: &PgWorld, boosts: &DieselBoostRepository, user: &User) -> PurchaseRequest {
    let definition = world
        .block_on(boosts.find_definition(BoostDefinitionId::new(1)))
        .expect("find")
        .expect("seeded catalogue");
    PurchaseRequest {
        user_id: user.id(),
        definition,
        start_time: at_hour(5),
    }
}

#[rstest]
fn short_balance_rolls_back_everything(world: Option<PgWorld>) {
    let Some(world) = world else { return };
    let users = DieselUserRepository::new(world.pool.clone());
    let boosts = DieselBoostRepository::new(world.pool.clone());
    let buyer = UserBuilder::new("4004").points(120).build();
    world.block_on(users.insert(&buyer)).expect("insert");

    let outcome = world
        .block_on(boosts.purchase(&request(&world, &boosts, &buyer)))
        .expect("purchase");

    assert_eq!(
        outcome,
        PurchaseOutcome::InsufficientFunds {
            balance: 120,
            price: 500
        }
    );
    let stored = world
        .block_on(users.find_by_id(&buyer.id()))
        .expect("find")
        .expect("stored");
    assert_eq!(stored.points(), 120);
    assert_eq!(stored.boost_usage_count(), 0);
    let grants = world
        .block_on(boosts.list_live_grants(&buyer.id(), at_hour(6)))
        .expect("list");
    assert!(grants.is_empty());
}

#[rstest]
fn purchase_debits_counts_and_stores_the_grant(world: Option<PgWorld>) {
    let Some(world) = world else { return };
    let users = DieselUserRepository::new(world.pool.clone());
    let boosts = DieselBoostRepository::new(world.pool.clone());
    let buyer = UserBuilder::new("5005").points(700).build();
    world.block_on(users.insert(&buyer)).expect("insert");

    let outcome = world
        .block_on(boosts.purchase(&request(&world, &boosts, &buyer)))
        .expect("purchase");

    let PurchaseOutcome::Granted { grant, user } = outcome else {
        panic!("balance covers the price: {outcome:?}");
    };
    assert_eq!(user.points(), 200);
    assert_eq!(user.boost_usage_count(), 1);
    assert_eq!(grant.start_time(), at_hour(5));
    assert_eq!(grant.end_time(), at_hour(29));
    let live = world
        .block_on(boosts.list_live_grants(&buyer.id(), at_hour(28)))
        .expect("list");
    assert_eq!(live, vec![grant]);
}

#[rstest]
fn unknown_buyer_is_reported_missing(world: Option<PgWorld>) {
    let Some(world) = world else { return };
    let boosts = DieselBoostRepository::new(world.pool.clone());
    let stranger = UserBuilder::new("6006").build();

    let outcome = world
        .block_on(boosts.purchase(&request(&world, &boosts, &stranger)))
        .expect("purchase");

    assert_eq!(outcome, PurchaseOutcome::UserMissing);
}

#[rstest]
fn sweep_flips_only_closed_windows(world: Option<PgWorld>) {
    let Some(world) = world else { return };
    let users = DieselUserRepository::new(world.pool.clone());
    let boosts = DieselBoostRepository::new(world.pool.clone());
    let buyer = UserBuilder::new("7007").points(500).build();
    world.block_on(users.insert(&buyer)).expect("insert");
    world
        .block_on(boosts.purchase(&request(&world, &boosts, &buyer)))
        .expect("purchase");

    let sweep = |now| world.block_on(boosts.deactivate_expired(now)).expect("sweep");

    assert_eq!(sweep(at_hour(28)), 0);
    assert_eq!(sweep(at_hour(29)), 1);
    assert_eq!(sweep(at_hour(29)), 0);
}
