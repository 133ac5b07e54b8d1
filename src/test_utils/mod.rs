//! Fixtures shared by the unit tests: an in-memory database seeded with three
//! customers, their accounts and a few contacts.

#![allow(missing_docs)]

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    AppState,
    account::{AccountId, NewAccount, create_account},
    app_state::DbState,
    auth::{PasswordHash, User, create_user},
    contact::{ContactId, NewContact, create_contact},
    db::{initialize, lock_connection},
};

/// The password of every seeded customer.
pub(crate) const TEST_PASSWORD: &str = "Password123!";

/// The IDs of the seeded rows.
#[derive(Debug, Clone)]
pub(crate) struct TestBank {
    /// Customer "100001", owns the only contacts with a full address book.
    pub alice: User,
    /// Customer "100002".
    pub bob: User,
    /// Customer "100003".
    pub carol: User,
    /// "Conto Alice" with 100.00 EUR.
    pub alice_account: AccountId,
    /// "Conto Bob" with 50.00 EUR.
    pub bob_account: AccountId,
    /// "Conto Carol" with nothing on it.
    pub carol_account: AccountId,
    /// Alice's contact for Bob, internal.
    pub alice_to_bob: ContactId,
    /// Alice's contact for Carol, internal.
    pub alice_to_carol: ContactId,
    /// Alice's contact for someone at another bank, IBAN only.
    pub alice_to_external: ContactId,
    /// Carol's contact for Alice, internal.
    pub carol_to_alice: ContactId,
}

/// An initialized in-memory database.
#[track_caller]
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database");
    initialize(&connection).expect("Could not initialize database");

    connection
}

/// Handler state backed by an initialized in-memory database.
#[track_caller]
pub(crate) fn get_test_state() -> DbState {
    DbState {
        db_connection: Arc::new(Mutex::new(get_test_connection())),
    }
}

/// Router state backed by an initialized in-memory database.
#[track_caller]
pub(crate) fn get_test_app_state() -> AppState {
    AppState::new(
        Connection::open_in_memory().expect("Could not open in-memory database"),
        "averysecretsecretthatisatleast64byteslongforthecookiekeyderivation",
    )
    .expect("Could not create app state")
}

/// Seed the database behind `state` with [create_test_bank].
#[track_caller]
pub(crate) fn seed_bank(state: &DbState) -> TestBank {
    let connection = lock_connection(&state.db_connection).expect("Could not lock database");

    create_test_bank(&connection)
}

/// Insert three customers, one account each and four contacts.
///
/// Alice's contacts are created in the order Bob, Carol, external.
#[track_caller]
pub(crate) fn create_test_bank(connection: &Connection) -> TestBank {
    let password_hash =
        PasswordHash::from_raw_password(TEST_PASSWORD, 4).expect("Could not hash password");

    let alice = create_user("100001", "Alice Rossi", password_hash.clone(), connection)
        .expect("Could not create Alice");
    let bob = create_user("100002", "Bob Bianchi", password_hash.clone(), connection)
        .expect("Could not create Bob");
    let carol = create_user("100003", "Carol Verdi", password_hash, connection)
        .expect("Could not create Carol");

    let account = |user: &User, name: &str, iban: &str, cents: i64| {
        create_account(
            NewAccount {
                user_id: user.id,
                name: name.to_owned(),
                iban: iban.to_owned(),
                opening_balance: Decimal::new(cents, 2),
            },
            connection,
        )
        .expect("Could not create account")
        .id
    };
    let alice_account = account(&alice, "Conto Alice", "IT60X0542811101000000000001", 10_000);
    let bob_account = account(&bob, "Conto Bob", "IT60X0542811101000000000002", 5_000);
    let carol_account = account(&carol, "Conto Carol", "IT60X0542811101000000000003", 0);

    let contact = |owner: &User, display_name: &str, target: Option<(&User, AccountId)>| {
        create_contact(
            NewContact {
                owner: owner.id,
                display_name: display_name.to_owned(),
                target_user_id: target.map(|(user, _)| user.id),
                target_account_id: target.map(|(_, account_id)| account_id),
                iban: match target {
                    Some(_) => None,
                    None => Some("DE89370400440532013000".to_owned()),
                },
            },
            connection,
        )
        .expect("Could not create contact")
        .id
    };
    let alice_to_bob = contact(&alice, "Bob Bianchi", Some((&bob, bob_account)));
    let alice_to_carol = contact(&alice, "Carol Verdi", Some((&carol, carol_account)));
    let alice_to_external = contact(&alice, "Hans Becker", None);
    let carol_to_alice = contact(&carol, "Alice Rossi", Some((&alice, alice_account)));

    TestBank {
        alice,
        bob,
        carol,
        alice_account,
        bob_account,
        carol_account,
        alice_to_bob,
        alice_to_carol,
        alice_to_external,
        carol_to_alice,
    }
}
