//! Checking accounts and the queries that read and move their balances.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    Error,
    auth::UserID,
    database_id::DatabaseId,
    money::{CURRENCY, Cents, amount_format, from_cents, to_exact_cents},
};

/// Database identifier for an account.
pub type AccountId = DatabaseId;

/// A checking account held by a user.
///
/// The balance is the running sum of every transaction posted against the account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The id for the account.
    #[serde(rename = "account_id")]
    pub id: AccountId,
    /// The user that owns the account.
    #[serde(skip)]
    pub user_id: UserID,
    /// The name of the account, e.g. "Conto Corrente".
    pub name: String,
    /// The international bank account number.
    pub iban: String,
    /// The currency of the account, always [CURRENCY].
    pub currency: String,
    /// The amount of money in the account.
    #[serde(serialize_with = "amount_format::serialize")]
    pub balance: Decimal,
}

/// The data needed to open a new account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// The user that will own the account.
    pub user_id: UserID,
    /// The name of the account.
    pub name: String,
    /// The international bank account number, must be unique.
    pub iban: String,
    /// The starting balance, must not be negative.
    pub opening_balance: Decimal,
}

/// Create the account table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            iban TEXT NOT NULL UNIQUE,
            currency TEXT NOT NULL DEFAULT 'EUR',
            balance INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_account_user ON account(user_id);",
        (),
    )?;

    Ok(())
}

/// Open a new account.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the name or IBAN is blank, or the opening balance is negative
///   or has more than two decimal places,
/// - [Error::Conflict] if another account already uses the IBAN,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_account(new_account: NewAccount, connection: &Connection) -> Result<Account, Error> {
    let name = new_account.name.trim();
    let iban = new_account.iban.trim();

    if name.is_empty() {
        return Err(Error::Validation("account name cannot be empty".to_owned()));
    }

    if iban.is_empty() {
        return Err(Error::Validation("IBAN cannot be empty".to_owned()));
    }

    if new_account.opening_balance.is_sign_negative() {
        return Err(Error::Validation(
            "the opening balance cannot be negative".to_owned(),
        ));
    }

    let balance = to_exact_cents(new_account.opening_balance)?;

    connection
        .prepare(
            "INSERT INTO account (user_id, name, iban, currency, balance)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, user_id, name, iban, currency, balance",
        )?
        .query_row(
            (new_account.user_id.as_i64(), name, iban, CURRENCY, balance),
            map_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Error::Conflict(format!("the IBAN {iban} is already in use"))
            }
            error => error.into(),
        })
}

/// Retrieve an account by its `id`, regardless of who owns it.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid account,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare("SELECT id, user_id, name, iban, currency, balance FROM account WHERE id = :id")?
        .query_row(&[(":id", &id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve the account `id` if it belongs to `user_id`.
///
/// # Errors
/// Returns an [Error::NotFound] if the account does not exist or is owned by someone else.
pub fn get_owned_account(
    user_id: UserID,
    id: AccountId,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, iban, currency, balance FROM account
             WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Get the accounts of `user_id`, newest first.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_accounts_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, iban, currency, balance FROM account
             WHERE user_id = :user_id ORDER BY id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|account_result| account_result.map_err(Error::SqlError))
        .collect()
}

/// Get the balance of account `id` in cents.
///
/// # Errors
/// Returns an [Error::NotFound] if the account does not exist.
pub fn get_balance(id: AccountId, connection: &Connection) -> Result<Cents, Error> {
    connection
        .query_row(
            "SELECT balance FROM account WHERE id = :id",
            &[(":id", &id)],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Add `delta` cents to the balance of account `id` and return the new balance.
///
/// The caller is responsible for posting the matching transaction row in the
/// same database transaction.
///
/// # Errors
/// Returns an [Error::NotFound] if the account does not exist.
pub fn apply_balance_delta(
    id: AccountId,
    delta: Cents,
    connection: &Connection,
) -> Result<Cents, Error> {
    connection
        .query_row(
            "UPDATE account SET balance = balance + ?1 WHERE id = ?2 RETURNING balance",
            (delta, id),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

fn map_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let balance: Cents = row.get(5)?;

    Ok(Account {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        iban: row.get(3)?,
        currency: row.get(4)?,
        balance: from_cents(balance),
    })
}
