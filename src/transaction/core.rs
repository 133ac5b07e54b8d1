//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    account::AccountId,
    database_id::DatabaseId,
    money::{Cents, amount_format, from_cents},
    piggy::PiggyId,
    time_format::date_format,
};

/// Database identifier for a transaction.
pub type TransactionId = DatabaseId;

// ============================================================================
// MODELS
// ============================================================================

/// Whether money left or entered an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Money left the account, the amount is negative.
    Debit,
    /// Money entered the account, the amount is positive.
    Credit,
}

impl TransactionKind {
    /// The name stored in the database and sent to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Debit => "DEBIT",
            TransactionKind::Credit => "CREDIT",
        }
    }

    /// Apply the sign of this kind to the magnitude `cents`.
    fn signed(&self, cents: Cents) -> Cents {
        match self {
            TransactionKind::Debit => -cents.abs(),
            TransactionKind::Credit => cents.abs(),
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEBIT" => Ok(TransactionKind::Debit),
            "CREDIT" => Ok(TransactionKind::Credit),
            _ => Err(Error::Validation(format!(
                "\"{s}\" is not a transaction type, expected DEBIT or CREDIT"
            ))),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(error.to_string().into()))
    }
}

/// A single movement of money on an account.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    #[serde(rename = "transaction_id")]
    pub id: TransactionId,
    /// The account the money moved on.
    pub account_id: AccountId,
    /// The piggy bank on the other side of a savings movement.
    pub piggy_id: Option<PiggyId>,
    /// When the transaction happened.
    #[serde(serialize_with = "date_format::serialize")]
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// A coarse category, e.g. "P2P" or "Savings".
    pub category: String,
    /// Whether money left or entered the account.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The signed amount, negative for [TransactionKind::Debit].
    #[serde(serialize_with = "amount_format::serialize")]
    pub amount: Decimal,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// `amount` is the magnitude in cents, the sign is taken from `kind`.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        account_id: AccountId,
        kind: TransactionKind,
        amount: Cents,
        date: Date,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            account_id,
            piggy_id: None,
            kind,
            amount,
            date,
            description: description.to_owned(),
            category: DEFAULT_CATEGORY.to_owned(),
        }
    }
}

/// The category given to transactions that do not set one.
pub const DEFAULT_CATEGORY: &str = "Other";

/// A builder for creating [Transaction] instances.
///
/// # Examples
///
/// ```ignore
/// use time::macros::date;
///
/// use crate::transaction::{Transaction, TransactionKind};
///
/// let builder = Transaction::build(1, TransactionKind::Debit, 2500, date!(2025-01-15), "P2P to Bob")
///     .category("P2P");
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The account the money moves on.
    pub account_id: AccountId,

    /// The piggy bank on the other side of a savings movement, if any.
    pub piggy_id: Option<PiggyId>,

    /// Whether money leaves or enters the account.
    pub kind: TransactionKind,

    /// The magnitude of the movement in cents.
    pub amount: Cents,

    /// The date when the transaction occurred.
    pub date: Date,

    /// A human-readable description of the transaction.
    ///
    /// # Examples
    /// - `"P2P to Bob Bianchi - pizza"`
    /// - `"Transfer to piggy bank"`
    pub description: String,

    /// The category of the transaction, e.g. "P2P" or "Savings".
    pub category: String,
}

impl TransactionBuilder {
    /// Set the piggy bank for the transaction.
    pub fn piggy_id(mut self, piggy_id: Option<PiggyId>) -> Self {
        self.piggy_id = piggy_id;
        self
    }

    /// Set the category for the transaction.
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_owned();
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction in the database from a builder.
///
/// This only records the movement, the caller updates the account balance
/// in the same database transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the amount is zero,
/// - or [Error::SqlError] if the account does not exist or there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if builder.amount == 0 {
        return Err(Error::Validation(
            "a transaction cannot have an amount of zero".to_owned(),
        ));
    }

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (account_id, piggy_id, date, description, category, kind, amount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, account_id, piggy_id, date, description, category, kind, amount",
        )?
        .query_row(
            (
                builder.account_id,
                builder.piggy_id,
                builder.date,
                builder.description,
                builder.category,
                builder.kind,
                builder.kind.signed(builder.amount),
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, account_id, piggy_id, date, description, category, kind, amount
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Get the transactions of `account_id` in the order they were posted.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_account_transactions(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, piggy_id, date, description, category, kind, amount
             FROM \"transaction\" WHERE account_id = :account_id ORDER BY id ASC",
        )?
        .query_map(&[(":account_id", &account_id)], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                piggy_id INTEGER,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('DEBIT', 'CREDIT')),
                amount INTEGER NOT NULL,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(piggy_id) REFERENCES piggy_bank(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Composite index used by the history query.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_date ON \"transaction\"(account_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let amount: Cents = row.get(7)?;

    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        piggy_id: row.get(2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        kind: row.get(6)?,
        amount: from_cents(amount),
    })
}

// ============================================================================
// TESTS
// ============================================================================
