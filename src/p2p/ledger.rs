//! The double-entry ledger for P2P transfers.
//!
//! A transfer debits the sender, credits the receiver, records one transaction
//! row on each account and one transfer record. All of it is written inside a
//! single database transaction.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::{AccountId, apply_balance_delta, get_balance},
    auth::UserID,
    database_id::DatabaseId,
    money::{CURRENCY, Cents, amount_format, format_amount, from_cents, to_exact_cents},
    time_format::timestamp_format,
    transaction::{Transaction, TransactionKind, create_transaction},
};

/// Database identifier for a P2P transfer.
pub type TransferId = DatabaseId;

/// The category of the transaction rows written for a P2P transfer.
pub const P2P_CATEGORY: &str = "P2P";

/// A completed movement of money from one account to another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct P2PTransfer {
    /// The ID of the transfer.
    #[serde(rename = "transfer_id")]
    pub id: TransferId,
    /// The user that sent the money.
    pub from_user_id: UserID,
    /// The user that received the money.
    pub to_user_id: UserID,
    /// The account the money left.
    pub from_account_id: AccountId,
    /// The account the money entered.
    pub to_account_id: AccountId,
    /// The amount moved, always positive.
    #[serde(serialize_with = "amount_format::serialize")]
    pub amount: Decimal,
    /// Always EUR.
    pub currency: String,
    /// The note the sender attached.
    pub message: Option<String>,
    /// When the transfer was posted.
    #[serde(serialize_with = "timestamp_format::serialize")]
    pub created_at: OffsetDateTime,
}

/// A transfer to be posted with [post_p2p].
#[derive(Debug, Clone, PartialEq)]
pub struct NewP2PTransfer {
    /// The user sending the money.
    pub from_user_id: UserID,
    /// The user receiving the money.
    pub to_user_id: UserID,
    /// The account the money leaves.
    pub from_account_id: AccountId,
    /// The account the money enters.
    pub to_account_id: AccountId,
    /// The amount to move, must be positive with at most two decimal places.
    pub amount: Decimal,
    /// An optional note, appended to both transaction descriptions.
    pub message: Option<String>,
    /// The name of the sender as shown on the receiver's statement.
    pub sender_name: String,
    /// The name of the receiver as shown on the sender's statement.
    pub recipient_name: String,
    /// The date the transaction rows are booked on.
    pub date: Date,
}

/// Create the P2P transfer table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_p2p_transfer_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS p2p_transfer (
            id INTEGER PRIMARY KEY,
            from_user_id INTEGER NOT NULL,
            to_user_id INTEGER NOT NULL,
            from_account_id INTEGER NOT NULL,
            to_account_id INTEGER NOT NULL,
            amount INTEGER NOT NULL CHECK (amount > 0),
            currency TEXT NOT NULL,
            message TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(from_user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(to_user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(from_account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(to_account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Move money between two accounts atomically.
///
/// Either every effect of the transfer is committed or none is.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the amount is not positive, has sub-cent precision,
///   the accounts are the same, or either account does not exist,
/// - [Error::InsufficientFunds] if the sender's balance is lower than the amount,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn post_p2p(new_transfer: NewP2PTransfer, connection: &Connection) -> Result<P2PTransfer, Error> {
    let transaction = connection.unchecked_transaction()?;
    let transfer = apply_p2p(new_transfer, &transaction)?;
    transaction.commit()?;

    Ok(transfer)
}

/// Write the effects of a transfer using `connection`.
///
/// Callers must run this inside a database transaction, see [post_p2p].
/// If an error is returned, some of the effects may already have been
/// written and the database transaction must be rolled back.
///
/// # Errors
/// See [post_p2p].
pub fn apply_p2p(new_transfer: NewP2PTransfer, connection: &Connection) -> Result<P2PTransfer, Error> {
    if new_transfer.amount <= Decimal::ZERO {
        return Err(Error::Validation("the amount must be positive".to_owned()));
    }

    let cents = to_exact_cents(new_transfer.amount)?;

    if new_transfer.from_account_id == new_transfer.to_account_id {
        return Err(Error::Validation(
            "cannot transfer money to the same account".to_owned(),
        ));
    }

    let sender_balance = existing_balance(new_transfer.from_account_id, "sending", connection)?;
    existing_balance(new_transfer.to_account_id, "receiving", connection)?;

    if sender_balance < cents {
        return Err(Error::InsufficientFunds(format!(
            "insufficient funds: the balance is {} but the transfer needs {}",
            format_amount(from_cents(sender_balance)),
            format_amount(new_transfer.amount)
        )));
    }

    let suffix = match new_transfer.message.as_deref() {
        Some(message) => format!(" - {message}"),
        None => String::new(),
    };

    create_transaction(
        Transaction::build(
            new_transfer.from_account_id,
            TransactionKind::Debit,
            cents,
            new_transfer.date,
            &format!("P2P to {}{suffix}", new_transfer.recipient_name),
        )
        .category(P2P_CATEGORY),
        connection,
    )?;
    apply_balance_delta(new_transfer.from_account_id, -cents, connection)?;

    create_transaction(
        Transaction::build(
            new_transfer.to_account_id,
            TransactionKind::Credit,
            cents,
            new_transfer.date,
            &format!("P2P from {}{suffix}", new_transfer.sender_name),
        )
        .category(P2P_CATEGORY),
        connection,
    )?;
    apply_balance_delta(new_transfer.to_account_id, cents, connection)?;

    let transfer = connection
        .prepare(
            "INSERT INTO p2p_transfer
                (from_user_id, to_user_id, from_account_id, to_account_id, amount, currency, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id, from_user_id, to_user_id, from_account_id, to_account_id, amount, currency, message, created_at",
        )?
        .query_row(
            (
                new_transfer.from_user_id.as_i64(),
                new_transfer.to_user_id.as_i64(),
                new_transfer.from_account_id,
                new_transfer.to_account_id,
                cents,
                CURRENCY,
                &new_transfer.message,
                OffsetDateTime::now_utc(),
            ),
            map_row,
        )?;

    tracing::info!(
        "Posted P2P transfer {} of {} from account {} to account {}",
        transfer.id,
        format_amount(transfer.amount),
        transfer.from_account_id,
        transfer.to_account_id
    );

    Ok(transfer)
}

/// Retrieve a transfer by its `id`.
///
/// # Errors
/// Returns an [Error::NotFound] if `id` does not refer to a transfer.
pub fn get_p2p_transfer(id: TransferId, connection: &Connection) -> Result<P2PTransfer, Error> {
    connection
        .prepare(
            "SELECT id, from_user_id, to_user_id, from_account_id, to_account_id, amount, currency, message, created_at
             FROM p2p_transfer WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_row)
        .map_err(|error| error.into())
}

fn existing_balance(
    account_id: AccountId,
    role: &str,
    connection: &Connection,
) -> Result<Cents, Error> {
    get_balance(account_id, connection).map_err(|error| match error {
        Error::NotFound => {
            Error::Validation(format!("the {role} account {account_id} does not exist"))
        }
        error => error,
    })
}

fn map_row(row: &Row) -> Result<P2PTransfer, rusqlite::Error> {
    let amount: Cents = row.get(5)?;

    Ok(P2PTransfer {
        id: row.get(0)?,
        from_user_id: UserID::new(row.get(1)?),
        to_user_id: UserID::new(row.get(2)?),
        from_account_id: row.get(3)?,
        to_account_id: row.get(4)?,
        amount: from_cents(amount),
        currency: row.get(6)?,
        message: row.get(7)?,
        created_at: row.get(8)?,
    })
}
