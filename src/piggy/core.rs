//! Piggy bank records and their lifecycle.

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
    auth::UserID,
    database_id::DatabaseId,
    money::{Cents, amount_format, from_cents, optional_amount_format, to_exact_cents},
    piggy::{NewPiggyTransfer, PiggyDirection, PiggyTransfer, apply_piggy_transfer},
};

/// Database identifier for a piggy bank.
pub type PiggyId = DatabaseId;

/// Whether a piggy bank can still be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PiggyStatus {
    /// The piggy bank accepts transfers.
    Active,
    /// The piggy bank was closed, its balance was refunded.
    Deleted,
}

impl PiggyStatus {
    fn as_str(&self) -> &'static str {
        match self {
            PiggyStatus::Active => "ACTIVE",
            PiggyStatus::Deleted => "DELETED",
        }
    }
}

impl ToSql for PiggyStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PiggyStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "ACTIVE" => Ok(PiggyStatus::Active),
            "DELETED" => Ok(PiggyStatus::Deleted),
            other => Err(FromSqlError::Other(
                format!("unknown piggy bank status {other}").into(),
            )),
        }
    }
}

/// A savings goal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PiggyBank {
    /// The ID of the piggy bank.
    #[serde(rename = "piggy_id")]
    pub id: PiggyId,
    /// The user that owns the piggy bank.
    #[serde(skip)]
    pub owner: UserID,
    /// What the user is saving for.
    pub name: String,
    /// How much the user wants to save, if they set a goal.
    #[serde(serialize_with = "optional_amount_format::serialize")]
    pub target_amount: Option<Decimal>,
    /// How much is saved, never negative.
    #[serde(serialize_with = "amount_format::serialize")]
    pub current_amount: Decimal,
    /// Whether the piggy bank is still in use.
    pub status: PiggyStatus,
}

/// Create the piggy bank table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_piggy_bank_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS piggy_bank (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            target_amount INTEGER,
            current_amount INTEGER NOT NULL DEFAULT 0 CHECK (current_amount >= 0),
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Open a new, empty piggy bank for `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the name is blank or the target is negative or has sub-cent precision,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_piggy_bank(
    owner: UserID,
    name: &str,
    target_amount: Option<Decimal>,
    connection: &Connection,
) -> Result<PiggyBank, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::Validation("piggy bank name cannot be empty".to_owned()));
    }

    let target_cents = match target_amount {
        Some(target) if target.is_sign_negative() => {
            return Err(Error::Validation(
                "the target amount cannot be negative".to_owned(),
            ));
        }
        Some(target) => Some(to_exact_cents(target)?),
        None => None,
    };

    let piggy_bank = connection
        .prepare(
            "INSERT INTO piggy_bank (user_id, name, target_amount, current_amount, status)
             VALUES (?1, ?2, ?3, 0, ?4)
             RETURNING id, user_id, name, target_amount, current_amount, status",
        )?
        .query_row(
            (owner.as_i64(), name, target_cents, PiggyStatus::Active),
            map_row,
        )?;

    Ok(piggy_bank)
}

/// Get the active piggy bank `id` of `owner`.
///
/// # Errors
/// Returns an [Error::NotFound] if the piggy bank does not exist, is deleted,
/// or belongs to another user.
pub fn get_piggy_bank(owner: UserID, id: PiggyId, connection: &Connection) -> Result<PiggyBank, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, target_amount, current_amount, status FROM piggy_bank
             WHERE id = :id AND user_id = :owner AND status = 'ACTIVE'",
        )?
        .query_row(&[(":id", &id), (":owner", &owner.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// Get the active piggy banks of `owner`, newest first.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_piggy_banks(owner: UserID, connection: &Connection) -> Result<Vec<PiggyBank>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, target_amount, current_amount, status FROM piggy_bank
             WHERE user_id = :owner AND status != 'DELETED'
             ORDER BY id DESC",
        )?
        .query_map(&[(":owner", &owner.as_i64())], map_row)?
        .map(|piggy_result| piggy_result.map_err(Error::SqlError))
        .collect()
}

/// Close piggy bank `id`.
///
/// A positive balance is first moved back to `refund_account` with a
/// [PiggyDirection::FromPiggy] transfer. The refund and the status change are
/// committed together. Returns the refund transfer, if one was needed.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the piggy bank does not exist or is already deleted,
/// - [Error::Validation] if the piggy bank holds money and no valid `refund_account` was given,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_piggy_bank(
    owner: UserID,
    id: PiggyId,
    refund_account: Option<AccountId>,
    date: Date,
    connection: &Connection,
) -> Result<Option<PiggyTransfer>, Error> {
    let transaction = connection.unchecked_transaction()?;
    let piggy_bank = get_piggy_bank(owner, id, &transaction)?;

    let refund = if piggy_bank.current_amount > Decimal::ZERO {
        let Some(account_id) = refund_account else {
            return Err(Error::Validation(
                "an account_id is required to refund the remaining balance".to_owned(),
            ));
        };

        Some(apply_piggy_transfer(
            NewPiggyTransfer {
                owner,
                piggy_id: id,
                account_id,
                amount: piggy_bank.current_amount,
                direction: PiggyDirection::FromPiggy,
                date,
                note: Some("Piggy bank closed, funds returned".to_owned()),
            },
            &transaction,
        )?)
    } else {
        None
    };

    transaction.execute(
        "UPDATE piggy_bank SET status = ?1 WHERE id = ?2 AND user_id = ?3",
        (PiggyStatus::Deleted, id, owner.as_i64()),
    )?;
    transaction.commit()?;

    tracing::info!("Deleted piggy bank {id}");

    Ok(refund)
}

/// Add `delta` cents to the saved amount of piggy bank `id`.
///
/// # Errors
/// Returns an [Error::NotFound] if the piggy bank does not exist.
pub(super) fn apply_piggy_delta(
    id: PiggyId,
    delta: Cents,
    connection: &Connection,
) -> Result<Cents, Error> {
    connection
        .query_row(
            "UPDATE piggy_bank SET current_amount = current_amount + ?1 WHERE id = ?2
             RETURNING current_amount",
            (delta, id),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

fn map_row(row: &Row) -> Result<PiggyBank, rusqlite::Error> {
    let target_amount: Option<Cents> = row.get(3)?;
    let current_amount: Cents = row.get(4)?;

    Ok(PiggyBank {
        id: row.get(0)?,
        owner: UserID::new(row.get(1)?),
        name: row.get(2)?,
        target_amount: target_amount.map(from_cents),
        current_amount: from_cents(current_amount),
        status: row.get(5)?,
    })
}
