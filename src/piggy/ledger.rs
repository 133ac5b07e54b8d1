//! Moves money between a checking account and a piggy bank.

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    account::{AccountId, apply_balance_delta, get_owned_account},
    auth::UserID,
    database_id::DatabaseId,
    money::{Cents, amount_format, format_amount, from_cents, to_exact_cents},
    piggy::{PiggyId, core::apply_piggy_delta, get_piggy_bank},
    time_format::date_format,
    transaction::{Transaction, TransactionKind, create_transaction},
};

/// The category of the transaction rows written for piggy bank transfers.
pub const SAVINGS_CATEGORY: &str = "Savings";

/// Which way money moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiggyDirection {
    /// From the account into the piggy bank.
    ToPiggy,
    /// From the piggy bank back to the account.
    FromPiggy,
}

impl PiggyDirection {
    fn as_str(&self) -> &'static str {
        match self {
            PiggyDirection::ToPiggy => "TO_PIGGY",
            PiggyDirection::FromPiggy => "FROM_PIGGY",
        }
    }
}

impl ToSql for PiggyDirection {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PiggyDirection {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "TO_PIGGY" => Ok(PiggyDirection::ToPiggy),
            "FROM_PIGGY" => Ok(PiggyDirection::FromPiggy),
            other => Err(FromSqlError::Other(
                format!("unknown piggy transfer direction {other}").into(),
            )),
        }
    }
}

/// A completed movement between an account and a piggy bank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PiggyTransfer {
    /// The ID of the transfer.
    #[serde(rename = "transfer_id")]
    pub id: DatabaseId,
    /// The piggy bank on one side.
    pub piggy_id: PiggyId,
    /// The account on the other side.
    pub account_id: AccountId,
    /// The amount moved, always positive.
    #[serde(serialize_with = "amount_format::serialize")]
    pub amount: Decimal,
    /// Which way the money moved.
    pub direction: PiggyDirection,
    /// When the transfer was booked.
    #[serde(serialize_with = "date_format::serialize")]
    pub date: Date,
    /// An optional note.
    pub note: Option<String>,
}

/// A transfer to be posted with [post_piggy_transfer].
#[derive(Debug, Clone, PartialEq)]
pub struct NewPiggyTransfer {
    /// The user that owns both the piggy bank and the account.
    pub owner: UserID,
    /// The piggy bank.
    pub piggy_id: PiggyId,
    /// The account.
    pub account_id: AccountId,
    /// The amount to move, must be positive with at most two decimal places.
    pub amount: Decimal,
    /// Which way the money moves.
    pub direction: PiggyDirection,
    /// The booking date.
    pub date: Date,
    /// An optional note.
    pub note: Option<String>,
}

/// Create the piggy transfer table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_piggy_transfer_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS piggy_transfer (
            id INTEGER PRIMARY KEY,
            piggy_id INTEGER NOT NULL,
            account_id INTEGER NOT NULL,
            amount INTEGER NOT NULL CHECK (amount > 0),
            direction TEXT NOT NULL CHECK (direction IN ('TO_PIGGY', 'FROM_PIGGY')),
            date TEXT NOT NULL,
            note TEXT,
            FOREIGN KEY(piggy_id) REFERENCES piggy_bank(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Move money between an account and a piggy bank atomically.
///
/// Neither the account nor the piggy bank may go below zero.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the amount is not positive or has sub-cent precision,
///   or the account does not belong to the owner,
/// - [Error::NotFound] if the piggy bank does not exist or is not active,
/// - [Error::InsufficientFunds] if the source does not hold the amount,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn post_piggy_transfer(
    new_transfer: NewPiggyTransfer,
    connection: &Connection,
) -> Result<PiggyTransfer, Error> {
    let transaction = connection.unchecked_transaction()?;
    let transfer = apply_piggy_transfer(new_transfer, &transaction)?;
    transaction.commit()?;

    Ok(transfer)
}

/// Write the effects of a piggy transfer using `connection`.
///
/// Callers must run this inside a database transaction, see [post_piggy_transfer].
///
/// # Errors
/// See [post_piggy_transfer].
pub fn apply_piggy_transfer(
    new_transfer: NewPiggyTransfer,
    connection: &Connection,
) -> Result<PiggyTransfer, Error> {
    if new_transfer.amount <= Decimal::ZERO {
        return Err(Error::Validation("the amount must be positive".to_owned()));
    }

    let cents = to_exact_cents(new_transfer.amount)?;
    let piggy_bank = get_piggy_bank(new_transfer.owner, new_transfer.piggy_id, connection)?;
    let account = match get_owned_account(new_transfer.owner, new_transfer.account_id, connection)
    {
        Ok(account) => account,
        Err(Error::NotFound) => return Err(Error::Validation("invalid account".to_owned())),
        Err(error) => return Err(error),
    };

    let (account_delta, kind, description) = match new_transfer.direction {
        PiggyDirection::ToPiggy => {
            if account.balance < new_transfer.amount {
                return Err(Error::InsufficientFunds(format!(
                    "insufficient funds: the account holds {} but the transfer needs {}",
                    format_amount(account.balance),
                    format_amount(new_transfer.amount)
                )));
            }

            (
                -cents,
                TransactionKind::Debit,
                format!("Transfer to piggy bank {}", piggy_bank.name),
            )
        }
        PiggyDirection::FromPiggy => {
            if piggy_bank.current_amount < new_transfer.amount {
                return Err(Error::InsufficientFunds(format!(
                    "insufficient piggy bank balance: it holds {} but the transfer needs {}",
                    format_amount(piggy_bank.current_amount),
                    format_amount(new_transfer.amount)
                )));
            }

            (
                cents,
                TransactionKind::Credit,
                format!("Withdrawal from piggy bank {}", piggy_bank.name),
            )
        }
    };

    let transfer = connection
        .prepare(
            "INSERT INTO piggy_transfer (piggy_id, account_id, amount, direction, date, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, piggy_id, account_id, amount, direction, date, note",
        )?
        .query_row(
            (
                new_transfer.piggy_id,
                new_transfer.account_id,
                cents,
                new_transfer.direction,
                new_transfer.date,
                &new_transfer.note,
            ),
            map_row,
        )?;

    apply_piggy_delta(new_transfer.piggy_id, -account_delta, connection)?;
    apply_balance_delta(new_transfer.account_id, account_delta, connection)?;
    create_transaction(
        Transaction::build(
            new_transfer.account_id,
            kind,
            cents,
            new_transfer.date,
            &description,
        )
        .piggy_id(Some(new_transfer.piggy_id))
        .category(SAVINGS_CATEGORY),
        connection,
    )?;

    tracing::info!(
        "Posted piggy transfer {} of {} {} piggy bank {}",
        transfer.id,
        format_amount(transfer.amount),
        match transfer.direction {
            PiggyDirection::ToPiggy => "into",
            PiggyDirection::FromPiggy => "out of",
        },
        transfer.piggy_id
    );

    Ok(transfer)
}

fn map_row(row: &Row) -> Result<PiggyTransfer, rusqlite::Error> {
    let amount: Cents = row.get(3)?;

    Ok(PiggyTransfer {
        id: row.get(0)?,
        piggy_id: row.get(1)?,
        account_id: row.get(2)?,
        amount: from_cents(amount),
        direction: row.get(4)?,
        date: row.get(5)?,
        note: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        Error,
        account::get_account,
        piggy::{
            NewPiggyTransfer, PiggyDirection, create_piggy_bank, get_piggy_bank,
            post_piggy_transfer,
        },
        test_utils::{TestBank, create_test_bank, get_test_connection},
        transaction::{TransactionKind, get_account_transactions},
    };

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn transfer(
        bank: &TestBank,
        piggy_id: i64,
        amount: &str,
        direction: PiggyDirection,
    ) -> NewPiggyTransfer {
        NewPiggyTransfer {
            owner: bank.alice.id,
            piggy_id,
            account_id: bank.alice_account,
            amount: d(amount),
            direction,
            date: date!(2025 - 06 - 01),
            note: None,
        }
    }

    #[test]
    fn to_piggy_moves_money_out_of_the_account() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let piggy = create_piggy_bank(bank.alice.id, "Holiday", None, &conn).unwrap();

        let result =
            post_piggy_transfer(transfer(&bank, piggy.id, "40.00", PiggyDirection::ToPiggy), &conn)
                .unwrap();

        assert_eq!(result.amount, d("40.00"));
        assert_eq!(
            get_piggy_bank(bank.alice.id, piggy.id, &conn)
                .unwrap()
                .current_amount,
            d("40.00")
        );
        assert_eq!(
            get_account(bank.alice_account, &conn).unwrap().balance,
            d("60.00")
        );

        let rows = get_account_transactions(bank.alice_account, &conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, TransactionKind::Debit);
        assert_eq!(rows[0].piggy_id, Some(piggy.id));
        assert_eq!(rows[0].category, "Savings");
    }

    #[test]
    fn from_piggy_moves_money_back() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let piggy = create_piggy_bank(bank.alice.id, "Holiday", None, &conn).unwrap();
        post_piggy_transfer(transfer(&bank, piggy.id, "40.00", PiggyDirection::ToPiggy), &conn)
            .unwrap();

        post_piggy_transfer(
            transfer(&bank, piggy.id, "15.50", PiggyDirection::FromPiggy),
            &conn,
        )
        .unwrap();

        assert_eq!(
            get_piggy_bank(bank.alice.id, piggy.id, &conn)
                .unwrap()
                .current_amount,
            d("24.50")
        );
        assert_eq!(
            get_account(bank.alice_account, &conn).unwrap().balance,
            d("75.50")
        );
    }

    #[test]
    fn from_piggy_exceeding_balance_is_rejected_without_side_effects() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let piggy = create_piggy_bank(bank.alice.id, "Holiday", None, &conn).unwrap();
        post_piggy_transfer(transfer(&bank, piggy.id, "10.00", PiggyDirection::ToPiggy), &conn)
            .unwrap();

        let result = post_piggy_transfer(
            transfer(&bank, piggy.id, "10.01", PiggyDirection::FromPiggy),
            &conn,
        );

        assert!(matches!(result, Err(Error::InsufficientFunds(_))));
        assert_eq!(
            get_piggy_bank(bank.alice.id, piggy.id, &conn)
                .unwrap()
                .current_amount,
            d("10.00")
        );
        assert_eq!(
            get_account(bank.alice_account, &conn).unwrap().balance,
            d("90.00")
        );
        assert_eq!(
            get_account_transactions(bank.alice_account, &conn)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn to_piggy_exceeding_account_balance_is_rejected() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let piggy = create_piggy_bank(bank.alice.id, "Holiday", None, &conn).unwrap();

        let result = post_piggy_transfer(
            transfer(&bank, piggy.id, "100.01", PiggyDirection::ToPiggy),
            &conn,
        );

        assert!(matches!(result, Err(Error::InsufficientFunds(_))));
    }

    #[test]
    fn other_users_account_is_rejected() {
        let conn = get_test_connection();
        let bank = create_test_bank(&conn);
        let piggy = create_piggy_bank(bank.alice.id, "Holiday", None, &conn).unwrap();
        let mut new_transfer = transfer(&bank, piggy.id, "1.00", PiggyDirection::ToPiggy);
        new_transfer.account_id = bank.bob_account;

        let result = post_piggy_transfer(new_transfer, &conn);

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn direction_uses_screaming_snake_case() {
        let direction: PiggyDirection = serde_json::from_str(r#""FROM_PIGGY""#).unwrap();

        assert_eq!(direction, PiggyDirection::FromPiggy);
        assert_eq!(
            serde_json::to_string(&PiggyDirection::ToPiggy).unwrap(),
            r#""TO_PIGGY""#
        );
    }
}
