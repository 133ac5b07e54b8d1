//! Per-user display and notification preferences.

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    Error,
    auth::UserID,
    money::{Cents, amount_format, from_cents, to_cents},
};

/// The number of fractional digits shown when a user has not chosen one.
pub const DEFAULT_DECIMAL_PLACES: u8 = 2;
/// The most fractional digits a user may choose.
pub const MAX_DECIMAL_PLACES: u8 = 4;
/// The default notification threshold, 1.00.
const DEFAULT_NOTIFY_THRESHOLD: Cents = 100;

/// A currency a user can pick for displaying amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Euro.
    #[default]
    Eur,
    /// US dollar.
    Usd,
    /// Pound sterling.
    Gbp,
}

impl Currency {
    fn as_str(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
        }
    }

    /// Read a currency code case-insensitively, unsupported codes fall back to EUR.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "USD" => Currency::Usd,
            "GBP" => Currency::Gbp,
            _ => Currency::Eur,
        }
    }
}

impl ToSql for Currency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Currency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            other => Err(FromSqlError::Other(
                format!("unknown currency {other}").into(),
            )),
        }
    }
}

/// The preferences of one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSettings {
    /// The user the settings belong to.
    #[serde(skip)]
    pub user_id: UserID,
    /// The currency amounts are displayed in.
    pub default_currency: Currency,
    /// The number of fractional digits shown, at most [MAX_DECIMAL_PLACES].
    pub decimal_places: u8,
    /// The smallest amount the user wants to be notified about, always positive.
    #[serde(serialize_with = "amount_format::serialize")]
    pub notify_threshold: Decimal,
}

/// Changes to a user's settings, `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    /// A currency code, unsupported codes are stored as EUR.
    pub default_currency: Option<String>,
    /// Clamped to `0..=MAX_DECIMAL_PLACES`.
    pub decimal_places: Option<i64>,
    /// Values that are not positive reset the threshold to 1.00.
    pub notify_threshold: Option<Decimal>,
}

/// Create the user settings table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_user_settings_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user_settings (
            user_id INTEGER PRIMARY KEY,
            default_currency TEXT NOT NULL DEFAULT 'EUR',
            decimal_places INTEGER NOT NULL DEFAULT 2,
            notify_threshold INTEGER NOT NULL DEFAULT 100,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Get the settings of `user_id`, storing the defaults first if the user has none yet.
///
/// # Errors
/// Returns an [Error::SqlError] if the user does not exist or there is some other SQL error.
pub fn get_user_settings(user_id: UserID, connection: &Connection) -> Result<UserSettings, Error> {
    connection.execute(
        "INSERT INTO user_settings (user_id, default_currency, decimal_places, notify_threshold)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id) DO NOTHING",
        (
            user_id.as_i64(),
            Currency::default(),
            DEFAULT_DECIMAL_PLACES,
            DEFAULT_NOTIFY_THRESHOLD,
        ),
    )?;

    connection
        .prepare(
            "SELECT user_id, default_currency, decimal_places, notify_threshold
             FROM user_settings WHERE user_id = :user_id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// Apply `update` to the settings of `user_id` and return the stored result.
///
/// Out of range values are normalized rather than rejected.
///
/// # Errors
/// Returns an [Error::SqlError] if the user does not exist or there is some other SQL error.
pub fn update_user_settings(
    user_id: UserID,
    update: SettingsUpdate,
    connection: &Connection,
) -> Result<UserSettings, Error> {
    let current = get_user_settings(user_id, connection)?;

    let default_currency = update
        .default_currency
        .as_deref()
        .map(Currency::from_code)
        .unwrap_or(current.default_currency);
    let decimal_places = match update.decimal_places {
        Some(places) => u8::try_from(places.clamp(0, i64::from(MAX_DECIMAL_PLACES)))
            .unwrap_or(DEFAULT_DECIMAL_PLACES),
        None => current.decimal_places,
    };
    let notify_threshold = match update.notify_threshold {
        Some(threshold) => to_cents(threshold)
            .filter(|cents| *cents > 0)
            .unwrap_or(DEFAULT_NOTIFY_THRESHOLD),
        None => to_cents(current.notify_threshold).unwrap_or(DEFAULT_NOTIFY_THRESHOLD),
    };

    let settings = connection
        .prepare(
            "UPDATE user_settings
             SET default_currency = ?1, decimal_places = ?2, notify_threshold = ?3
             WHERE user_id = ?4
             RETURNING user_id, default_currency, decimal_places, notify_threshold",
        )?
        .query_row(
            (
                default_currency,
                decimal_places,
                notify_threshold,
                user_id.as_i64(),
            ),
            map_row,
        )?;

    tracing::debug!("updated settings of user {}", user_id.as_i64());

    Ok(settings)
}

fn map_row(row: &Row) -> Result<UserSettings, rusqlite::Error> {
    Ok(UserSettings {
        user_id: UserID::new(row.get(0)?),
        default_currency: row.get(1)?,
        decimal_places: row.get(2)?,
        notify_threshold: from_cents(row.get(3)?),
    })
}
