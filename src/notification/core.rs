//! Notification records and their database queries.

use std::str::FromStr;

use rusqlite::{
    Connection, OptionalExtension, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::Serialize;
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{Error, auth::UserID, database_id::DatabaseId, time_format::timestamp_format};

/// Database identifier for a notification.
pub type NotificationId = DatabaseId;

/// The largest number of notifications returned by [get_notifications].
pub const MAX_NOTIFICATIONS: u32 = 100;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    /// The user sent money.
    #[serde(rename = "P2P_SENT")]
    P2PSent,
    /// The user received money.
    #[serde(rename = "P2P_RECEIVED")]
    P2PReceived,
    /// Somebody asked the user for money, or the user asked others.
    #[serde(rename = "P2P_REQUEST")]
    P2PRequest,
}

impl NotificationKind {
    fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::P2PSent => "P2P_SENT",
            NotificationKind::P2PReceived => "P2P_RECEIVED",
            NotificationKind::P2PRequest => "P2P_REQUEST",
        }
    }
}

impl ToSql for NotificationKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for NotificationKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "P2P_SENT" => Ok(NotificationKind::P2PSent),
            "P2P_RECEIVED" => Ok(NotificationKind::P2PReceived),
            "P2P_REQUEST" => Ok(NotificationKind::P2PRequest),
            other => Err(FromSqlError::Other(
                format!("unknown notification type {other}").into(),
            )),
        }
    }
}

/// Whether the user has seen a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationStatus {
    /// Not seen yet.
    Unread,
    /// Seen.
    Read,
    /// Hidden from the default list.
    Archived,
}

impl NotificationStatus {
    fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Unread => "UNREAD",
            NotificationStatus::Read => "READ",
            NotificationStatus::Archived => "ARCHIVED",
        }
    }
}

impl FromStr for NotificationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "UNREAD" => Ok(NotificationStatus::Unread),
            "READ" => Ok(NotificationStatus::Read),
            "ARCHIVED" => Ok(NotificationStatus::Archived),
            _ => Err(Error::Validation(format!(
                "\"{s}\" is not a notification status, expected UNREAD, READ or ARCHIVED"
            ))),
        }
    }
}

impl ToSql for NotificationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for NotificationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(error.to_string().into()))
    }
}

/// A message shown to a user in their notification center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// The ID of the notification.
    #[serde(rename = "notification_id")]
    pub id: NotificationId,
    /// The user the notification is addressed to.
    #[serde(skip)]
    pub user_id: UserID,
    /// What the notification is about.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// A one line summary.
    pub title: String,
    /// The details.
    pub body: Option<String>,
    /// Whether the user has seen the notification.
    pub status: NotificationStatus,
    /// Identifies the event the notification was created for.
    #[serde(skip)]
    pub dedupe_key: Option<String>,
    /// Machine readable details, e.g. the transfer ID.
    pub payload: Value,
    /// When the notification was created or last refreshed.
    #[serde(serialize_with = "timestamp_format::serialize")]
    pub created_at: OffsetDateTime,
}

/// The data needed to notify a user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    /// The user to notify.
    pub user_id: UserID,
    /// What the notification is about.
    pub kind: NotificationKind,
    /// A one line summary.
    pub title: String,
    /// The details.
    pub body: Option<String>,
    /// At most one notification per user exists for a given key.
    pub dedupe_key: Option<String>,
    /// Machine readable details.
    pub payload: Value,
}

/// Create the notification table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_notification_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS notification (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT,
            status TEXT NOT NULL DEFAULT 'UNREAD',
            dedupe_key TEXT,
            payload TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_notification_dedupe
         ON notification(user_id, dedupe_key) WHERE dedupe_key IS NOT NULL;",
        (),
    )?;

    Ok(())
}

/// Notify a user and return the ID of the notification.
///
/// If `new_notification` has a dedupe key and the user already has a
/// notification with that key, the existing notification is refreshed with
/// the new body and payload instead of creating a duplicate. An unread
/// notification also has its timestamp bumped.
///
/// # Errors
/// Returns an [Error::SqlError] if the user does not exist or there is some other SQL error.
pub fn create_notification(
    new_notification: NewNotification,
    connection: &Connection,
) -> Result<NotificationId, Error> {
    let now = OffsetDateTime::now_utc();
    let payload = new_notification.payload.to_string();

    if let Some(dedupe_key) = &new_notification.dedupe_key {
        let existing: Option<NotificationId> = connection
            .query_row(
                "SELECT id FROM notification WHERE user_id = ?1 AND dedupe_key = ?2",
                (new_notification.user_id.as_i64(), dedupe_key),
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            connection.execute(
                "UPDATE notification
                 SET body = COALESCE(?1, body),
                     payload = ?2,
                     created_at = CASE WHEN status = 'UNREAD' THEN ?3 ELSE created_at END
                 WHERE id = ?4",
                (&new_notification.body, &payload, now, id),
            )?;

            return Ok(id);
        }
    }

    connection.execute(
        "INSERT INTO notification (user_id, kind, title, body, status, dedupe_key, payload, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            new_notification.user_id.as_i64(),
            new_notification.kind,
            &new_notification.title,
            &new_notification.body,
            NotificationStatus::Unread,
            &new_notification.dedupe_key,
            &payload,
            now,
        ),
    )?;

    Ok(connection.last_insert_rowid())
}

/// Like [create_notification], but a failure is only logged.
///
/// Used after money has already moved, where a missing notification must not
/// turn a committed transfer into an error.
pub fn notify_or_warn(
    new_notification: NewNotification,
    connection: &Connection,
) -> Option<NotificationId> {
    let user_id = new_notification.user_id;

    match create_notification(new_notification, connection) {
        Ok(id) => Some(id),
        Err(error) => {
            tracing::warn!("could not notify user {user_id}: {error}");
            None
        }
    }
}

/// Get up to `limit` notifications of `user_id`, newest first.
///
/// `limit` is clamped to `1..=MAX_NOTIFICATIONS`. If `status` is given only
/// notifications with that status are returned.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_notifications(
    user_id: UserID,
    limit: u32,
    status: Option<NotificationStatus>,
    connection: &Connection,
) -> Result<Vec<Notification>, Error> {
    let limit = limit.clamp(1, MAX_NOTIFICATIONS);

    connection
        .prepare(
            "SELECT id, user_id, kind, title, body, status, dedupe_key, payload, created_at
             FROM notification
             WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC, id DESC
             LIMIT ?3",
        )?
        .query_map((user_id.as_i64(), status, limit), map_row)?
        .map(|notification_result| notification_result.map_err(Error::SqlError))
        .collect()
}

/// Count the unread notifications of `user_id`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn count_unread(user_id: UserID, connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM notification WHERE user_id = ?1 AND status = 'UNREAD'",
            (user_id.as_i64(),),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Set the status of notification `id`.
///
/// # Errors
/// Returns an [Error::NotFound] if the notification does not exist or is addressed to another user.
pub fn mark_notification(
    user_id: UserID,
    id: NotificationId,
    status: NotificationStatus,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE notification SET status = ?1 WHERE id = ?2 AND user_id = ?3",
        (status, id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Notification, rusqlite::Error> {
    let raw_payload: String = row.get(7)?;
    let payload =
        serde_json::from_str(&raw_payload).unwrap_or_else(|_| json!({ "raw": raw_payload }));

    Ok(Notification {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        kind: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        status: row.get(5)?,
        dedupe_key: row.get(6)?,
        payload,
        created_at: row.get(8)?,
    })
}
