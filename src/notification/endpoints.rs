//! The notification center endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    app_state::DbState,
    auth::UserID,
    db::lock_connection,
    json_body,
    notification::{
        Notification, NotificationId, NotificationStatus, count_unread, get_notifications,
        mark_notification,
    },
};

/// The number of notifications returned when no limit is given.
const DEFAULT_LIMIT: u32 = 10;

/// The query parameters for the notification list.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    /// The maximum number of notifications, non-numeric values use the default.
    pub limit: Option<String>,
    /// Only notifications with this status, unknown values are ignored.
    pub status: Option<String>,
}

/// The notification list together with the unread count for the badge.
#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    /// The notifications, newest first.
    pub items: Vec<Notification>,
    /// The number of unread notifications.
    pub unread: u32,
}

/// Handle `GET` requests for the notifications of the current user.
pub async fn get_notifications_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<NotificationsResponse>, Error> {
    let limit = query
        .limit
        .as_deref()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(DEFAULT_LIMIT);
    let status = query
        .status
        .as_deref()
        .and_then(|raw| raw.parse::<NotificationStatus>().ok());

    let connection = lock_connection(&state.db_connection)?;
    let items = get_notifications(user_id, limit, status, &connection)?;
    let unread = count_unread(user_id, &connection)?;

    Ok(Json(NotificationsResponse { items, unread }))
}

/// The body of a notification status update.
#[derive(Debug, Deserialize)]
pub struct NotificationUpdate {
    /// The new status, defaults to "READ".
    pub status: Option<String>,
}

/// The response to a notification status update.
#[derive(Debug, Serialize)]
pub struct NotificationUpdateResponse {
    /// Always "ok".
    pub message: String,
    /// The number of unread notifications after the update.
    pub unread: u32,
}

/// Handle `PUT` requests that mark a notification as read, unread or archived.
pub async fn update_notification_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Path(notification_id): Path<NotificationId>,
    payload: Result<Json<NotificationUpdate>, JsonRejection>,
) -> Result<Json<NotificationUpdateResponse>, Error> {
    let update = json_body(payload)?;
    let status = match update.status.as_deref() {
        Some(raw) => raw.parse()?,
        None => NotificationStatus::Read,
    };

    let connection = lock_connection(&state.db_connection)?;
    mark_notification(user_id, notification_id, status, &connection)?;
    let unread = count_unread(user_id, &connection)?;

    Ok(Json(NotificationUpdateResponse {
        message: "ok".to_owned(),
        unread,
    }))
}
