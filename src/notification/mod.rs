//! Per-user notifications produced by P2P transfers and split requests.

mod core;
mod endpoints;

pub use self::core::{
    NewNotification, Notification, NotificationId, NotificationKind, NotificationStatus,
    count_unread, create_notification, create_notification_table, get_notifications,
    mark_notification, notify_or_warn,
};
pub use endpoints::{get_notifications_endpoint, update_notification_endpoint};
