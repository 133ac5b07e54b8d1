//! Per-user preferences: display currency, decimal places and the notification threshold.

mod core;
mod endpoints;

pub use self::core::{
    SettingsUpdate, UserSettings, create_user_settings_table, get_user_settings,
    update_user_settings,
};
pub use endpoints::{get_settings_endpoint, update_settings_endpoint};

#[cfg(test)]
pub use self::core::Currency;
