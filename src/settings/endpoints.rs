//! The user settings endpoints.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    app_state::DbState,
    auth::UserID,
    db::lock_connection,
    json_body,
    money::AmountInput,
    settings::{SettingsUpdate, UserSettings, get_user_settings, update_user_settings},
};

/// Handle `GET` requests for the settings of the current user.
pub async fn get_settings_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<UserSettings>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_user_settings(user_id, &connection).map(Json)
}

/// The body of a settings update, omitted fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsForm {
    /// "EUR", "USD" or "GBP".
    pub default_currency: Option<String>,
    /// The number of fractional digits to show.
    pub decimal_places: Option<i64>,
    /// The smallest amount worth a notification.
    pub notify_threshold: Option<AmountInput>,
}

/// The response to a settings update.
#[derive(Debug, Serialize)]
pub struct SettingsUpdatedResponse {
    /// Always "saved".
    pub message: String,
    /// The stored settings.
    pub settings: UserSettings,
}

/// Handle `PUT` requests that change the settings of the current user.
pub async fn update_settings_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    payload: Result<Json<SettingsForm>, JsonRejection>,
) -> Result<Json<SettingsUpdatedResponse>, Error> {
    let form = json_body(payload)?;
    let notify_threshold = form
        .notify_threshold
        .as_ref()
        .map(AmountInput::parse)
        .transpose()?;

    let connection = lock_connection(&state.db_connection)?;
    let settings = update_user_settings(
        user_id,
        SettingsUpdate {
            default_currency: form.default_currency,
            decimal_places: form.decimal_places,
            notify_threshold,
        },
        &connection,
    )?;

    Ok(Json(SettingsUpdatedResponse {
        message: "saved".to_owned(),
        settings,
    }))
}
