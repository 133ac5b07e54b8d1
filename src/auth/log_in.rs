//! Handles log-in and log-out requests.
//! The rest of the auth module handles the lower level cookie and password logic.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        UserID,
        cookie::{invalidate_auth_cookie, set_auth_cookie},
        user::get_user_by_customer_code,
    },
    db::lock_connection,
    json_body,
};

/// The state needed to log in a user.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The credentials sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// The code the customer logs in with.
    pub customer_code: String,
    /// The user's password.
    pub password: String,
}

/// The body of a successful log-in response.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogInResponse {
    /// The ID of the logged in user.
    pub user_id: UserID,
    /// The name of the logged in user.
    pub display_name: String,
}

/// Verify the credentials and set the auth cookie.
///
/// An unknown customer code and a wrong password get the same
/// [Error::InvalidCredentials] response.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    payload: Result<Json<LogInData>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<LogInResponse>), Error> {
    let credentials = json_body(payload)?;
    let customer_code = credentials.customer_code.trim();

    if customer_code.is_empty() || credentials.password.is_empty() {
        return Err(Error::Validation(
            "customer_code and password are required".to_owned(),
        ));
    }

    let user = {
        let connection = lock_connection(&state.db_connection)?;

        match get_user_by_customer_code(customer_code, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        }
    };

    if !user.password_hash.verify(&credentials.password)? {
        tracing::info!("Failed log-in attempt for customer code {customer_code}");
        return Err(Error::InvalidCredentials);
    }

    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)?;
    tracing::info!("User {} logged in", user.id);

    Ok((
        jar,
        Json(LogInResponse {
            user_id: user.id,
            display_name: user.display_name,
        }),
    ))
}

/// Invalidate the auth cookie.
pub async fn post_log_out(jar: PrivateCookieJar) -> PrivateCookieJar {
    invalidate_auth_cookie(jar)
}
