//! Split Bank is a demo banking service: checking accounts, savings goals ("piggy banks"),
//! transaction history, peer-to-peer transfers, and splitting expenses among contacts.
//!
//! This library provides a JSON REST API backed by a single SQLite database.
//!
//! The interesting part is the settlement engine:
//! - [partition] divides an amount among group members, cent-exact and without rounding loss.
//! - [post_p2p] and [post_piggy_transfer] move money atomically between accounts and piggy banks.
//! - [split_group] combines the two to either send shares to, or request shares from, every
//!   member of a group.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod contact;
mod database_id;
mod db;
mod endpoints;
mod logging;
mod money;
mod notification;
mod p2p;
mod piggy;
mod report;
mod routing;
mod settings;
mod split;
mod time_format;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use account::{Account, AccountId, NewAccount, create_account, get_account};
pub use app_state::AppState;
pub use auth::{PasswordHash, User, UserID, create_user, get_user_by_id};
pub use contact::{Contact, ContactId, NewContact, create_contact};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use money::{format_amount, from_cents, to_cents};
pub use p2p::{NewP2PTransfer, P2PTransfer, post_p2p};
pub use piggy::{
    NewPiggyTransfer, PiggyBank, PiggyDirection, PiggyTransfer, create_piggy_bank,
    post_piggy_transfer,
};
pub use routing::build_router;
pub use split::{
    Group, GroupName, Member, ShareOutcome, ShareStatus, SplitMode, add_member, create_group,
    partition, split_group,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The client sent malformed input, e.g. an empty name or a non-positive amount.
    ///
    /// Nothing has been written to the database when this error is returned.
    #[error("{0}")]
    Validation(String),

    /// The request clashes with the current state, e.g. a contact is already a
    /// member of a group or a group has already been deleted.
    #[error("{0}")]
    Conflict(String),

    /// The source of a transfer does not hold enough money.
    ///
    /// Overdrafts are not permitted for accounts or piggy banks.
    #[error("{0}")]
    InsufficientFunds(String),

    /// The requested resource was not found.
    ///
    /// Resources owned by another user are reported as not found.
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The customer code and password did not match a user.
    #[error("invalid customer code or password")]
    InvalidCredentials,

    /// The request did not carry a valid auth cookie.
    #[error("you must be logged in to access this resource")]
    Unauthenticated,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// There was an error formatting or parsing the expiry date of the auth cookie.
    #[error("could not format auth token date-time: {0}")]
    InvalidDateFormat(String),

    /// An error occurred while serializing a struct as JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::InsufficientFunds(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidCredentials | Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::HashingError(_)
            | Error::InvalidDateFormat(_)
            | Error::JSONSerializationError(_)
            | Error::DatabaseLockError
            | Error::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// A message that is safe to show to the client.
    ///
    /// Internal errors are replaced with a generic message, the details should
    /// only end up in the server logs.
    pub fn client_message(&self) -> String {
        if self.status_code().is_server_error() {
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        }
    }
}

/// The body of every error response.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorMessage {
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        (
            status,
            Json(ErrorMessage {
                message: self.client_message(),
            }),
        )
            .into_response()
    }
}

/// Unwrap a JSON request body, turning a rejection into a [Error::Validation]
/// so that malformed bodies get the same `{message}` shape as every other error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| Error::Validation(rejection.body_text()))
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[test]
    fn query_returned_no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let response = Error::Validation("name is required".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_errors_map_to_409() {
        let response = Error::Conflict("already a member".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_hide_details_from_the_client() {
        let error = Error::HashingError("salt exploded".to_owned());

        assert!(!error.client_message().contains("salt"));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
