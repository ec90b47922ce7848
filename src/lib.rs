//! A web app for tracking personal income and expenses.
//!
//! The server renders the log-in, registration and dashboard pages as HTML
//! and exposes a small JSON API for creating and listing transactions.
//! Reporting is built on the pure functions in [aggregation], which group
//! transactions into monthly and per-category totals.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

pub mod aggregation;

mod alert;
mod app_state;
mod auth;
mod dashboard;
mod db;
mod email;
mod endpoints;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod password;
mod routing;
mod timezone;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use email::Email;
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use timezone::get_local_offset;
pub use transaction::TransactionType;
pub use user::{User, UserID};

use crate::{
    alert::Alert, internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
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
    /// The username and password combination did not match a registered user.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Too many failed log-in attempts were made for a username recently.
    #[error("too many failed log-in attempts")]
    TooManyLogInAttempts,

    /// The session cookie is missing from the cookie jar in the request.
    #[error("no session cookie in the cookie jar")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The request did not include an authorization token.
    #[error("authorization header required")]
    MissingToken,

    /// The authorization token was malformed, had a bad signature or has expired.
    #[error("invalid token")]
    InvalidToken,

    /// The authorization token could not be created.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// The username was empty or too long.
    #[error("{0}")]
    InvalidUsername(String),

    /// The email address is not a valid email address.
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    /// The username already belongs to another user.
    #[error("Username already taken")]
    UsernameTaken,

    /// The email address already belongs to another user.
    #[error("Email already registered")]
    EmailTaken,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A transaction amount was negative, NaN or infinite.
    #[error("{0} is not a valid amount, amounts must be zero or more")]
    InvalidAmount(f64),

    /// A transaction type other than "income" or "expense" was given.
    #[error("\"{0}\" is not a valid transaction type, expected \"income\" or \"expense\"")]
    InvalidTransactionType(String),

    /// The category was empty or too long.
    #[error("{0}")]
    InvalidCategory(String),

    /// A transaction date could not be parsed.
    #[error("\"{0}\" is not a valid date")]
    InvalidDate(String),

    /// The request body could not be parsed.
    #[error("{0}")]
    InvalidRequest(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.username") =>
            {
                Error::UsernameTaken
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::EmailTaken
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code that best describes the error to a client.
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials
            | Error::CookieMissing
            | Error::MissingToken
            | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::TooManyLogInAttempts => StatusCode::TOO_MANY_REQUESTS,
            Error::UsernameTaken | Error::EmailTaken => StatusCode::CONFLICT,
            Error::InvalidUsername(_)
            | Error::InvalidEmail(_)
            | Error::TooWeak(_)
            | Error::InvalidAmount(_)
            | Error::InvalidTransactionType(_)
            | Error::InvalidCategory(_)
            | Error::InvalidDate(_)
            | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidDateFormat(_, _)
            | Error::TokenCreation(_)
            | Error::HashingError(_)
            | Error::SqlError(_)
            | Error::InvalidTimezoneError(_)
            | Error::JSONSerializationError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message that is safe to show to the client.
    ///
    /// Internal errors are logged and replaced with a generic message.
    fn client_message(&self) -> String {
        match self {
            Error::InvalidCredentials => "Invalid credentials".to_owned(),
            Error::TooManyLogInAttempts => {
                "Too many failed login attempts. Please try again later".to_owned()
            }
            Error::CookieMissing | Error::MissingToken => {
                "Authorization header required".to_owned()
            }
            Error::InvalidToken => "Invalid token".to_owned(),
            Error::NotFound => "Not found".to_owned(),
            error if error.status_code() == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("An unexpected error occurred: {}", error);
                "An internal error occurred. Please try again later.".to_owned()
            }
            error => error.to_string(),
        }
    }

    /// Convert the error into a JSON response of the form `{"error": "<message>"}`.
    fn into_json_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.client_message() }));

        (status, body).into_response()
    }

    /// Convert the error into an HTML alert for HTMX requests.
    fn into_alert_response(self) -> Response {
        let status = self.status_code();
        let alert = match &self {
            Error::InvalidTimezoneError(timezone) => {
                let fix = format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                );
                Alert::error("Invalid Timezone Settings", &fix).into_html()
            }
            error if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("An unexpected error occurred: {}", error);
                Alert::error(
                    "Something went wrong",
                    "An unexpected error occurred, check the server logs for more details.",
                )
                .into_html()
            }
            error => {
                let message = error.to_string();
                Alert::error("Could not complete the request", &message).into_html()
            }
        };

        (status, alert).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}
