//! JSON API handlers for creating, listing, summarising and reporting on the
//! caller's transactions.
//!
//! Every handler expects the [Session] that the API auth middleware places in
//! the request.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    aggregation::Report,
    auth::Session,
    transaction::core::{
        NewTransaction, TransactionInput, create_transaction, get_summary,
        list_transaction_records, list_transactions,
    },
};

/// The state needed by the transaction API.
#[derive(Debug, Clone)]
pub struct TransactionApiState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Run `query` with the database connection, mapping lock poisoning to
/// [Error::DatabaseLockError].
fn with_connection<T>(
    state: &TransactionApiState,
    query: impl FnOnce(&Connection) -> Result<T, Error>,
) -> Result<T, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    query(&connection)
}

/// Create a transaction for the logged in user from a JSON body.
///
/// Responds with `201 Created` and the stored transaction.
pub async fn create_transaction_api(
    State(state): State<TransactionApiState>,
    Extension(session): Extension<Session>,
    body: Result<Json<TransactionInput>, JsonRejection>,
) -> Response {
    let Json(input) = match body {
        Ok(body) => body,
        Err(rejection) => return Error::InvalidRequest(rejection.body_text()).into_json_response(),
    };

    let result = NewTransaction::parse(input, OffsetDateTime::now_utc()).and_then(|transaction| {
        with_connection(&state, |connection| {
            create_transaction(session.user_id, transaction, connection)
        })
    });

    match result {
        Ok(transaction) => (StatusCode::CREATED, Json(transaction)).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// List the logged in user's transactions, newest first.
pub async fn list_transactions_api(
    State(state): State<TransactionApiState>,
    Extension(session): Extension<Session>,
) -> Response {
    match with_connection(&state, |connection| {
        list_transactions(session.user_id, connection)
    }) {
        Ok(transactions) => Json(transactions).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// Get the logged in user's total income, total expenses and balance.
pub async fn get_summary_api(
    State(state): State<TransactionApiState>,
    Extension(session): Extension<Session>,
) -> Response {
    match with_connection(&state, |connection| get_summary(session.user_id, connection)) {
        Ok(summary) => Json(summary).into_response(),
        Err(error) => error.into_json_response(),
    }
}

/// Get the logged in user's transactions aggregated by month and by category.
pub async fn get_report_api(
    State(state): State<TransactionApiState>,
    Extension(session): Extension<Session>,
) -> Response {
    match with_connection(&state, |connection| {
        list_transaction_records(session.user_id, connection)
    }) {
        Ok(records) => Json(Report::from_records(&records)).into_response(),
        Err(error) => error.into_json_response(),
    }
}
