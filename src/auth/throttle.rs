//! Records failed log-in attempts so that repeated guessing can be slowed down.

use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use crate::Error;

/// The number of failed attempts allowed inside [FAILED_LOG_IN_WINDOW].
pub(crate) const MAX_FAILED_LOG_INS: u32 = 5;
/// How far back failed attempts are counted.
pub(crate) const FAILED_LOG_IN_WINDOW: Duration = Duration::minutes(15);

/// Create the table of failed log-in attempts.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_failed_log_in_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS failed_log_in (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL,
                attempted_at INTEGER NOT NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_failed_log_in_username ON failed_log_in(username, attempted_at);",
        (),
    )?;

    Ok(())
}

/// Record a failed log-in attempt for `username` at `now`.
///
/// Attempts from before [FAILED_LOG_IN_WINDOW] no longer count for any
/// username, so they are deleted at the same time.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub(crate) fn record_failed_log_in(
    username: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "DELETE FROM failed_log_in WHERE attempted_at <= ?1",
        [(now - FAILED_LOG_IN_WINDOW).unix_timestamp()],
    )?;
    connection.execute(
        "INSERT INTO failed_log_in (username, attempted_at) VALUES (?1, ?2)",
        (username, now.unix_timestamp()),
    )?;

    Ok(())
}

/// Count the failed log-in attempts for `username` within [FAILED_LOG_IN_WINDOW] of `now`.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub(crate) fn count_recent_failed_log_ins(
    username: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<u32, Error> {
    let window_start = (now - FAILED_LOG_IN_WINDOW).unix_timestamp();

    connection
        .query_row(
            "SELECT COUNT(id) FROM failed_log_in WHERE username = ?1 AND attempted_at > ?2",
            (username, window_start),
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// Whether `username` has used up its failed attempts.
pub(crate) fn is_throttled(
    username: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<bool, Error> {
    count_recent_failed_log_ins(username, now, connection).map(|count| count >= MAX_FAILED_LOG_INS)
}
