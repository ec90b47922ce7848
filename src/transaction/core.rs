//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{
    Date, OffsetDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::{Error, aggregation::TransactionRecord, user::UserID};

// ============================================================================
// MODELS
// ============================================================================

/// The maximum number of characters allowed in a category name.
pub const MAX_CATEGORY_LENGTH: usize = 50;

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in, e.g. a salary payment.
    Income,
    /// Money going out, e.g. rent or groceries.
    Expense,
}

impl TransactionType {
    /// The lowercase name used in JSON, forms and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(Error::InvalidTransactionType(other.to_owned())),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// An expense or income recorded by a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: i64,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// When the transaction happened, in UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The category label, e.g. "Groceries".
    pub category: String,
    /// Whether the transaction is income or an expense.
    #[serde(rename = "type")]
    pub type_: TransactionType,
    /// The non-negative amount of money earned or spent.
    pub amount: f64,
    /// When the transaction was first recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the transaction was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The unvalidated fields for a new transaction as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInput {
    /// The amount of money, must be zero or more.
    pub amount: f64,
    /// Either "income" or "expense".
    #[serde(rename = "type")]
    pub type_: String,
    /// The category label.
    pub category: String,
    /// An optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// An optional date, either "YYYY-MM-DD" or an RFC 3339 date-time.
    #[serde(default)]
    pub date: Option<String>,
}

/// A validated transaction that is ready to be inserted into the database.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// When the transaction happened.
    pub date: OffsetDateTime,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The trimmed category label.
    pub category: String,
    /// Whether the transaction is income or an expense.
    pub type_: TransactionType,
    /// The non-negative amount of money earned or spent.
    pub amount: f64,
}

impl NewTransaction {
    /// Validate `input`, using `now` for the date when the input does not have one.
    ///
    /// # Errors
    /// Returns a:
    /// - [Error::InvalidAmount] if the amount is negative, NaN or infinite,
    /// - [Error::InvalidTransactionType] if the type is not "income" or "expense",
    /// - [Error::InvalidCategory] if the category is blank or too long,
    /// - [Error::InvalidDate] if a date was given but could not be parsed.
    pub fn parse(input: TransactionInput, now: OffsetDateTime) -> Result<Self, Error> {
        if !input.amount.is_finite() || input.amount < 0.0 {
            return Err(Error::InvalidAmount(input.amount));
        }

        let type_: TransactionType = input.type_.trim().parse()?;

        let category = input.category.trim();
        if category.is_empty() {
            return Err(Error::InvalidCategory("Category cannot be empty".to_owned()));
        }
        if category.chars().count() > MAX_CATEGORY_LENGTH {
            return Err(Error::InvalidCategory(format!(
                "Category must be at most {MAX_CATEGORY_LENGTH} characters"
            )));
        }

        let date = match input.date.as_deref().map(str::trim) {
            None | Some("") => now,
            Some(text) => parse_date(text)
                .filter(is_storable_date)
                .ok_or_else(|| Error::InvalidDate(text.to_owned()))?,
        };

        Ok(Self {
            date,
            description: input.description.unwrap_or_default(),
            category: category.to_owned(),
            type_,
            amount: input.amount,
        })
    }
}

/// Total income, total expenses and the difference between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// The sum of all income.
    pub total_income: f64,
    /// The sum of all expenses.
    pub total_expense: f64,
    /// Income minus expenses.
    pub balance: f64,
}

// ============================================================================
// DATES
// ============================================================================

/// Plain calendar dates, e.g. "2024-01-15".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The format used to store dates in the database, e.g. "2024-01-15T00:00:00Z".
///
/// Every stored date is in UTC with a fixed width so that the text sorts in
/// chronological order.
const STORED_DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// Parse an RFC 3339 date-time or a "YYYY-MM-DD" date (taken as midnight UTC).
///
/// Returns `None` for anything else.
pub fn parse_date(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();

    OffsetDateTime::parse(text, &Rfc3339).ok().or_else(|| {
        Date::parse(text, DATE_FORMAT)
            .ok()
            .map(|date| date.midnight().assume_utc())
    })
}

/// Whether `date` is between years 0 and 9999 once converted to UTC.
///
/// Stored dates are read back as RFC 3339, which only has four digit years.
fn is_storable_date(date: &OffsetDateTime) -> bool {
    date.checked_to_offset(UtcOffset::UTC)
        .is_some_and(|date| (0..=9999).contains(&date.year()))
}

fn format_stored_date(date: OffsetDateTime) -> Result<String, Error> {
    date.to_offset(UtcOffset::UTC)
        .format(STORED_DATE_FORMAT)
        .map_err(|error| Error::InvalidDateFormat(error.to_string(), date.to_string()))
}

fn get_stored_date(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    let text: String = row.get(index)?;

    OffsetDateTime::parse(&text, &Rfc3339)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                amount REAL NOT NULL,
                type TEXT NOT NULL,
                category TEXT NOT NULL,
                description TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Insert a validated transaction for `user_id`.
///
/// # Errors
/// Returns a [Error::SqlError] if there is an SQL error, or a
/// [Error::InvalidDateFormat] if the date cannot be formatted for storage.
pub fn create_transaction(
    user_id: UserID,
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let now = format_stored_date(OffsetDateTime::now_utc())?;
    let date = format_stored_date(transaction.date)?;

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\"
                (user_id, amount, type, category, description, date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             RETURNING id, user_id, amount, type, category, description, date, created_at, updated_at",
        )?
        .query_row(
            (
                user_id.as_i64(),
                transaction.amount,
                transaction.type_,
                transaction.category,
                transaction.description,
                date,
                now,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Get all of the transactions for `user_id`, newest first.
///
/// Rows with a stored value that cannot be read, such as a malformed date,
/// are logged and skipped.
///
/// # Errors
/// Returns a [Error::SqlError] if there is an SQL error.
pub fn list_transactions(user_id: UserID, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, type, category, description, date, created_at, updated_at
             FROM \"transaction\"
             WHERE user_id = :user_id
             ORDER BY date DESC, id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_row)?
        .filter_map(|maybe_transaction| match maybe_transaction {
            Err(error @ rusqlite::Error::FromSqlConversionFailure(..)) => {
                tracing::warn!("Skipping unreadable transaction for user {user_id}: {error}");
                None
            }
            maybe_transaction => Some(maybe_transaction.map_err(Error::from)),
        })
        .collect()
}

/// Get the transactions for `user_id` as aggregation input, newest first.
///
/// Unlike [list_transactions], a stored date that cannot be parsed does not
/// fail the query. The record is returned without a date instead.
///
/// # Errors
/// Returns a [Error::SqlError] if there is an SQL error.
pub fn list_transaction_records(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<TransactionRecord>, Error> {
    connection
        .prepare(
            "SELECT date, description, category, type, amount
             FROM \"transaction\"
             WHERE user_id = :user_id
             ORDER BY date DESC, id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| {
            let date = row.get_ref(0)?.as_str().ok().and_then(parse_date);

            Ok(TransactionRecord {
                date,
                description: row.get(1)?,
                category: row.get(2)?,
                type_: row.get(3)?,
                amount: row.get(4)?,
            })
        })?
        .map(|maybe_record| maybe_record.map_err(Error::from))
        .collect()
}

/// Get the total income, total expenses and balance for `user_id`.
///
/// # Errors
/// Returns a [Error::SqlError] if there is an SQL error.
pub fn get_summary(user_id: UserID, connection: &Connection) -> Result<Summary, Error> {
    let (total_income, total_expense): (f64, f64) = connection.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN type = 'income' THEN amount END), 0.0),
            COALESCE(SUM(CASE WHEN type = 'expense' THEN amount END), 0.0)
         FROM \"transaction\"
         WHERE user_id = ?1",
        [user_id.as_i64()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(Summary {
        total_income,
        total_expense,
        balance: total_income - total_expense,
    })
}

/// Map a database row to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        type_: row.get(3)?,
        category: row.get(4)?,
        description: row.get(5)?,
        date: get_stored_date(row, 6)?,
        created_at: get_stored_date(row, 7)?,
        updated_at: get_stored_date(row, 8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
