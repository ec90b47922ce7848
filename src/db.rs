//! Creates the application's database tables.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    auth::create_failed_log_in_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// Create all of the tables used by the application if they do not already exist.
///
/// The tables are created inside a single exclusive transaction, so either
/// every table is created or none are.
///
/// # Errors
/// Returns an error if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_failed_log_in_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
