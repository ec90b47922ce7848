//! Income and expense transactions.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the validation of new transactions
//! - Database functions for storing, listing and summarising transactions
//! - The JSON API handlers and the dashboard's "Add transaction" form

mod api;
mod core;
mod form;

pub use api::{create_transaction_api, get_report_api, get_summary_api, list_transactions_api};
pub use core::{
    Summary, Transaction, TransactionType, create_transaction_table, get_summary,
    list_transaction_records, list_transactions, parse_date,
};
pub use form::{TransactionFormValues, create_transaction_endpoint, transaction_form};

#[cfg(test)]
pub use core::{NewTransaction, create_transaction};
