//! Dashboard module
//!
//! Provides an overview page with the user's balance, charts of their
//! transactions by month and category, and their most recent transactions.

mod cards;
mod charts;
mod handlers;
mod tables;

pub use handlers::get_dashboard_page;
