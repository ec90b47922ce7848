//! The endpoint URIs for pages, form submissions and the JSON API.

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/login";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";

/// The route the log-in form is submitted to.
pub const LOG_IN: &str = "/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/log_out";
/// The route the registration form is submitted to.
pub const USERS: &str = "/users";
/// The route the dashboard's add transaction form is submitted to.
pub const TRANSACTIONS: &str = "/transactions";

/// The JSON route for registering a user.
pub const REGISTER_API: &str = "/api/register";
/// The JSON route for getting an API token.
pub const LOG_IN_API: &str = "/api/login";
/// The JSON route for creating and listing transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The JSON route for the income, expense and balance totals.
pub const TRANSACTIONS_SUMMARY_API: &str = "/api/transactions/summary";
/// The JSON route for the monthly and category report.
pub const TRANSACTIONS_REPORT_API: &str = "/api/transactions/report";
