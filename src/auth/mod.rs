//! User authentication: sessions, cookies, API tokens and the log-in, registration and log-out routes.

pub(crate) mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod redirect;
mod register;
mod session;
pub(crate) mod throttle;
pub(crate) mod token;

pub(crate) use cookie::{DEFAULT_COOKIE_DURATION, REMEMBER_ME_COOKIE_DURATION};
pub use log_in::{get_log_in_page, post_log_in, post_log_in_api};
pub use log_out::get_log_out;
pub use middleware::{AuthState, api_auth_guard, auth_guard, auth_guard_hx};
pub(crate) use redirect::normalize_redirect_url;
pub use register::{get_register_page, post_register, post_register_api};
pub use session::Session;
pub use throttle::create_failed_log_in_table;
pub use token::JwtKeys;
