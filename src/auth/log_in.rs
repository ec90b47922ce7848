//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The lower level cookie and token logic lives in the sibling modules.

use std::sync::{Arc, Mutex};

use axum::{
    Form, Json,
    extract::{FromRef, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::{
        JwtKeys, REMEMBER_ME_COOKIE_DURATION,
        cookie::{invalidate_session_cookie, set_session_cookie},
        normalize_redirect_url,
        throttle::{is_throttled, record_failed_log_in},
        token::encode_token,
    },
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, LINK_STYLE, base, loading_spinner, log_in_register, password_input, text_input},
    user::{User, get_user_by_username},
};

/// The message shown for an unknown username or a wrong password.
pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid credentials";

fn log_in_form(
    username: &str,
    error_message: Option<&str>,
    redirect_url: Option<&str>,
) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN)
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (text_input("username", "Username", "text", username, None))

            (password_input("password", "Password", "", error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                a href=(endpoints::REGISTER_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Register here"
                }
            }
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    match raw_url.and_then(normalize_redirect_url) {
        Some(redirect_url) => Some(redirect_url),
        None => {
            if let Some(redirect_url) = raw_url {
                tracing::warn!("Invalid redirect URL from {source}: {redirect_url}");
            }
            None
        }
    }
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", None, redirect_url.as_deref());
    let content = log_in_register("Log in to your account", &log_in_form);
    base("Log In", &[], &content).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The keys for signing API tokens.
    pub jwt_keys: JwtKeys,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            jwt_keys: state.jwt_keys.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// Check `username` and `password` against the registered users.
///
/// Every failed attempt is recorded, and once a username has too many recent
/// failures further attempts are rejected without checking the password.
///
/// # Errors
///
/// Returns a:
/// - [Error::TooManyLogInAttempts] if the username is being throttled,
/// - [Error::InvalidCredentials] if the username is unknown or the password is wrong,
/// - [Error::HashingError] if the password could not be checked,
/// - [Error::SqlError] if there was a database error.
pub(crate) fn verify_credentials(
    username: &str,
    password: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<User, Error> {
    if is_throttled(username, now, connection)? {
        tracing::warn!("Rejected log-in for throttled username {username:?}");
        return Err(Error::TooManyLogInAttempts);
    }

    let user = match get_user_by_username(username, connection) {
        Ok(user) => Some(user),
        Err(Error::NotFound) => None,
        Err(error) => return Err(error),
    };

    let is_password_valid = match &user {
        Some(user) => user
            .password_hash
            .verify(password)
            .map_err(|error| Error::HashingError(error.to_string()))?,
        None => false,
    };

    match user {
        Some(user) if is_password_valid => Ok(user),
        _ => {
            record_failed_log_in(username, now, connection)?;
            Err(Error::InvalidCredentials)
        }
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie set and the client is redirected to the dashboard page.
/// Otherwise, the form is returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let username = user_data.username.trim();

    let result = match state.db_connection.lock() {
        Ok(connection) => verify_credentials(
            username,
            &user_data.password,
            OffsetDateTime::now_utc(),
            &connection,
        ),
        Err(_) => Err(Error::DatabaseLockError),
    };

    let user = match result {
        Ok(user) => user,
        Err(Error::InvalidCredentials) => {
            return log_in_form(username, Some(INVALID_CREDENTIALS_ERROR_MSG), redirect_url)
                .into_response();
        }
        Err(Error::TooManyLogInAttempts) => {
            return log_in_form(
                username,
                Some(&Error::TooManyLogInAttempts.client_message()),
                redirect_url,
            )
            .into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return log_in_form(
                username,
                Some("An internal error occurred. Please try again later."),
                redirect_url,
            )
            .into_response();
        }
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let redirect_url = redirect_url.unwrap_or(endpoints::DASHBOARD_VIEW);

    set_session_cookie(jar.clone(), &user, cookie_duration)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(redirect_url.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting auth cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_session_cookie(jar),
            )
        })
        .into_response()
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password in the database, which has been verified.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Username entered during log-in.
    pub username: String,

    /// Password entered during log-in.
    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    /// Only accepted from the log-in form submission.
    pub redirect_url: Option<String>,
}

/// The JSON body of an API log-in request.
#[derive(Clone, Deserialize)]
pub struct LogInRequest {
    /// The username to log in as.
    pub username: String,
    /// The user's password.
    pub password: String,
}

/// Handler for JSON log-in requests.
///
/// Responds with `{"token": "<token>"}` for valid credentials, otherwise a
/// JSON error.
pub async fn post_log_in_api(
    State(state): State<LoginState>,
    body: Result<Json<LogInRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return Error::InvalidRequest(rejection.body_text()).into_json_response(),
    };
    let now = OffsetDateTime::now_utc();

    let result = match state.db_connection.lock() {
        Ok(connection) => {
            verify_credentials(request.username.trim(), &request.password, now, &connection)
        }
        Err(_) => Err(Error::DatabaseLockError),
    };

    match result.and_then(|user| encode_token(&user, now, &state.jwt_keys)) {
        Ok(token) => Json(json!({ "token": token })).into_response(),
        Err(error) => error.into_json_response(),
    }
}


#[cfg(test)]
mod log_in_tests {
    use axum::{
        Form, Router,
        body::Body,
        extract::{FromRef, State},
        http::{Response, StatusCode},
        routing::post,
    };
    use axum_extra::extract::PrivateCookieJar;
    use axum_test::TestServer;
    use serde_json::json;
    use time::{Duration, OffsetDateTime};

    use crate::{
        AppState,
        auth::{REMEMBER_ME_COOKIE_DURATION, cookie::COOKIE_SESSION, throttle::MAX_FAILED_LOG_INS},
        endpoints,
        test_utils::{
            TEST_PASSWORD, assert_form_error_message, assert_hx_redirect, get_test_app_state,
            insert_test_user, must_get_form, parse_html_fragment,
        },
    };

    use super::{INVALID_CREDENTIALS_ERROR_MSG, LogInData, LoginState, post_log_in, post_log_in_api};

    fn log_in_data(username: &str, password: &str) -> LogInData {
        LogInData {
            username: username.to_owned(),
            password: password.to_owned(),
            remember_me: None,
            redirect_url: None,
        }
    }

    async fn new_log_in_request(state: &AppState, log_in_form: LogInData) -> Response<Body> {
        let state = LoginState::from_ref(state);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        post_log_in(State(state), jar, Form(log_in_form)).await
    }

    fn get_test_server(state: AppState) -> TestServer {
        let app = Router::new()
            .route(endpoints::LOG_IN, post(post_log_in))
            .route(endpoints::LOG_IN_API, post(post_log_in_api))
            .with_state(state);

        TestServer::new(app)
    }

    /// Asserts that two date times are within two seconds of each other.
    macro_rules! assert_date_time_close {
        ($left:expr, $right:expr$(,)?) => {
            assert!(
                ($left - $right).abs() < Duration::seconds(2),
                "got date time {:?}, want {:?}",
                $left,
                $right
            );
        };
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let state = get_test_app_state();
        insert_test_user(&state, "alice");

        let response = new_log_in_request(&state, log_in_data("alice", TEST_PASSWORD)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
        assert!(
            response
                .headers()
                .get_all("set-cookie")
                .iter()
                .any(|cookie| cookie.to_str().unwrap().starts_with(COOKIE_SESSION)),
            "want a session cookie to be set"
        );
    }

    #[tokio::test]
    async fn log_in_redirects_to_requested_url() {
        let state = get_test_app_state();
        insert_test_user(&state, "alice");
        let mut form = log_in_data("alice", TEST_PASSWORD);
        form.redirect_url = Some("/dashboard?foo=bar".to_owned());

        let response = new_log_in_request(&state, form).await;

        assert_hx_redirect(&response, "/dashboard?foo=bar");
    }

    #[tokio::test]
    async fn log_in_falls_back_on_invalid_redirect_url() {
        let state = get_test_app_state();
        insert_test_user(&state, "alice");
        let mut form = log_in_data("alice", TEST_PASSWORD);
        form.redirect_url = Some("https://example.com".to_owned());

        let response = new_log_in_request(&state, form).await;

        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn log_in_fails_with_incorrect_password() {
        let state = get_test_app_state();
        insert_test_user(&state, "alice");

        let response = new_log_in_request(&state, log_in_data("alice", "wrongpassword")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let fragment = parse_html_fragment(response).await;
        assert_form_error_message(&must_get_form(&fragment), INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_username() {
        let state = get_test_app_state();

        let response = new_log_in_request(&state, log_in_data("nobody", TEST_PASSWORD)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let fragment = parse_html_fragment(response).await;
        assert_form_error_message(&must_get_form(&fragment), INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_is_throttled_after_repeated_failures() {
        let state = get_test_app_state();
        insert_test_user(&state, "alice");

        for _ in 0..MAX_FAILED_LOG_INS {
            new_log_in_request(&state, log_in_data("alice", "wrongpassword")).await;
        }
        let response = new_log_in_request(&state, log_in_data("alice", TEST_PASSWORD)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let fragment = parse_html_fragment(response).await;
        assert_form_error_message(
            &must_get_form(&fragment),
            "Too many failed login attempts. Please try again later",
        );
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_credentials() {
        let server = get_test_server(get_test_app_state());

        server
            .post(endpoints::LOG_IN)
            .content_type("application/x-www-form-urlencoded")
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn remember_me_extends_auth_cookie_through_form() {
        let state = get_test_app_state();
        insert_test_user(&state, "alice");
        let server = get_test_server(state);
        let form = [
            ("username", "alice"),
            ("password", TEST_PASSWORD),
            ("remember_me", "on"),
        ];

        let response = server.post(endpoints::LOG_IN).form(&form).await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        let session_cookie = response.cookie(COOKIE_SESSION);
        assert_date_time_close!(
            session_cookie.expires_datetime().unwrap(),
            OffsetDateTime::now_utc() + REMEMBER_ME_COOKIE_DURATION
        );
    }

    #[tokio::test]
    async fn api_log_in_returns_token() {
        let state = get_test_app_state();
        insert_test_user(&state, "alice");
        let server = get_test_server(state);

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({ "username": "alice", "password": TEST_PASSWORD }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert!(
            body["token"].as_str().is_some_and(|token| !token.is_empty()),
            "want a token, got {body}"
        );
    }

    #[tokio::test]
    async fn api_log_in_rejects_wrong_password() {
        let state = get_test_app_state();
        insert_test_user(&state, "alice");
        let server = get_test_server(state);

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({ "username": "alice", "password": "wrongpassword" }))
            .await;

        response.assert_status_unauthorized();
        response.assert_json(&json!({ "error": "Invalid credentials" }));
    }

    #[tokio::test]
    async fn api_log_in_is_throttled() {
        let state = get_test_app_state();
        insert_test_user(&state, "alice");
        let server = get_test_server(state);

        for _ in 0..MAX_FAILED_LOG_INS {
            server
                .post(endpoints::LOG_IN_API)
                .json(&json!({ "username": "alice", "password": "wrongpassword" }))
                .await
                .assert_status_unauthorized();
        }
        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({ "username": "alice", "password": TEST_PASSWORD }))
            .await;

        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        response.assert_json(&json!({
            "error": "Too many failed login attempts. Please try again later"
        }));
    }

    #[tokio::test]
    async fn api_log_in_rejects_malformed_json() {
        let server = get_test_server(get_test_app_state());

        let response = server
            .post(endpoints::LOG_IN_API)
            .json(&json!({ "username": "alice" }))
            .await;

        response.assert_status_bad_request();
    }
}
