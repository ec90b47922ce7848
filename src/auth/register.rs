//! The registration page and the handlers that create new user accounts.
use std::sync::{Arc, Mutex};

use axum::{
    Form, Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState, Email, Error, PasswordHash, User, ValidatedPassword, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, base, link, loading_spinner, log_in_register, password_input,
        text_input,
    },
    user::{MAX_USERNAME_LENGTH, create_user, email_exists, username_exists},
};

/// The error messages shown under each field of the registration form.
///
/// At most one field should have an error message at a time.
#[derive(Default)]
struct RegisterFormErrors<'a> {
    username: Option<&'a str>,
    email: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

fn registration_form(username: &str, email: &str, errors: RegisterFormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #email, #password, #confirm_password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("username", "Username", "text", username, errors.username))
            (text_input("email", "Email", "email", email, errors.email))
            (password_input("password", "Password", "", errors.password))
            (password_input("confirm_password", "Confirm Password", "", errors.confirm_password))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Register"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                (link(endpoints::LOG_IN_VIEW, "Log in here"))
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form = registration_form("", "", RegisterFormErrors::default());
    let content = log_in_register("Create an account", &registration_form);
    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The bcrypt cost used when hashing new passwords.
    pub password_hash_cost: u32,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            password_hash_cost: state.password_hash_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Validate the user's details and add them to the database.
///
/// The username is trimmed before validation. The password is checked against
/// the username and email so that passwords built from them are rejected.
///
/// # Errors
///
/// Returns a:
/// - [Error::InvalidUsername] if the username is empty or too long,
/// - [Error::InvalidEmail] if the email address is invalid,
/// - [Error::TooWeak] if the password is too easy to guess,
/// - [Error::UsernameTaken] or [Error::EmailTaken] if another user already has them,
/// - [Error::HashingError] or [Error::SqlError] for unexpected failures.
pub(crate) fn register_user(
    username: &str,
    email: &str,
    password: &str,
    password_hash_cost: u32,
    connection: &Connection,
) -> Result<User, Error> {
    let username = username.trim();

    if username.is_empty() {
        return Err(Error::InvalidUsername("Username cannot be empty".to_owned()));
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(Error::InvalidUsername(format!(
            "Username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }

    let email = Email::new(email)?;
    let password = ValidatedPassword::new_with_user_inputs(password, &[username, email.as_ref()])?;

    if username_exists(username, connection)? {
        return Err(Error::UsernameTaken);
    }

    if email_exists(&email, connection)? {
        return Err(Error::EmailTaken);
    }

    let password_hash = PasswordHash::new(password, password_hash_cost)?;

    create_user(username, &email, password_hash, connection)
}

/// The data submitted by the registration form.
#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    /// The name the user will log in with.
    pub username: String,
    /// The user's email address.
    pub email: String,
    /// The user's chosen password.
    pub password: String,
    /// Must match `password`.
    pub confirm_password: String,
}

/// Handler for the registration form.
///
/// On success the client is redirected to the log-in page, otherwise the form
/// is returned with an error message under the offending field.
pub async fn post_register(
    State(state): State<RegistrationState>,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let username = user_data.username.as_str();
    let email = user_data.email.as_str();

    if user_data.password != user_data.confirm_password {
        return registration_form(
            username,
            email,
            RegisterFormErrors {
                confirm_password: Some("Passwords do not match"),
                ..Default::default()
            },
        )
        .into_response();
    }

    let result = match state.db_connection.lock() {
        Ok(connection) => register_user(
            username,
            email,
            &user_data.password,
            state.password_hash_cost,
            &connection,
        ),
        Err(_) => Err(Error::DatabaseLockError),
    };

    let error = match result {
        Ok(user) => {
            tracing::debug!("Registered user {} with ID {}", user.username, user.id);
            return (
                HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response();
        }
        Err(error) => error,
    };

    let message = error.client_message();
    let errors = match error {
        Error::InvalidUsername(_) | Error::UsernameTaken => RegisterFormErrors {
            username: Some(&message),
            ..Default::default()
        },
        Error::InvalidEmail(_) | Error::EmailTaken => RegisterFormErrors {
            email: Some(&message),
            ..Default::default()
        },
        _ => RegisterFormErrors {
            password: Some(&message),
            ..Default::default()
        },
    };

    registration_form(username, email, errors).into_response()
}

/// The JSON body of an API registration request.
#[derive(Deserialize)]
pub struct RegisterRequest {
    /// The name the user will log in with.
    pub username: String,
    /// The user's email address.
    pub email: String,
    /// The user's chosen password.
    pub password: String,
}

/// Handler for JSON registration requests.
pub async fn post_register_api(
    State(state): State<RegistrationState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return Error::InvalidRequest(rejection.body_text()).into_json_response(),
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => register_user(
            &request.username,
            &request.email,
            &request.password,
            state.password_hash_cost,
            &connection,
        ),
        Err(_) => Err(Error::DatabaseLockError),
    };

    match result {
        Ok(user) => {
            tracing::debug!("Registered user {} with ID {}", user.username, user.id);
            (
                StatusCode::CREATED,
                Json(json!({ "message": "User registered successfully" })),
            )
                .into_response()
        }
        Err(error) => error.into_json_response(),
    }
}
