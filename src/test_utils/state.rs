use rusqlite::Connection;

use crate::{AppState, Email, PasswordHash, User, ValidatedPassword, user::create_user};

/// A password that is strong enough to pass registration.
pub(crate) const TEST_PASSWORD: &str = "averysafeandsecurepassword";

/// An app state with an in-memory database and a cheap password hash cost.
pub(crate) fn get_test_app_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    AppState::new(connection, "foobar", "Etc/UTC")
        .expect("Could not create app state")
        .with_password_hash_cost(4)
}

/// Register `username` with the password [TEST_PASSWORD].
pub(crate) fn insert_test_user(state: &AppState, username: &str) -> User {
    let password_hash = PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4)
        .expect("Could not hash test password");
    let connection = state.db_connection.lock().unwrap();

    create_user(
        username,
        &Email::new_unchecked(&format!("{username}@example.com")),
        password_hash,
        &connection,
    )
    .expect("Could not create test user")
}
