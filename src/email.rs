//! A validated email address.

use std::fmt::Display;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};

use crate::Error;

/// The maximum number of characters allowed in an email address.
pub const MAX_EMAIL_LENGTH: usize = 100;

/// An email address that has been checked for the correct format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Create and validate an email address.
    ///
    /// Leading and trailing whitespace is removed before validation.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidEmail] if `raw_email` is not a valid email
    /// address or is longer than [MAX_EMAIL_LENGTH].
    pub fn new(raw_email: &str) -> Result<Self, Error> {
        let raw_email = raw_email.trim();

        if raw_email.chars().count() > MAX_EMAIL_LENGTH || !EmailAddress::is_valid(raw_email) {
            return Err(Error::InvalidEmail(raw_email.to_owned()));
        }

        Ok(Self(raw_email.to_owned()))
    }

    /// Create an email address without any validation.
    ///
    /// The caller should ensure that `raw_email` is a correctly formatted
    /// email address, e.g. because it was read back from the database.
    pub fn new_unchecked(raw_email: &str) -> Self {
        Self(raw_email.to_owned())
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
