//! Signed tokens for authenticating JSON API requests.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, UserID, auth::Session, user::User};

/// How long an API token is valid for after it is issued.
pub(crate) const TOKEN_DURATION: Duration = Duration::hours(24);

/// The claims encoded in an API token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Claims {
    /// The ID of the user the token was issued to.
    pub user_id: UserID,
    /// The username of the user the token was issued to.
    pub username: String,
    /// When the token was issued, as a Unix timestamp.
    pub iat: i64,
    /// When the token expires, as a Unix timestamp.
    pub exp: i64,
}

impl TryFrom<Claims> for Session {
    type Error = Error;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let expires_at =
            OffsetDateTime::from_unix_timestamp(claims.exp).map_err(|_| Error::InvalidToken)?;

        Ok(Session {
            user_id: claims.user_id,
            username: claims.username,
            expires_at,
        })
    }
}

/// The keys used to sign and verify API tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    /// Create HMAC keys from `secret`.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtKeys { .. }")
    }
}

/// Create a token for `user` that expires [TOKEN_DURATION] after `now`.
///
/// # Errors
///
/// Returns [Error::TokenCreation] if the token could not be signed.
pub(crate) fn encode_token(
    user: &User,
    now: OffsetDateTime,
    keys: &JwtKeys,
) -> Result<String, Error> {
    let claims = Claims {
        user_id: user.id,
        username: user.username.clone(),
        iat: now.unix_timestamp(),
        exp: (now + TOKEN_DURATION).unix_timestamp(),
    };

    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        .map_err(|error| Error::TokenCreation(error.to_string()))
}

/// Verify the signature and expiry of `token` and get its session.
///
/// # Errors
///
/// Returns [Error::InvalidToken] if the token is malformed, was not signed
/// with `keys` or has expired.
pub(crate) fn decode_token(token: &str, keys: &JwtKeys) -> Result<Session, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let claims = decode::<Claims>(token, &keys.decoding, &validation)
        .map_err(|error| {
            tracing::debug!("Rejected API token: {error}");
            Error::InvalidToken
        })?
        .claims;

    claims.try_into()
}
