//! Bearer token service.
//!
//! Tokens are HS256 JWTs carrying the user id and role. Login and
//! registration live in the identity service; this crate only verifies
//! tokens, and mints them for the CLI and tests.

mod error;

pub use error::AuthError;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use ekart_core::{UserId, UserRole};

/// Lifetime of issued tokens when none is given.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::days(7);

/// Claims stored in a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: UserId,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let secret = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Mint a token for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Issue` if signing fails.
    pub fn issue(&self, user_id: UserId, role: UserRole) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Issue(e.to_string()))
    }

    /// Validate a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ExpiredToken` or `AuthError::InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
