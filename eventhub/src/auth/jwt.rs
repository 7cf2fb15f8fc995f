//! HS256 access token verification.
//!
//! Tokens are issued by the identity provider; `sub` carries the user id.
//! [`JwtVerifier::issue`] exists for local tooling and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use seatledger_core::types::UserId;
use seatledger_web::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// Issued at (unix seconds)
    #[serde(default)]
    pub iat: i64,
}

/// Why a request could not be authenticated.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No `Authorization` header
    #[error("Missing authorization header")]
    MissingToken,

    /// Header present but not `Bearer <token>`
    #[error("Invalid authorization format. Expected 'Bearer <token>'")]
    MalformedHeader,

    /// Signature, expiry or encoding check failed
    #[error("Invalid access token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// `sub` is not a user id
    #[error("Token subject is not a user id: {0}")]
    InvalidSubject(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self::unauthorized(err.to_string())
    }
}

/// Verifies (and for tooling, issues) access tokens with a shared secret.
pub struct JwtVerifier {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl JwtVerifier {
    /// Verifier for HS256 tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Provider tokens carry an audience we do not pin
        validation.validate_aud = false;
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Check the token and return its user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for bad signatures or expired
    /// tokens and [`AuthError::InvalidSubject`] if `sub` is not a UUID.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Uuid::parse_str(&data.claims.sub)
            .map(UserId::from_uuid)
            .map_err(|_| AuthError::InvalidSubject(data.claims.sub))
    }

    /// Sign a token for `user_id` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if encoding fails.
    pub fn issue(&self, user_id: UserId, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
}
