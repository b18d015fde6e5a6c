//! Stateless session tokens: HS256-signed JWTs with a fixed TTL.
//!
//! There is no server-side session store; validity is entirely the
//! signature plus the `exp` claim at verification time.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session token has expired")]
    Expired,

    #[error("session token signature mismatch")]
    InvalidSignature,

    #[error("malformed session token: {0}")]
    Malformed(String),

    #[error("failed to issue session token: {0}")]
    Issue(String),

    #[error("system clock is before the unix epoch")]
    Clock,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// Issues and verifies session tokens with a server-held signing secret.
///
/// Constructed once at startup and shared read-only across requests.
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: u64,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(secret: &SecretString, ttl_seconds: u64) -> Self {
        let bytes = secret.expose_secret().as_bytes();

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl_seconds,
        }
    }

    /// Mint a token for the authenticated principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the clock is unusable or encoding fails.
    pub fn issue(&self, subject: &str) -> Result<String, SessionError> {
        let now = unix_now()?;

        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| SessionError::Issue(e.to_string()))
    }

    /// Verify a token and return the principal it names.
    ///
    /// # Errors
    ///
    /// `Expired` when `exp` has passed (no leeway), `InvalidSignature` on a
    /// MAC mismatch, `Malformed` when the token cannot be parsed.
    pub fn verify(&self, token: &str) -> Result<String, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                ErrorKind::InvalidSignature => SessionError::InvalidSignature,
                _ => SessionError::Malformed(e.to_string()),
            }),
        }
    }
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("secret", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

fn unix_now() -> Result<u64, SessionError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| SessionError::Clock)
}
