pub mod health;
pub use self::health::health;

pub mod public_key;
pub use self::public_key::public_key;

pub mod user_register;
pub use self::user_register::{encrypted_register, register};

pub mod user_login;
pub use self::user_login::{encrypted_login, login};

pub mod users;
pub use self::users::get_user;

// common functions for the handlers
use crate::crypto::{
    hybrid::{self, EnvelopeError},
    keys::KeyRing,
};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

pub const PASSWORD_MIN_LENGTH: usize = 8;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

pub fn valid_password(password: &str) -> bool {
    password.len() >= PASSWORD_MIN_LENGTH
}

/// The two-part hybrid envelope submitted by clients wanting credential
/// confidentiality against a passive observer.
#[derive(ToSchema, Deserialize, Debug)]
pub struct EncryptedEnvelope {
    pub encrypted_payload: String,
    pub encrypted_key: String,
}

/// Recover the per-request symmetric key with the server private key and
/// decrypt the credential payload. The key material lives only for this
/// call; envelopes are never persisted.
///
/// # Errors
///
/// Propagates the `EnvelopeError` of whichever stage failed.
pub fn open_envelope(keys: &KeyRing, envelope: &EncryptedEnvelope) -> Result<Value, EnvelopeError> {
    let key_material = hybrid::recover_symmetric_key(keys.private_key(), &envelope.encrypted_key)?;

    hybrid::decrypt_payload(&envelope.encrypted_payload, &key_material)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("a@b.com"));
        assert!(valid_email("first.last@example.co.uk"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("spaces in@addr.com"));
    }

    #[test]
    fn test_valid_password() {
        assert!(valid_password("hunter22"));
        assert!(!valid_password("hunter2"));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
