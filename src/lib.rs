//! # Prunto
//!
//! Bank loan API with envelope-encrypted authentication.
//!
//! Credentials may be submitted in plaintext or wrapped in a hybrid
//! envelope: a per-request AES key encrypted under the server RSA public
//! key, plus the credential JSON encrypted under that AES key. The
//! [`crypto`] module owns the key lifecycle, the two-stage RSA unwrap
//! (OAEP with a PKCS#1 v1.5 fallback), the AES-ECB payload decryption,
//! password hashing and session tokens; the [`prunto`] module is the HTTP
//! surface that feeds them.

pub mod cli;
pub mod crypto;
pub mod prunto;
