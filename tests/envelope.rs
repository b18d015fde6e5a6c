//! End-to-end envelope flow against a freshly generated key ring: a
//! client encrypts credentials with the published public key, the server
//! opens the envelope, checks the password and issues a session token.

use aes::{
    cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit},
    Aes256,
};
use base64ct::{Base64, Encoding};
use prunto::{
    crypto::{hybrid::BLOCK_SIZE, keys::KeyRing, password, session::SessionIssuer},
    prunto::handlers::{open_envelope, EncryptedEnvelope},
};
use rand::{rngs::OsRng, RngCore};
use rsa::{pkcs8::DecodePublicKey, Oaep, Pkcs1v15Encrypt, RsaPublicKey};
use secrecy::SecretString;
use serde_json::json;
use sha2::Sha256;

fn ecb_encrypt(key: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let pad = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
    let mut data = plaintext.to_vec();
    data.extend(std::iter::repeat(pad as u8).take(pad));

    let cipher = Aes256::new(GenericArray::from_slice(key));
    for block in data.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }

    data
}

/// Build the envelope exactly as a client would, using only the public
/// PEM the server publishes.
fn seal(public_pem: &str, payload: &serde_json::Value, oaep: bool) -> EncryptedEnvelope {
    let public_key = RsaPublicKey::from_public_key_pem(public_pem).unwrap();

    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    let key_material = Base64::encode_string(&key).into_bytes();

    let encrypted_key = if oaep {
        public_key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &key_material)
            .unwrap()
    } else {
        public_key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, &key_material)
            .unwrap()
    };

    let encrypted_payload = ecb_encrypt(&key, payload.to_string().as_bytes());

    EncryptedEnvelope {
        encrypted_payload: Base64::encode_string(&encrypted_payload),
        encrypted_key: Base64::encode_string(&encrypted_key),
    }
}

fn issuer() -> SessionIssuer {
    SessionIssuer::new(
        &SecretString::from("an-adequately-long-test-signing-secret".to_string()),
        1800,
    )
}

#[test]
fn oaep_envelope_for_known_user_yields_valid_token() {
    let dir = tempfile::tempdir().unwrap();
    let keys = KeyRing::load_or_generate(dir.path()).unwrap();

    let payload = json!({"email": "ada@example.com", "password": "hunter22"});
    let envelope = seal(keys.public_key_pem(), &payload, true);

    let decrypted = open_envelope(&keys, &envelope).unwrap();
    let email = decrypted["email"].as_str().unwrap();
    let submitted = decrypted["password"].as_str().unwrap();

    // Registration-time state.
    let stored_hash = password::hash("hunter22").unwrap();

    assert_eq!(email, "ada@example.com");
    assert!(password::verify(submitted, &stored_hash).unwrap());

    let sessions = issuer();
    let token = sessions.issue(email).unwrap();
    assert_eq!(sessions.verify(&token).unwrap(), "ada@example.com");
}

#[test]
fn pkcs1v15_envelope_decrypts_through_the_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let keys = KeyRing::load_or_generate(dir.path()).unwrap();

    let payload = json!({"email": "ada@example.com", "password": "hunter22"});
    let envelope = seal(keys.public_key_pem(), &payload, false);

    let decrypted = open_envelope(&keys, &envelope).unwrap();
    assert_eq!(decrypted["password"].as_str().unwrap(), "hunter22");
}

#[test]
fn wrong_stored_password_fails_at_the_credential_stage() {
    let dir = tempfile::tempdir().unwrap();
    let keys = KeyRing::load_or_generate(dir.path()).unwrap();

    let payload = json!({"email": "ada@example.com", "password": "hunter22"});
    let envelope = seal(keys.public_key_pem(), &payload, true);

    // The envelope itself opens fine; only the credential check fails.
    let decrypted = open_envelope(&keys, &envelope).unwrap();
    let submitted = decrypted["password"].as_str().unwrap();

    let stored_hash = password::hash("a-different-password").unwrap();
    assert!(!password::verify(submitted, &stored_hash).unwrap());
}
