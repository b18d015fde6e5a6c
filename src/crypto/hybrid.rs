//! Hybrid-envelope decryption: RSA-wrapped symmetric key, AES-ECB payload.
//!
//! Clients submit `{"encrypted_key", "encrypted_payload"}`: a per-request
//! AES key encrypted under the server RSA public key, and the credential
//! JSON encrypted under that AES key. The key is recovered by trying OAEP
//! (SHA-256) first and PKCS#1 v1.5 as a compatibility fallback; the payload
//! cipher is AES-ECB with PKCS#7 padding removed manually. ECB carries no
//! IV by design, to stay on the wire format of the fixed legacy client
//! encoder; it offers no semantic security across blocks.

use aes::{
    cipher::{generic_array::GenericArray, BlockDecrypt, KeyInit},
    Aes128, Aes192, Aes256,
};
use base64ct::{Base64, Encoding};
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey};
use sha2::Sha256;
use thiserror::Error;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid base64 in {field}: {detail}")]
    InvalidEncoding { field: &'static str, detail: String },

    #[error("RSA decryption failed under both padding schemes (oaep: {oaep}, pkcs1v15: {pkcs1v15})")]
    KeyRecovery { oaep: rsa::Error, pkcs1v15: rsa::Error },

    #[error("symmetric key must be 16, 24 or 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("invalid block padding: {0}")]
    Padding(&'static str),

    #[error("decrypted payload is not valid JSON: {0}")]
    PayloadFormat(#[from] serde_json::Error),
}

/// Recover the per-request symmetric key material from the RSA-encrypted
/// blob.
///
/// OAEP with SHA-256 (hash and MGF1, empty label) is attempted first; on
/// failure PKCS#1 v1.5 is tried, since deployed clients use either scheme.
/// The returned bytes are the UTF-8 text of the base64-encoded AES key, as
/// the client produced it.
///
/// # Errors
///
/// `InvalidEncoding` if the blob is not valid base64; `KeyRecovery`
/// carrying both underlying reasons when neither padding scheme succeeds.
pub fn recover_symmetric_key(
    private_key: &RsaPrivateKey,
    encrypted_key_b64: &str,
) -> Result<Vec<u8>, EnvelopeError> {
    let encrypted =
        Base64::decode_vec(encrypted_key_b64.trim()).map_err(|e| EnvelopeError::InvalidEncoding {
            field: "encrypted_key",
            detail: e.to_string(),
        })?;

    let oaep = match private_key.decrypt(Oaep::new::<Sha256>(), &encrypted) {
        Ok(key) => return Ok(key),
        Err(e) => e,
    };

    match private_key.decrypt(Pkcs1v15Encrypt, &encrypted) {
        Ok(key) => Ok(key),
        Err(pkcs1v15) => Err(EnvelopeError::KeyRecovery { oaep, pkcs1v15 }),
    }
}

/// Decrypt the envelope payload with the recovered key material and parse
/// it as JSON.
///
/// `key_material` is the output of [`recover_symmetric_key`]: the UTF-8
/// text of a base64-encoded AES key. The key is used for this one payload
/// and discarded by the caller.
///
/// # Errors
///
/// `InvalidEncoding` on malformed base64 (key material or payload),
/// `InvalidKeyLength` unless the decoded key is 16/24/32 bytes, `Padding`
/// on ciphertext that is not block-aligned or carries an out-of-range
/// padding byte, `PayloadFormat` when the plaintext is not UTF-8 JSON.
pub fn decrypt_payload(
    encrypted_payload_b64: &str,
    key_material: &[u8],
) -> Result<serde_json::Value, EnvelopeError> {
    let key_text =
        std::str::from_utf8(key_material).map_err(|e| EnvelopeError::InvalidEncoding {
            field: "symmetric_key",
            detail: e.to_string(),
        })?;

    let key = Base64::decode_vec(key_text.trim()).map_err(|e| EnvelopeError::InvalidEncoding {
        field: "symmetric_key",
        detail: e.to_string(),
    })?;

    let mut data = Base64::decode_vec(encrypted_payload_b64.trim()).map_err(|e| {
        EnvelopeError::InvalidEncoding {
            field: "encrypted_payload",
            detail: e.to_string(),
        }
    })?;

    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(EnvelopeError::Padding(
            "ciphertext length is not a positive multiple of the block size",
        ));
    }

    match key.len() {
        16 => decrypt_blocks::<Aes128>(&key, &mut data),
        24 => decrypt_blocks::<Aes192>(&key, &mut data),
        32 => decrypt_blocks::<Aes256>(&key, &mut data),
        n => return Err(EnvelopeError::InvalidKeyLength(n)),
    }

    let unpadded = strip_pkcs7(&data)?;

    Ok(serde_json::from_slice(unpadded)?)
}

fn decrypt_blocks<C: BlockDecrypt + KeyInit>(key: &[u8], data: &mut [u8]) {
    let cipher = C::new(GenericArray::from_slice(key));

    for block in data.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
}

/// Strip PKCS#7 padding: the last byte names the padding length.
///
/// # Errors
///
/// `Padding` if the input is empty, the padding length is zero, exceeds
/// the block size, or exceeds the total length. The guards keep malformed
/// ciphertext from being misread as a short plaintext.
pub fn strip_pkcs7(data: &[u8]) -> Result<&[u8], EnvelopeError> {
    let Some(&last) = data.last() else {
        return Err(EnvelopeError::Padding("empty plaintext"));
    };

    let pad = last as usize;

    if pad == 0 {
        return Err(EnvelopeError::Padding("padding length of zero"));
    }

    if pad > BLOCK_SIZE {
        return Err(EnvelopeError::Padding("padding length exceeds the block size"));
    }

    if pad > data.len() {
        return Err(EnvelopeError::Padding(
            "padding length exceeds the plaintext length",
        ));
    }

    Ok(&data[..data.len() - pad])
}
