use rand::rngs::OsRng;
use rsa::{
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding},
    RsaPrivateKey, RsaPublicKey,
};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

pub const PRIVATE_KEY_FILE: &str = "private_key.pem";
pub const PUBLIC_KEY_FILE: &str = "public_key.pem";

const RSA_BITS: usize = 2048;

#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("failed to generate RSA key pair: {0}")]
    Generate(String),

    #[error("failed to encode key pair: {0}")]
    Encode(String),

    #[error("failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The server RSA key pair, loaded once at startup and shared read-only.
///
/// The private key never leaves the process; the public key is handed to
/// clients as SubjectPublicKeyInfo PEM via `/auth/public-key`.
pub struct KeyRing {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
    public_key_pem: String,
}

impl KeyRing {
    /// Load the key pair from `dir`, or generate and persist a fresh one if
    /// either PEM file is missing.
    ///
    /// The private key is written as unencrypted PKCS#8 PEM. That is the
    /// persisted-file contract existing deployments rely on; adding
    /// passphrase protection requires changing this loader in lockstep.
    ///
    /// # Errors
    ///
    /// Returns `KeyLoadError` if persisted material cannot be read or
    /// parsed, or if generation/persistence of a new pair fails. Callers
    /// treat this as fatal at startup.
    pub fn load_or_generate(dir: &Path) -> Result<Self, KeyLoadError> {
        let private_path = dir.join(PRIVATE_KEY_FILE);
        let public_path = dir.join(PUBLIC_KEY_FILE);

        if private_path.exists() && public_path.exists() {
            Self::load(&private_path, &public_path)
        } else {
            Self::generate(dir, &private_path, &public_path)
        }
    }

    fn load(private_path: &Path, public_path: &Path) -> Result<Self, KeyLoadError> {
        let private_pem = fs::read_to_string(private_path).map_err(|source| KeyLoadError::Io {
            path: private_path.to_path_buf(),
            source,
        })?;

        let private_key =
            RsaPrivateKey::from_pkcs8_pem(&private_pem).map_err(|e| KeyLoadError::Parse {
                path: private_path.to_path_buf(),
                detail: e.to_string(),
            })?;

        let public_pem = fs::read_to_string(public_path).map_err(|source| KeyLoadError::Io {
            path: public_path.to_path_buf(),
            source,
        })?;

        let public_key =
            RsaPublicKey::from_public_key_pem(&public_pem).map_err(|e| KeyLoadError::Parse {
                path: public_path.to_path_buf(),
                detail: e.to_string(),
            })?;

        info!("Loaded RSA key pair from {}", private_path.display());

        Ok(Self {
            private_key,
            public_key,
            public_key_pem: public_pem,
        })
    }

    fn generate(dir: &Path, private_path: &Path, public_path: &Path) -> Result<Self, KeyLoadError> {
        fs::create_dir_all(dir).map_err(|source| KeyLoadError::Persist {
            path: dir.to_path_buf(),
            source,
        })?;

        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_BITS)
            .map_err(|e| KeyLoadError::Generate(e.to_string()))?;

        let public_key = RsaPublicKey::from(&private_key);

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| KeyLoadError::Encode(e.to_string()))?;

        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyLoadError::Encode(e.to_string()))?;

        fs::write(private_path, private_pem.as_bytes()).map_err(|source| {
            KeyLoadError::Persist {
                path: private_path.to_path_buf(),
                source,
            }
        })?;

        fs::write(public_path, public_pem.as_bytes()).map_err(|source| KeyLoadError::Persist {
            path: public_path.to_path_buf(),
            source,
        })?;

        info!("Generated new RSA key pair in {}", dir.display());

        Ok(Self {
            private_key,
            public_key,
            public_key_pem: public_pem,
        })
    }

    #[must_use]
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    #[must_use]
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    #[must_use]
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("private_key", &"***")
            .field("public_key_pem", &self.public_key_pem)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_persists_both_pem_files() {
        let dir = tempfile::tempdir().unwrap();
        let keys = KeyRing::load_or_generate(dir.path()).unwrap();

        assert!(dir.path().join(PRIVATE_KEY_FILE).exists());
        assert!(dir.path().join(PUBLIC_KEY_FILE).exists());
        assert!(keys.public_key_pem().contains("BEGIN PUBLIC KEY"));

        let private_pem = fs::read_to_string(dir.path().join(PRIVATE_KEY_FILE)).unwrap();
        assert!(private_pem.contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn test_second_call_loads_same_pair() {
        let dir = tempfile::tempdir().unwrap();
        let first = KeyRing::load_or_generate(dir.path()).unwrap();
        let second = KeyRing::load_or_generate(dir.path()).unwrap();

        assert_eq!(first.public_key_pem(), second.public_key_pem());
        assert_eq!(first.public_key(), second.public_key());
    }

    #[test]
    fn test_corrupt_private_key_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        KeyRing::load_or_generate(dir.path()).unwrap();

        fs::write(dir.path().join(PRIVATE_KEY_FILE), "not a pem").unwrap();

        let result = KeyRing::load_or_generate(dir.path());
        assert!(matches!(result, Err(KeyLoadError::Parse { .. })));
    }

    #[test]
    fn test_missing_public_key_regenerates() {
        let dir = tempfile::tempdir().unwrap();
        let first = KeyRing::load_or_generate(dir.path()).unwrap();

        fs::remove_file(dir.path().join(PUBLIC_KEY_FILE)).unwrap();

        let second = KeyRing::load_or_generate(dir.path()).unwrap();
        assert_ne!(first.public_key_pem(), second.public_key_pem());
        assert!(dir.path().join(PUBLIC_KEY_FILE).exists());
    }
}
