//! Credential vault
//!
//! Symmetric encryption for configuration payloads. The 256-bit key is read
//! from the secret store; on first use it is generated from the OS CSPRNG and
//! persisted back. Blobs are `base64(nonce ‖ ciphertext‖tag)` with a fresh
//! 12-byte nonce per encryption.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

use super::keychain::{SecretStore, VAULT_KEY_ACCOUNT};
use crate::error::Error;

/// Vault key length (AES-256)
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length
pub const NONCE_LEN: usize = 12;

/// Payload encryption with a key sourced from the secret store.
pub struct Vault {
    key: [u8; KEY_LEN],
}

impl Vault {
    /// Acquire the vault key from the secret store, generating and persisting
    /// a new one when absent. Store I/O failure on either path is fatal.
    pub fn open(store: &dyn SecretStore) -> Result<Self, Error> {
        let key = match store.get(VAULT_KEY_ACCOUNT)? {
            Some(encoded) => {
                let bytes = BASE64
                    .decode(encoded.trim())
                    .map_err(|e| Error::Crypto(format!("stored key is not base64: {}", e)))?;
                <[u8; KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
                    Error::Crypto(format!(
                        "stored key has wrong length: {} bytes",
                        bytes.len()
                    ))
                })?
            }
            None => {
                let mut key = [0u8; KEY_LEN];
                OsRng.fill_bytes(&mut key);
                store.set(VAULT_KEY_ACCOUNT, &BASE64.encode(key))?;
                tracing::info!("generated new vault key and persisted it to the secret store");
                key
            }
        };
        Ok(Self { key })
    }

    /// Build a vault around a caller-supplied key, bypassing the secret store.
    pub fn from_key(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Encrypt a payload. Output is `base64(nonce ‖ ciphertext‖tag)`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, Error> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| Error::Crypto(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| Error::Crypto("encryption failed".into()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    /// Decrypt a blob produced by [`Vault::encrypt`]. Fails with a crypto
    /// error on malformed base64, a blob shorter than the nonce, or an
    /// authentication-tag mismatch; never yields partial plaintext.
    pub fn decrypt(&self, blob: &str) -> Result<Vec<u8>, Error> {
        let data = BASE64
            .decode(blob.trim())
            .map_err(|e| Error::Crypto(format!("malformed ciphertext: {}", e)))?;

        if data.len() < NONCE_LEN {
            return Err(Error::Crypto("ciphertext too short".into()));
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| Error::Crypto(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| Error::Crypto("authentication failed".into()))
    }
}
