//! At-rest encryption for any [`KvStore`] using AES-256-GCM.
//!
//! - Storage key derived from a passphrase using PBKDF2-HMAC-SHA256
//! - Each write uses a fresh random IV
//! - Authenticated encryption: a tampered or foreign value fails to decrypt
//!   and is reported as [`StoreError::Corrupt`]

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::KvStore;
use crate::{Result, StoreError};

/// Number of PBKDF2 iterations for key derivation
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const STORAGE_SALT: &[u8] = b"Storefront_Storage_Salt_v1";

/// Envelope written to the inner store in place of the plaintext value
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncryptedValue {
    /// Base64 of the 12-byte AES-GCM IV
    iv: String,
    /// Base64 of the ciphertext
    ciphertext: String,
}

/// Encrypting wrapper around another storage backend.
pub struct EncryptedKv<K> {
    inner: K,
    key: [u8; 32],
}

impl<K: KvStore> EncryptedKv<K> {
    pub fn new(inner: K, passphrase: &str) -> Self {
        Self::with_iterations(inner, passphrase, PBKDF2_ITERATIONS)
    }

    pub fn with_iterations(inner: K, passphrase: &str, iterations: u32) -> Self {
        Self {
            inner,
            key: derive_storage_key(passphrase, iterations),
        }
    }

    pub fn inner(&self) -> &K {
        &self.inner
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| StoreError::Crypto(format!("failed to create cipher: {e}")))
    }

    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut iv = [0u8; 12];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|e| StoreError::Crypto(format!("encryption failed: {e}")))?;

        let envelope = EncryptedValue {
            iv: STANDARD.encode(iv),
            ciphertext: STANDARD.encode(ciphertext),
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    fn decrypt(&self, key: &str, raw: &str) -> Result<String> {
        let corrupt = |reason: String| StoreError::Corrupt {
            key: key.to_string(),
            reason,
        };

        let envelope: EncryptedValue = serde_json::from_str(raw)
            .map_err(|e| corrupt(format!("not an encrypted value: {e}")))?;
        let iv = STANDARD
            .decode(&envelope.iv)
            .map_err(|e| corrupt(format!("bad iv: {e}")))?;
        if iv.len() != 12 {
            return Err(corrupt(format!("iv must be 12 bytes, got {}", iv.len())));
        }
        let ciphertext = STANDARD
            .decode(&envelope.ciphertext)
            .map_err(|e| corrupt(format!("bad ciphertext: {e}")))?;

        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| corrupt("decryption failed".to_string()))?;

        String::from_utf8(plaintext).map_err(|_| corrupt("plaintext was not UTF-8".to_string()))
    }
}

#[async_trait]
impl<K: KvStore> KvStore for EncryptedKv<K> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.inner.get(key).await? {
            Some(raw) => self.decrypt(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let sealed = self.encrypt(&value)?;
        self.inner.set(key, sealed).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }
}

/// Derive a 256-bit storage key from a passphrase
pub fn derive_storage_key(passphrase: &str, iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), STORAGE_SALT, iterations, &mut key);
    key
}
