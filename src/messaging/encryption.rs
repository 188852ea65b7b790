//! Symmetric encryption used for envelope payloads and fields.
//!
//! Ciphertext is base64 (standard alphabet) of `nonce || sealed bytes`, so it
//! can be carried inside a JSON string.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};

use super::errors::{MessagingError, MessagingResult};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Encryption contract consumed by the envelope builder and the vault
pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &str, key: &[u8]) -> MessagingResult<String>;
    fn decrypt(&self, ciphertext: &str, key: &[u8]) -> MessagingResult<String>;
}

/// AES-256-GCM with a random 96-bit nonce per call
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    pub fn new() -> Self {
        Self
    }

    fn cipher_for(key: &[u8]) -> MessagingResult<Aes256Gcm> {
        if key.len() != KEY_LEN {
            return Err(MessagingError::encryption(format!(
                "key must be {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)))
    }

    /// Generate a fresh random 256-bit key
    pub fn generate_key() -> Vec<u8> {
        Aes256Gcm::generate_key(&mut OsRng).to_vec()
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str, key: &[u8]) -> MessagingResult<String> {
        let cipher = Self::cipher_for(key)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let sealed = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| MessagingError::encryption(e.to_string()))?;

        let mut output = Vec::with_capacity(NONCE_LEN + sealed.len());
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&sealed);
        Ok(general_purpose::STANDARD.encode(output))
    }

    fn decrypt(&self, ciphertext: &str, key: &[u8]) -> MessagingResult<String> {
        let cipher = Self::cipher_for(key).map_err(|e| MessagingError::decryption(e.to_string()))?;

        let raw = general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| MessagingError::decryption(format!("invalid base64: {e}")))?;
        if raw.len() <= NONCE_LEN {
            return Err(MessagingError::decryption("ciphertext too short"));
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|e| MessagingError::decryption(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| MessagingError::decryption(e.to_string()))
    }
}
