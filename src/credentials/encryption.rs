//! AES-256-GCM sealing for persisted tokens.
//!
//! Each token is sealed separately with its own random nonce. The key is a
//! base64-encoded 32-byte value supplied through configuration and never
//! written to disk.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the encryption key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
const NONCE_SIZE: usize = 12;

/// A sealed token as stored in the token state file (both fields base64).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    pub ciphertext: String,
    pub nonce: String,
}

/// Seals and opens token strings with a fixed key.
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenCipher { .. }")
    }
}

impl TokenCipher {
    /// Builds a cipher from a base64-encoded 32-byte key.
    pub fn from_base64_key(key_base64: &str) -> Result<Self> {
        let key_bytes = BASE64
            .decode(key_base64.trim())
            .context("Failed to decode base64 encryption key")?;

        if key_bytes.len() != KEY_SIZE {
            return Err(anyhow!(
                "Encryption key must be {} bytes (256 bits), got {} bytes",
                KEY_SIZE,
                key_bytes.len()
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| anyhow!("Failed to create cipher: {}", e))?;
        Ok(Self { cipher })
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &str) -> Result<SealedValue> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        Ok(SealedValue {
            ciphertext: BASE64.encode(ciphertext),
            nonce: BASE64.encode(nonce),
        })
    }

    /// Decrypts a value produced by [`seal`](Self::seal).
    ///
    /// Fails on a wrong key, a wrong nonce or tampered ciphertext.
    pub fn open(&self, sealed: &SealedValue) -> Result<String> {
        let ciphertext = BASE64
            .decode(&sealed.ciphertext)
            .context("Failed to decode ciphertext")?;
        let nonce_bytes = BASE64.decode(&sealed.nonce).context("Failed to decode nonce")?;

        if nonce_bytes.len() != NONCE_SIZE {
            return Err(anyhow!(
                "Invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            ));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| anyhow!("Decryption failed (wrong key or corrupted data): {}", e))?;

        String::from_utf8(plaintext).context("Decrypted data is not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> String {
        BASE64.encode([byte; KEY_SIZE])
    }

    #[test]
    fn test_key_validation() {
        assert!(TokenCipher::from_base64_key(&key(0)).is_ok());
        assert!(TokenCipher::from_base64_key(&BASE64.encode([0u8; 16])).is_err());
        assert!(TokenCipher::from_base64_key("not-valid-base64!@#$").is_err());
    }

    #[test]
    fn test_seal_then_open() {
        let cipher = TokenCipher::from_base64_key(&key(7)).unwrap();
        let sealed = cipher.seal("access-token-abc").unwrap();

        assert_ne!(sealed.ciphertext, "access-token-abc");
        assert_eq!(cipher.open(&sealed).unwrap(), "access-token-abc");
    }

    #[test]
    fn test_nonces_are_unique() {
        let cipher = TokenCipher::from_base64_key(&key(7)).unwrap();
        let a = cipher.seal("same").unwrap();
        let b = cipher.seal("same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = TokenCipher::from_base64_key(&key(1))
            .unwrap()
            .seal("secret")
            .unwrap();
        let other = TokenCipher::from_base64_key(&key(2)).unwrap();
        assert!(other.open(&sealed).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = TokenCipher::from_base64_key(&key(3)).unwrap();
        let mut sealed = cipher.seal("secret").unwrap();
        sealed.ciphertext.push('X');
        assert!(cipher.open(&sealed).is_err());
    }
}
