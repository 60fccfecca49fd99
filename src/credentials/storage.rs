//! Token state persisted in a local file.
//!
//! The file is gzip-compressed JSON (see [`crate::state_file`]). When a key is
//! configured the access and refresh tokens are sealed separately with
//! AES-256-GCM; expiry timestamps stay readable.

use super::encryption::{SealedValue, TokenCipher};
use super::TokenState;
use crate::state_file;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const TOKEN_FILE_VERSION: u32 = 1;

/// On-disk layout of the token file.
#[derive(Serialize, Deserialize)]
struct TokenRecord {
    version: u32,
    updated_at: DateTime<Utc>,
    access_token: StoredSecret,
    access_expires_at: DateTime<Utc>,
    refresh_token: StoredSecret,
    refresh_expires_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoredSecret {
    Plain { value: String },
    Sealed(SealedValue),
}

/// File-backed token storage.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    cipher: Option<TokenCipher>,
}

impl TokenStore {
    /// Creates a store for `path`; tokens are sealed when `encryption_key` is given.
    ///
    /// # Arguments
    /// * `path` - Token state file
    /// * `encryption_key` - Base64-encoded 32-byte key (optional)
    pub fn new<P: AsRef<Path>>(path: P, encryption_key: Option<&str>) -> Result<Self> {
        let cipher = encryption_key
            .map(TokenCipher::from_base64_key)
            .transpose()
            .context("Invalid encryption key")?;

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            cipher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the token file with `state`.
    pub fn save(&self, state: &TokenState) -> Result<()> {
        let record = TokenRecord {
            version: TOKEN_FILE_VERSION,
            updated_at: Utc::now(),
            access_token: self.protect(&state.access_token)?,
            access_expires_at: state.access_expires_at,
            refresh_token: self.protect(&state.refresh_token)?,
            refresh_expires_at: state.refresh_expires_at,
        };

        state_file::save(&self.path, &record).context("Failed to save token state")
    }

    /// Reads the token file.
    ///
    /// # Returns
    /// * `Ok(Some(TokenState))` - Tokens found (and decrypted)
    /// * `Ok(None)` - No token file
    /// * `Err` - Unreadable file, unsupported version, or sealed tokens that cannot be opened
    pub fn load(&self) -> Result<Option<TokenState>> {
        let record: TokenRecord = match state_file::load::<TokenRecord>(&self.path)? {
            Some(record) => record,
            None => return Ok(None),
        };

        if record.version != TOKEN_FILE_VERSION {
            return Err(anyhow!(
                "Unsupported token file version {} in {}",
                record.version,
                self.path.display()
            ));
        }

        Ok(Some(TokenState {
            access_token: self
                .reveal(record.access_token)
                .context("Failed to read access token")?,
            access_expires_at: record.access_expires_at,
            refresh_token: self
                .reveal(record.refresh_token)
                .context("Failed to read refresh token")?,
            refresh_expires_at: record.refresh_expires_at,
        }))
    }

    fn protect(&self, token: &str) -> Result<StoredSecret> {
        match &self.cipher {
            Some(cipher) => Ok(StoredSecret::Sealed(cipher.seal(token)?)),
            None => Ok(StoredSecret::Plain {
                value: token.to_string(),
            }),
        }
    }

    fn reveal(&self, secret: StoredSecret) -> Result<String> {
        match (secret, &self.cipher) {
            (StoredSecret::Plain { value }, _) => Ok(value),
            (StoredSecret::Sealed(sealed), Some(cipher)) => cipher.open(&sealed),
            (StoredSecret::Sealed(_), None) => Err(anyhow!(
                "token file is encrypted but no encryption key is configured"
            )),
        }
    }
}
