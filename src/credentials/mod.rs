//! OAuth token lifecycle for the vendor API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       TokenManager                       │
//! │  - ensure_valid_token()                  │
//! │  - reuse / refresh / re-authenticate     │
//! └─────────────────────────────────────────┘
//!          ↓                    ↓
//! ┌──────────────────┐  ┌──────────────────┐
//! │   OAuthClient    │  │   TokenStore     │
//! │ client_credentials│  │ gzip JSON file   │
//! │ refresh_token    │  │ optional AES-GCM │
//! └──────────────────┘  └──────────────────┘
//! ```
//!
//! Every token obtained from the server is written to the token file before
//! it is handed out, so the next run starts from the freshest state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod encryption;
mod exchange;
mod manager;
mod storage;


pub use encryption::{SealedValue, TokenCipher};
pub use exchange::OAuthClient;
pub use manager::{TokenAction, TokenManager};
pub use storage::TokenStore;

/// Access and refresh tokens with their expiry instants (UTC).
///
/// `refresh_expires_at >= access_expires_at` is expected but not enforced.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    /// Bearer token for API requests
    pub access_token: String,

    /// When the access token stops being accepted
    pub access_expires_at: DateTime<Utc>,

    /// Used to obtain a new access token without client credentials
    pub refresh_token: String,

    /// When the refresh token stops being accepted
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenState {
    /// True while `now` is strictly before the access token expiry.
    pub fn access_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.access_expires_at
    }

    /// True while `now` is strictly before the refresh token expiry.
    pub fn refresh_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.refresh_expires_at
    }
}

// Tokens stay out of logs and panic messages.
impl std::fmt::Debug for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &"<redacted>")
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_token", &"<redacted>")
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}
