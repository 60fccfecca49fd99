use super::{OAuthClient, TokenState, TokenStore};
use crate::error::{PullError, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// What `ensure_valid_token` had to do to produce a usable token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenAction {
    /// The in-memory or persisted access token was still valid
    Reused,
    /// A new access token was obtained with the refresh token
    Refreshed,
    /// A client-credentials grant was performed
    Authenticated,
}

/// Owns the OAuth token state for a run.
///
/// # Lifecycle
/// 1. No token in memory: load the token file, or authenticate if there is none
/// 2. Access token valid: reuse it without any network call
/// 3. Access token expired, refresh token valid: refresh grant
/// 4. Both expired: client-credentials grant
///
/// Every token obtained from the server is persisted before it is used.
pub struct TokenManager {
    oauth: OAuthClient,
    store: TokenStore,
    state: Option<TokenState>,
}

impl TokenManager {
    pub fn new(oauth: OAuthClient, store: TokenStore) -> Self {
        Self {
            oauth,
            store,
            state: None,
        }
    }

    /// Current in-memory token state, if any.
    pub fn current(&self) -> Option<&TokenState> {
        self.state.as_ref()
    }

    /// Makes sure a usable access token is available and returns it.
    pub async fn ensure_valid_token(&mut self) -> Result<&str> {
        self.ensure_valid_token_at(Utc::now()).await?;
        self.state
            .as_ref()
            .map(|s| s.access_token.as_str())
            .ok_or_else(|| PullError::Authentication("no access token available".to_string()))
    }

    /// Same as [`ensure_valid_token`](Self::ensure_valid_token) with an explicit clock.
    pub async fn ensure_valid_token_at(&mut self, now: DateTime<Utc>) -> Result<TokenAction> {
        let current = match self.state.clone() {
            Some(state) => state,
            None => match self.store.load()? {
                Some(state) => {
                    info!(path = %self.store.path().display(), "Loading saved tokens");
                    debug!(tokens = ?state, "Loaded token state");
                    state
                }
                None => {
                    info!(
                        path = %self.store.path().display(),
                        "No existing tokens found, initiating authentication"
                    );
                    let fresh = self.oauth.client_credentials().await?;
                    self.replace(fresh)?;
                    return Ok(TokenAction::Authenticated);
                }
            },
        };

        if current.access_valid_at(now) {
            debug!(
                expires_at = %current.access_expires_at,
                now = %now,
                "Access token is still valid"
            );
            self.state = Some(current);
            return Ok(TokenAction::Reused);
        }

        if current.refresh_valid_at(now) {
            info!(
                expired_at = %current.access_expires_at,
                now = %now,
                "Access token expired, using refresh token"
            );
            let refreshed = self.oauth.refresh(&current).await?;
            self.replace(refreshed)?;
            return Ok(TokenAction::Refreshed);
        }

        info!(
            refresh_expired_at = %current.refresh_expires_at,
            now = %now,
            "All tokens expired, initiating new authentication"
        );
        let fresh = self.oauth.client_credentials().await?;
        self.replace(fresh)?;
        Ok(TokenAction::Authenticated)
    }

    /// Persists `state` and makes it current.
    fn replace(&mut self, state: TokenState) -> Result<()> {
        self.store.save(&state)?;
        info!(
            access_expires_at = %state.access_expires_at,
            refresh_expires_at = %state.refresh_expires_at,
            "Token state saved"
        );
        self.state = Some(state);
        Ok(())
    }
}
