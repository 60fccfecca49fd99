//! OAuth token endpoint calls: client-credentials and refresh-token grants.

use super::TokenState;
use crate::error::{PullError, Result};
use crate::http::RetryingClient;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

/// Response to a client-credentials grant
#[derive(Deserialize, Debug)]
struct ClientCredentialsResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: String,
    refresh_expires_in: i64,
}

/// Response to a refresh-token grant. The refresh token is not rotated.
#[derive(Deserialize, Debug)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

/// Client for `POST oauth2/token`.
///
/// All requests go through [`RetryingClient`] and authenticate the client
/// with a Basic header built from the client id and secret.
#[derive(Debug)]
pub struct OAuthClient {
    http: RetryingClient,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl OAuthClient {
    pub fn new(
        http: RetryingClient,
        token_url: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http,
            token_url,
            client_id,
            client_secret,
        }
    }

    /// Authenticates from scratch and returns a full token state.
    pub async fn client_credentials(&self) -> Result<TokenState> {
        let response: ClientCredentialsResponse =
            self.post(&[("grant_type", "client_credentials")]).await?;

        let now = Utc::now();
        Ok(TokenState {
            access_token: response.access_token,
            access_expires_at: expires_at(now, response.expires_in)?,
            refresh_token: response.refresh_token,
            refresh_expires_at: expires_at(now, response.refresh_expires_in)?,
        })
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// The returned state keeps `current`'s refresh token and its expiry.
    pub async fn refresh(&self, current: &TokenState) -> Result<TokenState> {
        let response: RefreshResponse = self
            .post(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .await?;

        Ok(TokenState {
            access_token: response.access_token,
            access_expires_at: expires_at(Utc::now(), response.expires_in)?,
            refresh_token: current.refresh_token.clone(),
            refresh_expires_at: current.refresh_expires_at,
        })
    }

    async fn post<T: DeserializeOwned>(&self, form: &[(&str, &str)]) -> Result<T> {
        let grant = form.first().map(|(_, v)| *v).unwrap_or_default();
        debug!(url = %self.token_url, grant_type = grant, "OAuth token request");

        let request = self
            .http
            .inner()
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .header(
                AUTHORIZATION,
                basic_credentials(&self.client_id, &self.client_secret),
            )
            .form(form);

        let response = self.http.send(request).await.map_err(|e| {
            if e.is_redirect() {
                error!(url = %self.token_url, "Too many redirects. Check the URL");
            }
            PullError::Authentication(format!("token request to {} failed: {}", self.token_url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PullError::Authentication(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PullError::Authentication(format!("malformed token response: {}", e)))
    }
}

/// `now + seconds`, rejecting lifetimes that are negative or out of range.
fn expires_at(now: DateTime<Utc>, seconds: i64) -> Result<DateTime<Utc>> {
    if seconds < 0 {
        return Err(PullError::Authentication(format!(
            "malformed token response: negative expiry {}",
            seconds
        )));
    }
    Duration::try_seconds(seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            PullError::Authentication("malformed token response: expiry out of range".to_string())
        })
}

/// `Basic base64(client_id:client_secret)`
pub(crate) fn basic_credentials(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        BASE64.encode(format!("{}:{}", client_id, client_secret))
    )
}
