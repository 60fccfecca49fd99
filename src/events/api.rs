use super::EventPage;
use crate::config::join_url;
use crate::error::{PullError, Result};
use crate::stream::Stream;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::debug;

/// HTTP client for the events endpoints.
///
/// Uses a plain client: a failed page request is not retried.
#[derive(Clone, Debug)]
pub struct EventsClient {
    http_client: Client,
    base_url: String,
}

impl EventsClient {
    pub fn new(http_client: Client, base_url: String) -> Self {
        Self {
            http_client,
            base_url,
        }
    }

    /// Fetch one page of `stream` starting at checkpoint `from`.
    pub async fn get_page(
        &self,
        stream: Stream,
        from: i64,
        limit: u32,
        bearer: &str,
    ) -> Result<EventPage> {
        let url = join_url(&self.base_url, &format!("api/v3/events/{}", stream));
        debug!(url = %url, from, limit, "Requesting event page");

        let response = self
            .http_client
            .get(&url)
            .query(&[("limit", limit.to_string()), ("from", from.to_string())])
            .header(ACCEPT, "application/json")
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| PullError::Transport(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PullError::Transport(format!(
                "GET {} returned {}: {}",
                url, status, body
            )));
        }

        response
            .json::<EventPage>()
            .await
            .map_err(|e| PullError::Protocol(format!("invalid event page from {}: {}", url, e)))
    }
}
