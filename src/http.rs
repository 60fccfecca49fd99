//! HTTP client with transparent retry on connect and read failures.

use crate::config::HttpConfig;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, warn};

/// Reqwest client that retries transport failures with exponential backoff.
///
/// Only failures that never produced a response are retried (connect errors,
/// timeouts, broken connections). A response with any status code is returned
/// to the caller as-is.
#[derive(Clone, Debug)]
pub struct RetryingClient {
    client: Client,
    max_retries: u32,
    backoff_factor: f64,
}

impl RetryingClient {
    pub fn new(config: &HttpConfig) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
        })
    }

    /// The underlying client, for building requests.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Sends the request, retrying up to `max_retries` times after the first attempt.
    pub async fn send(&self, builder: RequestBuilder) -> reqwest::Result<Response> {
        let mut retry = 0;

        loop {
            // Bodies built with .form()/.json() are buffered, so cloning never fails.
            let attempt = match builder.try_clone() {
                Some(b) => b,
                None => return builder.send().await,
            };

            match attempt.send().await {
                Ok(response) => return Ok(response),
                Err(err) if retry < self.max_retries && is_retryable(&err) => {
                    retry += 1;
                    let delay = self.backoff_delay(retry);
                    warn!(
                        retry,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "HTTP request failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    debug!(retries = retry, error = %err, "HTTP request failed");
                    return Err(err);
                }
            }
        }
    }

    /// Sleep before retry `n` (1-based): `backoff_factor * 2^(n-1)` seconds.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16) as i32;
        Duration::from_secs_f64(self.backoff_factor * 2f64.powi(exponent))
    }
}

/// Plain client with the configured timeout and no retries.
pub fn build_client(config: &HttpConfig) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("saas-pull/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
}

fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request() || err.is_body()
}
