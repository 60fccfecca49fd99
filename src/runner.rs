//! One pull run: load or bootstrap checkpoints, then drain each stream in turn.

use crate::checkpoint::{bootstrap_checkpoint, CheckpointStore};
use crate::config::Config;
use crate::credentials::{OAuthClient, TokenManager, TokenStore};
use crate::error::{PullError, Result};
use crate::events::{EventFetcher, EventWriter, EventsClient, FetchOutcome};
use crate::http::{build_client, RetryingClient};
use crate::stream::Stream;
use tracing::{debug, info};

/// Per-stream results of a run, in the order streams were drained.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(Stream, FetchOutcome)>,
}

impl RunSummary {
    pub fn total_events(&self) -> usize {
        self.outcomes.iter().map(|(_, o)| o.events_written()).sum()
    }

    pub fn outcome(&self, stream: Stream) -> Option<&FetchOutcome> {
        self.outcomes
            .iter()
            .find(|(s, _)| *s == stream)
            .map(|(_, o)| o)
    }
}

/// Owns all state for a run and drives the streams sequentially.
pub struct Runner {
    streams: Vec<Stream>,
    tokens: TokenManager,
    checkpoints: CheckpointStore,
    fetcher: EventFetcher,
}

impl Runner {
    /// Validates `config` and wires up every collaborator.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let retrying = RetryingClient::new(&config.http)
            .map_err(|e| PullError::Config(format!("failed to build HTTP client: {}", e)))?;
        let plain = build_client(&config.http)
            .map_err(|e| PullError::Config(format!("failed to build HTTP client: {}", e)))?;

        let token_store = TokenStore::new(
            &config.state.token_file,
            config.state.encryption_key.as_deref(),
        )
        .map_err(|e| PullError::Config(format!("{:#}", e)))?;

        let oauth = OAuthClient::new(
            retrying,
            config.token_url(),
            config.api.client_id.clone(),
            config.api.client_secret.clone(),
        );

        Ok(Self {
            streams: config.streams()?,
            tokens: TokenManager::new(oauth, token_store),
            checkpoints: CheckpointStore::new(&config.state.checkpoint_file),
            fetcher: EventFetcher::new(
                EventsClient::new(plain, config.api.base_url.clone()),
                EventWriter::new(&config.output.directory),
            ),
        })
    }

    /// Runs one full pull cycle.
    pub async fn run(&mut self) -> Result<RunSummary> {
        if self.checkpoints.load()? {
            info!(path = %self.checkpoints.path().display(), "Checkpoint file found, values loaded");
        } else {
            info!(
                path = %self.checkpoints.path().display(),
                "Checkpoint file does not exist, fetching current checkpoints"
            );
        }

        let missing = self.checkpoints.checkpoints().missing(&self.streams);
        for stream in missing {
            bootstrap_checkpoint(
                stream,
                &mut self.tokens,
                self.fetcher.client(),
                &mut self.checkpoints,
            )
            .await?;
        }

        for (stream, checkpoint) in self.checkpoints.checkpoints().iter() {
            debug!(stream = %stream, checkpoint, "Starting checkpoint");
        }

        let mut summary = RunSummary::default();
        for &stream in &self.streams {
            let start = self.checkpoints.get(stream).ok_or_else(|| {
                PullError::Protocol(format!("no checkpoint available for {}", stream))
            })?;
            let outcome = self
                .fetcher
                .fetch_all(stream, start, &mut self.tokens, &mut self.checkpoints)
                .await?;
            summary.outcomes.push((stream, outcome));
        }

        info!(
            streams = summary.outcomes.len(),
            events = summary.total_events(),
            "All events have been fetched"
        );
        Ok(summary)
    }
}
