use super::{EventWriter, EventsClient, PAGE_SIZE};
use crate::checkpoint::CheckpointStore;
use crate::credentials::TokenManager;
use crate::error::{PullError, Result};
use crate::stream::Stream;
use tracing::{debug, info, warn};

/// How a stream's pagination ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server returned the cursor we sent: nothing new, checkpoint untouched.
    NoNewEvents { checkpoint: i64 },

    /// The server reported no remaining events; `checkpoint` was persisted.
    Drained {
        checkpoint: i64,
        pages: usize,
        events: usize,
    },

    /// The cursor stopped moving while events were still reported pending.
    /// Pages already written stay written; the stored checkpoint is untouched.
    Stalled {
        cursor: i64,
        pages: usize,
        events: usize,
    },
}

impl FetchOutcome {
    /// Number of events appended to the output file.
    pub fn events_written(&self) -> usize {
        match self {
            FetchOutcome::NoNewEvents { .. } => 0,
            FetchOutcome::Drained { events, .. } | FetchOutcome::Stalled { events, .. } => *events,
        }
    }
}

/// Drains an event stream page by page from a checkpoint.
///
/// # Pagination
/// 1. Ensure a valid token
/// 2. Request `limit = 100` events `from` the cursor
/// 3. Same cursor back → stop, nothing to ingest
/// 4. Otherwise advance the cursor and append the page's events
/// 5. `remaining_count <= 0` → commit the cursor to the checkpoint store and stop
/// 6. Otherwise loop without committing, so a crash mid-stream replays from
///    the last fully drained checkpoint
pub struct EventFetcher {
    client: EventsClient,
    writer: EventWriter,
    page_size: u32,
}

impl EventFetcher {
    pub fn new(client: EventsClient, writer: EventWriter) -> Self {
        Self {
            client,
            writer,
            page_size: PAGE_SIZE,
        }
    }

    pub fn client(&self) -> &EventsClient {
        &self.client
    }

    pub fn writer(&self) -> &EventWriter {
        &self.writer
    }

    /// Fetches every event of `stream` after `start`.
    pub async fn fetch_all(
        &self,
        stream: Stream,
        start: i64,
        tokens: &mut TokenManager,
        checkpoints: &mut CheckpointStore,
    ) -> Result<FetchOutcome> {
        let mut cursor = start;
        let mut pages = 0;
        let mut events = 0;

        loop {
            let token = tokens.ensure_valid_token().await?.to_string();

            info!(stream = %stream, checkpoint = cursor, "Fetching events");
            let page = self
                .client
                .get_page(stream, cursor, self.page_size, &token)
                .await?;

            if page.next_checkpoint == cursor {
                if pages == 0 {
                    info!(stream = %stream, checkpoint = cursor, "No new events to ingest");
                    return Ok(FetchOutcome::NoNewEvents { checkpoint: cursor });
                }
                warn!(
                    stream = %stream,
                    cursor,
                    remaining = page.remaining_count,
                    "Cursor stopped advancing before the stream was drained; checkpoint not saved"
                );
                return Ok(FetchOutcome::Stalled {
                    cursor,
                    pages,
                    events,
                });
            }

            if page.next_checkpoint < cursor {
                return Err(PullError::Protocol(format!(
                    "{} returned checkpoint {} behind cursor {}",
                    stream, page.next_checkpoint, cursor
                )));
            }

            cursor = page.next_checkpoint;
            let written = self.writer.append_events(stream, &page.events).await?;
            pages += 1;
            events += written;
            info!(
                stream = %stream,
                events = written,
                file = %self.writer.path_for(stream).display(),
                next_checkpoint = cursor,
                "Saved events"
            );

            if page.remaining_count <= 0 {
                checkpoints.commit(stream, cursor)?;
                info!(
                    stream = %stream,
                    checkpoint = cursor,
                    pages,
                    events,
                    "All events fetched, checkpoint saved"
                );
                return Ok(FetchOutcome::Drained {
                    checkpoint: cursor,
                    pages,
                    events,
                });
            }

            debug!(stream = %stream, remaining = page.remaining_count, "More events pending");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::credentials::{OAuthClient, TokenState, TokenStore};
    use crate::http::RetryingClient;
    use chrono::{Duration, Utc};
    use mockito::{Matcher, Mock, Server, ServerGuard};
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        tokens: TokenManager,
        checkpoints: CheckpointStore,
        fetcher: EventFetcher,
    }

    fn harness(server: &ServerGuard) -> Harness {
        let dir = TempDir::new().unwrap();
        let token_store = TokenStore::new(dir.path().join("tokens.state"), None).unwrap();
        token_store
            .save(&TokenState {
                access_token: "bearer-1".to_string(),
                access_expires_at: Utc::now() + Duration::hours(1),
                refresh_token: "refresh-1".to_string(),
                refresh_expires_at: Utc::now() + Duration::hours(24),
            })
            .unwrap();
        let http = RetryingClient::new(&HttpConfig {
            max_retries: 0,
            backoff_factor: 0.0,
            timeout_seconds: 5,
        })
        .unwrap();
        let oauth = OAuthClient::new(
            http,
            format!("{}/oauth2/token", server.url()),
            "id".to_string(),
            "secret".to_string(),
        );

        let fetcher = EventFetcher::new(
            EventsClient::new(reqwest::Client::new(), server.url()),
            EventWriter::new(dir.path().join("out")),
        );
        let checkpoints = CheckpointStore::new(dir.path().join("checkpoints.state"));

        Harness {
            tokens: TokenManager::new(oauth, token_store),
            checkpoints,
            fetcher,
            _dir: dir,
        }
    }

    async fn mock_page(
        server: &mut ServerGuard,
        from: i64,
        next: i64,
        remaining: i64,
        event_ids: &[u32],
    ) -> Mock {
        let events: Vec<serde_json::Value> = event_ids
            .iter()
            .map(|id| serde_json::json!({"id": id, "type": "detection"}))
            .collect();
        server
            .mock("GET", "/api/v3/events/account_detection")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "100".into()),
                Matcher::UrlEncoded("from".into(), from.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "events": events,
                    "next_checkpoint": next,
                    "remaining_count": remaining,
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await
    }

    fn output_lines(h: &Harness) -> usize {
        std::fs::read_to_string(h.fetcher.writer().path_for(Stream::AccountDetection))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_multi_page_commits_only_final_cursor() {
        let mut server = Server::new_async().await;
        let first = mock_page(&mut server, 400, 500, 30, &[1, 2, 3]).await;
        let second = mock_page(&mut server, 500, 530, 0, &[4, 5]).await;
        let mut h = harness(&server);
        h.checkpoints.set(Stream::AccountDetection, 400);

        let outcome = h
            .fetcher
            .fetch_all(Stream::AccountDetection, 400, &mut h.tokens, &mut h.checkpoints)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            FetchOutcome::Drained {
                checkpoint: 530,
                pages: 2,
                events: 5
            }
        );
        assert_eq!(output_lines(&h), 5);
        first.assert_async().await;
        second.assert_async().await;

        let mut reloaded = CheckpointStore::new(h.checkpoints.path());
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.get(Stream::AccountDetection), Some(530));
    }

    #[tokio::test]
    async fn test_failure_mid_stream_leaves_checkpoint_unsaved() {
        let mut server = Server::new_async().await;
        let _first = mock_page(&mut server, 400, 500, 30, &[1, 2]).await;
        let _failing = server
            .mock("GET", "/api/v3/events/account_detection")
            .match_query(Matcher::UrlEncoded("from".into(), "500".into()))
            .with_status(502)
            .create_async()
            .await;
        let mut h = harness(&server);
        h.checkpoints.set(Stream::AccountDetection, 400);

        let err = h
            .fetcher
            .fetch_all(Stream::AccountDetection, 400, &mut h.tokens, &mut h.checkpoints)
            .await
            .unwrap_err();

        assert!(matches!(err, PullError::Transport(_)));
        // first page was written, but nothing was committed
        assert_eq!(output_lines(&h), 2);
        assert!(!h.checkpoints.path().exists());
        assert_eq!(h.checkpoints.get(Stream::AccountDetection), Some(400));
    }

    #[tokio::test]
    async fn test_same_cursor_means_no_new_events() {
        let mut server = Server::new_async().await;
        let page = mock_page(&mut server, 450, 450, 0, &[]).await;
        let mut h = harness(&server);
        h.checkpoints.set(Stream::AccountDetection, 450);

        let outcome = h
            .fetcher
            .fetch_all(Stream::AccountDetection, 450, &mut h.tokens, &mut h.checkpoints)
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::NoNewEvents { checkpoint: 450 });
        assert_eq!(outcome.events_written(), 0);
        assert_eq!(output_lines(&h), 0);
        assert!(!h.checkpoints.path().exists());
        page.assert_async().await;
    }

    #[tokio::test]
    async fn test_stalled_cursor_stops_without_commit() {
        let mut server = Server::new_async().await;
        let _first = mock_page(&mut server, 400, 480, 20, &[1]).await;
        let _stuck = mock_page(&mut server, 480, 480, 20, &[]).await;
        let mut h = harness(&server);
        h.checkpoints.set(Stream::AccountDetection, 400);

        let outcome = h
            .fetcher
            .fetch_all(Stream::AccountDetection, 400, &mut h.tokens, &mut h.checkpoints)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            FetchOutcome::Stalled {
                cursor: 480,
                pages: 1,
                events: 1
            }
        );
        assert_eq!(h.checkpoints.get(Stream::AccountDetection), Some(400));
        assert!(!h.checkpoints.path().exists());
    }

    #[tokio::test]
    async fn test_regressing_cursor_is_protocol_error() {
        let mut server = Server::new_async().await;
        let _page = mock_page(&mut server, 400, 390, 0, &[1]).await;
        let mut h = harness(&server);

        let err = h
            .fetcher
            .fetch_all(Stream::AccountDetection, 400, &mut h.tokens, &mut h.checkpoints)
            .await
            .unwrap_err();

        assert!(matches!(err, PullError::Protocol(ref m) if m.contains("behind cursor")));
        assert_eq!(output_lines(&h), 0);
    }
}
