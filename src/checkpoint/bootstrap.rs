use super::CheckpointStore;
use crate::credentials::TokenManager;
use crate::error::{PullError, Result};
use crate::events::{EventsClient, PAGE_SIZE};
use crate::stream::Stream;
use tracing::info;

/// Events re-read behind the server head on first run.
pub const LOOKBACK: i64 = 100;

/// A `from` value far past any real cursor; the reply carries the current head.
pub const BOOTSTRAP_FROM: i64 = 10_000_000;

/// Seeds `stream`'s checkpoint at exactly `head - LOOKBACK`.
///
/// The checkpoint is set in memory only; it becomes durable once the stream
/// is drained and committed.
pub async fn bootstrap_checkpoint(
    stream: Stream,
    tokens: &mut TokenManager,
    client: &EventsClient,
    store: &mut CheckpointStore,
) -> Result<i64> {
    let token = tokens.ensure_valid_token().await?.to_string();
    let page = client
        .get_page(stream, BOOTSTRAP_FROM, PAGE_SIZE, &token)
        .await?;

    let head = page.next_checkpoint;
    let start = head.checked_sub(LOOKBACK).ok_or_else(|| {
        PullError::Protocol(format!("{} returned out-of-range head checkpoint {}", stream, head))
    })?;
    info!(stream = %stream, head, checkpoint = start, "Bootstrapped checkpoint from server head");

    store.set(stream, start);
    Ok(start)
}
