//! Event stream pagination and NDJSON output.

use serde::Deserialize;
use serde_json::Value;

mod api;
mod fetcher;
mod writer;

pub use api::EventsClient;
pub use fetcher::{EventFetcher, FetchOutcome};
pub use writer::EventWriter;

/// Events requested per page.
pub const PAGE_SIZE: u32 = 100;

/// One page of `GET api/v3/events/{stream}`.
#[derive(Clone, Debug, Deserialize)]
pub struct EventPage {
    /// Raw event records, written out untouched
    #[serde(default)]
    pub events: Vec<Value>,

    /// Cursor to send as `from` for the next page
    pub next_checkpoint: i64,

    /// Events still pending after this page
    pub remaining_count: i64,
}
