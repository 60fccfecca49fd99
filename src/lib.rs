//! Incremental pull of security events from a SaaS events API.
//!
//! A run authenticates with OAuth client credentials, resumes each event
//! stream from its saved checkpoint and appends new events to one NDJSON file
//! per stream.
//!
//! ```text
//! Runner
//!   ├── CheckpointStore  (load, or bootstrap from server head − 100)
//!   └── EventFetcher     (per stream, sequential)
//!         ├── TokenManager  (reuse / refresh / re-authenticate)
//!         ├── EventsClient  (GET api/v3/events/{stream})
//!         └── EventWriter   (append NDJSON)
//! ```

pub mod checkpoint;
pub mod config;
pub mod credentials;
pub mod error;
pub mod events;
pub mod http;
pub mod logging;
pub mod runner;
pub mod state_file;
pub mod stream;

pub use config::Config;
pub use error::{PullError, Result};
pub use runner::{RunSummary, Runner};
pub use stream::Stream;
