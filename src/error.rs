//! Error taxonomy for a pull run.
//!
//! Every failure is fatal to the run. Library code returns [`PullError`] and
//! the binary decides how to report it and which exit status to use.

use thiserror::Error;

/// Errors produced while pulling events.
#[derive(Debug, Error)]
pub enum PullError {
    /// A required configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The token endpoint could not issue or refresh a token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A stream name outside the three known streams.
    #[error("unknown stream '{0}'")]
    UnknownStream(String),

    /// HTTP failure while querying an event stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with something we cannot use.
    #[error("unexpected server response: {0}")]
    Protocol(String),

    /// Reading or writing a persisted state file failed.
    #[error("state error: {0:#}")]
    State(#[from] anyhow::Error),

    /// Appending events to an output file failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PullError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_state_error_keeps_context_chain() {
        let err: anyhow::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ))
        .context("Failed to open checkpoint file");

        let err = PullError::from(err.unwrap_err());
        let msg = err.to_string();
        assert!(msg.contains("Failed to open checkpoint file"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_unknown_stream_message() {
        let err = PullError::UnknownStream("detections".to_string());
        assert_eq!(err.to_string(), "unknown stream 'detections'");
    }
}
