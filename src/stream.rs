use crate::error::PullError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the event streams exposed by the events API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    AccountDetection,
    AccountScoring,
    Audits,
}

impl Stream {
    /// All streams, in the order a run drains them.
    pub const ALL: [Stream; 3] = [
        Stream::AccountDetection,
        Stream::AccountScoring,
        Stream::Audits,
    ];

    /// Path segment used by `api/v3/events/{stream}`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::AccountDetection => "account_detection",
            Stream::AccountScoring => "account_scoring",
            Stream::Audits => "audits",
        }
    }

    /// Name of the NDJSON output file for this stream.
    pub fn output_file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stream {
    type Err = PullError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stream::ALL
            .into_iter()
            .find(|stream| stream.as_str() == s)
            .ok_or_else(|| PullError::UnknownStream(s.to_string()))
    }
}
