use crate::stream::Stream;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Appends events to one newline-delimited JSON file per stream.
///
/// No deduplication: replaying a page appends its events again.
#[derive(Clone, Debug)]
pub struct EventWriter {
    output_dir: PathBuf,
}

impl EventWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Output file for `stream`.
    pub fn path_for(&self, stream: Stream) -> PathBuf {
        self.output_dir.join(stream.output_file_name())
    }

    /// Appends one compact JSON line per event and returns the number of lines written.
    ///
    /// The file is opened in append mode and closed before returning.
    pub async fn append_events(&self, stream: Stream, events: &[Value]) -> io::Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut buf = Vec::new();
        for event in events {
            serde_json::to_writer(&mut buf, event)?;
            buf.push(b'\n');
        }

        fs::create_dir_all(&self.output_dir).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(stream))
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;

        Ok(events.len())
    }
}
