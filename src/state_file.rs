//! Gzip-compressed JSON state files with atomic replacement.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Writes `value` to `path` as compressed JSON.
///
/// Uses atomic write: writes to a .tmp sibling, fsyncs, then renames, so a
/// crash never leaves a half-written state file behind.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec(value).context("Failed to serialize state")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create state directory {}", parent.display()))?;
    }

    let tmp_path = tmp_path(path);
    {
        let tmp_file = File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;

        let mut encoder = GzEncoder::new(tmp_file, Compression::default());
        encoder
            .write_all(&json)
            .context("Failed to write compressed state")?;

        let file = encoder.finish().context("Failed to finish compression")?;
        file.sync_all().context("Failed to sync state file to disk")?;
    }

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}

/// Reads a state file written by [`save`]. Returns `Ok(None)` if it does not exist.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open {}", path.display()));
        }
    };

    let mut json = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut json)
        .with_context(|| format!("Failed to decompress {}", path.display()))?;

    let value = serde_json::from_slice(&json)
        .with_context(|| format!("Failed to deserialize {}", path.display()))?;

    Ok(Some(value))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
