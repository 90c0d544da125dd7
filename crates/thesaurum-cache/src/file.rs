//! Durable layer storing one file per topic
//!
//! Each file holds a record of the form `<size>\n<datatype>\n<payload>`. The
//! payload is raw bytes with no escaping. Topics are used verbatim as file
//! names; callers must reject topics that are not safe path components.

use crate::error::{CacheError, Result};
use crate::layer::CacheLayer;
use crate::types::{Blob, Metadata};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, info, warn};

const STAGING_PREFIX: &str = ".staging-";
const STAGING_SUFFIX: &str = ".partial";

/// Shared by every layer in the process so staging names never repeat, even
/// for two layers over the same directory.
static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Serialize a blob into the on-disk record format
pub fn encode_record(blob: &Blob) -> Vec<u8> {
    let header = format!("{}\n{}\n", blob.size(), blob.datatype());
    let mut record = Vec::with_capacity(header.len() + blob.data().len());
    record.extend_from_slice(header.as_bytes());
    record.extend_from_slice(blob.data());
    record
}

/// Parse an on-disk record.
///
/// The size header is taken as recorded, not re-measured against the payload.
/// Returns `None` if the size line is missing or not a decimal integer, or if
/// no datatype line follows it.
pub fn decode_record(bytes: &[u8]) -> Option<Blob> {
    let (size_line, rest) = split_line(bytes)?;
    let size = std::str::from_utf8(size_line).ok()?.parse::<u64>().ok()?;
    if rest.is_empty() {
        return None;
    }

    let (datatype_line, payload) = match split_line(rest) {
        Some(parts) => parts,
        None => (rest, &rest[rest.len()..]),
    };
    let datatype = std::str::from_utf8(datatype_line).ok()?;

    Some(Blob::from_parts(
        Metadata {
            size,
            datatype: datatype.to_string(),
        },
        payload.to_vec(),
    ))
}

/// Split off the first `\n`-terminated line, dropping a trailing `\r`.
fn split_line(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let end = bytes.iter().position(|&b| b == b'\n')?;
    let line = &bytes[..end];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    Some((line, &bytes[end + 1..]))
}

fn is_staging_file(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
}

/// A cache layer backed by a directory of per-topic record files
#[derive(Debug)]
pub struct FileLayer {
    base_dir: PathBuf,
}

impl FileLayer {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Initialize the layer by ensuring the base directory exists and
    /// sweeping staging files left behind by interrupted writes.
    ///
    /// Call before the layer takes writes.
    pub async fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.base_dir).await?;

        let mut swept = 0usize;
        let mut entries = fs::read_dir(&self.base_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let is_stale = entry
                .file_name()
                .to_str()
                .map(is_staging_file)
                .unwrap_or(false);
            if !is_stale {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => swept += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = ?entry.path(), error = %e, "Failed to remove stale staging file");
                }
            }
        }

        info!(base_dir = ?self.base_dir, swept, "File layer initialized");
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn topic_path(&self, topic: &str) -> PathBuf {
        self.base_dir.join(topic)
    }

    /// A fresh file name in the base directory for an in-flight write
    fn staging_path(&self) -> PathBuf {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        self.base_dir.join(format!(
            "{}{}-{}{}",
            STAGING_PREFIX,
            std::process::id(),
            seq,
            STAGING_SUFFIX
        ))
    }
}

#[async_trait]
impl CacheLayer for FileLayer {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn store(&self, topic: &str, blob: &Blob) -> Result<()> {
        if blob.datatype().contains(['\n', '\r']) {
            return Err(CacheError::io(
                self.name(),
                topic,
                std::io::Error::new(ErrorKind::InvalidInput, "datatype contains a line break"),
            ));
        }

        // Write the whole record aside, then swap it in so readers never see a
        // mix of two writes.
        let staging = self.staging_path();
        let target = self.topic_path(topic);

        if let Err(e) = fs::write(&staging, encode_record(blob)).await {
            let _ = fs::remove_file(&staging).await;
            return Err(CacheError::io(self.name(), topic, e));
        }
        if let Err(e) = fs::rename(&staging, &target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(CacheError::io(self.name(), topic, e));
        }

        debug!(topic = %topic, size = blob.size(), path = ?target, "Stored blob in file");
        Ok(())
    }

    async fn retrieve(&self, topic: &str) -> Option<Blob> {
        let path = self.topic_path(topic);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(topic = %topic, path = ?path, error = %e, "Failed to read cached file");
                return None;
            }
        };

        match decode_record(&bytes) {
            Some(blob) => {
                debug!(topic = %topic, size = blob.size(), "File hit");
                Some(blob)
            }
            None => {
                warn!(topic = %topic, path = ?path, "Cached file has a malformed header");
                None
            }
        }
    }

    async fn delete(&self, topic: &str) -> Result<()> {
        match fs::remove_file(self.topic_path(topic)).await {
            Ok(()) => {
                debug!(topic = %topic, "Deleted cached file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(self.name(), topic, e)),
        }
    }

    async fn list(&self) -> Vec<String> {
        let mut entries = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(base_dir = ?self.base_dir, error = %e, "Error opening cache directory");
                return Vec::new();
            }
        };

        let mut topics = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    if let Ok(name) = entry.file_name().into_string() {
                        if !is_staging_file(&name) {
                            topics.push(name);
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(base_dir = ?self.base_dir, error = %e, "Error reading cache directory");
                    return Vec::new();
                }
            }
        }
        topics
    }
}
