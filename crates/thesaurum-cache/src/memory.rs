//! Size-bounded in-memory layer with LRU eviction

use crate::error::Result;
use crate::layer::CacheLayer;
use crate::lru::LruTracker;
use crate::types::{Blob, MemoryStats};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Resident {
    blobs: HashMap<String, Blob>,
    total_size: u64,
}

/// A memory layer holding at most `max_size` bytes of payload.
///
/// Lock order is always `resident` before `tracker`.
#[derive(Debug)]
pub struct MemoryLayer {
    resident: RwLock<Resident>,
    tracker: LruTracker,
    max_size: u64,
}

impl MemoryLayer {
    /// Create an empty layer with a byte ceiling of `max_size`
    pub fn new(max_size: u64) -> Self {
        Self {
            resident: RwLock::new(Resident::default()),
            tracker: LruTracker::new(),
            max_size,
        }
    }

    pub async fn stats(&self) -> MemoryStats {
        let resident = self.resident.read().await;
        MemoryStats {
            entries: resident.blobs.len(),
            total_size: resident.total_size,
            max_size: self.max_size,
        }
    }
}

#[async_trait]
impl CacheLayer for MemoryLayer {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn store(&self, topic: &str, blob: &Blob) -> Result<()> {
        let size = blob.size();
        if size > self.max_size {
            // Re-evaluated on every write; the verdict is not remembered.
            debug!(topic = %topic, size, max_size = self.max_size, "Blob larger than memory layer, skipping");

            // Drop any older copy so it cannot shadow the value the slower layers hold.
            let mut resident = self.resident.write().await;
            if let Some(stale) = resident.blobs.remove(topic) {
                resident.total_size -= stale.size();
                self.tracker.remove(topic).await;
                debug!(topic = %topic, "Dropped stale blob replaced by oversized write");
            }
            return Ok(());
        }

        let mut resident = self.resident.write().await;
        if let Some(previous) = resident.blobs.insert(topic.to_string(), blob.clone()) {
            resident.total_size -= previous.size();
        }
        resident.total_size += size;

        // The new topic is most recent, so it is never its own victim.
        self.tracker.touch(topic).await;

        while resident.total_size > self.max_size {
            let Some(victim) = self.tracker.pop().await else {
                break;
            };
            if let Some(evicted) = resident.blobs.remove(&victim) {
                resident.total_size -= evicted.size();
                debug!(topic = %victim, size = evicted.size(), "Evicted least recently used blob");
            }
        }

        debug!(topic = %topic, size, total_size = resident.total_size, "Stored blob in memory");
        Ok(())
    }

    async fn retrieve(&self, topic: &str) -> Option<Blob> {
        let resident = self.resident.read().await;
        let blob = resident.blobs.get(topic).cloned()?;
        self.tracker.touch(topic).await;
        debug!(topic = %topic, "Memory hit");
        Some(blob)
    }

    async fn delete(&self, topic: &str) -> Result<()> {
        let mut resident = self.resident.write().await;
        if let Some(removed) = resident.blobs.remove(topic) {
            resident.total_size -= removed.size();
            debug!(topic = %topic, "Deleted blob from memory");
        }
        self.tracker.remove(topic).await;
        Ok(())
    }

    async fn list(&self) -> Vec<String> {
        self.resident.read().await.blobs.keys().cloned().collect()
    }
}
