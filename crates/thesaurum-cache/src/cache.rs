//! Ordered chain of cache layers

use crate::error::{CacheError, Result};
use crate::layer::CacheLayer;
use crate::types::{Blob, CacheStats};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Layers ordered fastest first.
///
/// Writes and deletes go to every layer and report every failure, but never
/// roll back the layers that succeeded. Reads stop at the first hit and copy
/// the blob into each faster layer.
#[derive(Default)]
pub struct TieredCache {
    layers: Vec<Box<dyn CacheLayer>>,
    hits: AtomicU64,
    misses: AtomicU64,
    promotions: AtomicU64,
}

impl TieredCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer behind the existing ones
    pub fn add<L: CacheLayer + 'static>(mut self, layer: L) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// Store in every layer; fails if any layer failed.
    pub async fn store(&self, topic: &str, blob: &Blob) -> Result<()> {
        let mut errors = Vec::new();
        for layer in &self.layers {
            if let Err(e) = layer.store(topic, blob).await {
                warn!(topic = %topic, layer = layer.name(), error = %e, "Layer store failed");
                errors.push(e);
            }
        }
        CacheError::aggregate(errors).map_or(Ok(()), Err)
    }

    /// First hit in layer order, promoted into the layers in front of it
    pub async fn retrieve(&self, topic: &str) -> Option<Blob> {
        for (position, layer) in self.layers.iter().enumerate() {
            let Some(blob) = layer.retrieve(topic).await else {
                continue;
            };
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(topic = %topic, layer = layer.name(), position, "Cache hit");

            for faster in &self.layers[..position] {
                match faster.store(topic, &blob).await {
                    Ok(()) => {
                        self.promotions.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        warn!(topic = %topic, layer = faster.name(), error = %e, "Promotion failed");
                    }
                }
            }
            return Some(blob);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(topic = %topic, "Cache miss");
        None
    }

    /// Delete from every layer; fails if any layer failed.
    pub async fn delete(&self, topic: &str) -> Result<()> {
        let mut errors = Vec::new();
        for layer in &self.layers {
            if let Err(e) = layer.delete(topic).await {
                warn!(topic = %topic, layer = layer.name(), error = %e, "Layer delete failed");
                errors.push(e);
            }
        }
        CacheError::aggregate(errors).map_or(Ok(()), Err)
    }

    /// One topic list per layer, in layer order
    pub async fn list(&self) -> Vec<Vec<String>> {
        let mut lists = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            lists.push(layer.list().await);
        }
        lists
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileLayer;
    use crate::memory::MemoryLayer;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Arc;
    use tempfile::tempdir;

    /// A layer whose writes and deletes always fail
    struct BrokenLayer;

    #[async_trait]
    impl CacheLayer for BrokenLayer {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn store(&self, topic: &str, _blob: &Blob) -> Result<()> {
            Err(CacheError::io(self.name(), topic, io::Error::other("disk full")))
        }

        async fn retrieve(&self, _topic: &str) -> Option<Blob> {
            None
        }

        async fn delete(&self, topic: &str) -> Result<()> {
            Err(CacheError::io(self.name(), topic, io::Error::other("read-only")))
        }

        async fn list(&self) -> Vec<String> {
            Vec::new()
        }
    }

    /// Shares one memory layer between the cache and the test body
    struct Shared(Arc<MemoryLayer>);

    #[async_trait]
    impl CacheLayer for Shared {
        fn name(&self) -> &'static str {
            self.0.name()
        }

        async fn store(&self, topic: &str, blob: &Blob) -> Result<()> {
            self.0.store(topic, blob).await
        }

        async fn retrieve(&self, topic: &str) -> Option<Blob> {
            self.0.retrieve(topic).await
        }

        async fn delete(&self, topic: &str) -> Result<()> {
            self.0.delete(topic).await
        }

        async fn list(&self) -> Vec<String> {
            self.0.list().await
        }
    }

    #[tokio::test]
    async fn test_store_and_retrieve_round_trip() {
        let dir = tempdir().unwrap();
        let cache = TieredCache::new()
            .add(MemoryLayer::new(1024))
            .add(FileLayer::new(dir.path()));

        let blob = Blob::new("application/json", r#"{"answer":42}"#);
        cache.store("answer", &blob).await.unwrap();

        assert_eq!(cache.retrieve("answer").await.unwrap(), blob);
        assert_eq!(cache.layer_names(), vec!["memory", "file"]);
    }

    #[tokio::test]
    async fn test_retrieve_miss() {
        let cache = TieredCache::new().add(MemoryLayer::new(1024));

        assert!(cache.retrieve("nonexistent").await.is_none());
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 0);
    }

    #[tokio::test]
    async fn test_promotion_into_faster_layers() {
        let dir = tempdir().unwrap();
        let front = Arc::new(MemoryLayer::new(1024));
        let middle = Arc::new(MemoryLayer::new(1024));
        let cache = TieredCache::new()
            .add(Shared(front.clone()))
            .add(Shared(middle.clone()))
            .add(FileLayer::new(dir.path()));

        let blob = Blob::new("text/plain", "deep");
        FileLayer::new(dir.path())
            .store("deep", &blob)
            .await
            .unwrap();
        assert!(front.retrieve("deep").await.is_none());

        assert_eq!(cache.retrieve("deep").await.unwrap(), blob);

        assert_eq!(front.retrieve("deep").await.unwrap(), blob);
        assert_eq!(middle.retrieve("deep").await.unwrap(), blob);
        assert_eq!(cache.stats().promotions, 2);

        // the next read is served by the first layer
        cache.retrieve("deep").await.unwrap();
        assert_eq!(cache.stats().promotions, 2);
        assert_eq!(cache.stats().hits, 2);
    }

    #[tokio::test]
    async fn test_promotion_failure_is_not_surfaced() {
        let dir = tempdir().unwrap();
        let file = FileLayer::new(dir.path());
        let blob = Blob::new("text/plain", "value");
        file.store("topic", &blob).await.unwrap();

        let cache = TieredCache::new().add(BrokenLayer).add(file);

        assert_eq!(cache.retrieve("topic").await.unwrap(), blob);
        assert_eq!(cache.stats().promotions, 0);
    }

    #[tokio::test]
    async fn test_store_failure_keeps_successful_layers() {
        let front = Arc::new(MemoryLayer::new(1024));
        let back = Arc::new(MemoryLayer::new(1024));
        let cache = TieredCache::new()
            .add(Shared(front.clone()))
            .add(BrokenLayer)
            .add(Shared(back.clone()));

        let err = cache
            .store("topic", &Blob::new("text/plain", "value"))
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::Aggregate(_)));
        assert_eq!(err.failure_count(), 1);
        assert!(err.to_string().contains("disk full"));

        // no short-circuit and no rollback
        assert!(front.retrieve("topic").await.is_some());
        assert!(back.retrieve("topic").await.is_some());
    }

    #[tokio::test]
    async fn test_every_failure_is_collected() {
        let cache = TieredCache::new()
            .add(BrokenLayer)
            .add(MemoryLayer::new(1024))
            .add(BrokenLayer);

        let err = cache
            .store("topic", &Blob::new("text/plain", "value"))
            .await
            .unwrap_err();
        assert_eq!(err.failure_count(), 2);
        assert_eq!(err.to_string().lines().count(), 2);

        let err = cache.delete("topic").await.unwrap_err();
        assert_eq!(err.failure_count(), 2);
        assert!(err.to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn test_delete_removes_from_every_layer() {
        let dir = tempdir().unwrap();
        let front = Arc::new(MemoryLayer::new(1024));
        let cache = TieredCache::new()
            .add(Shared(front.clone()))
            .add(FileLayer::new(dir.path()));

        cache
            .store("topic", &Blob::new("text/plain", "value"))
            .await
            .unwrap();
        cache.delete("topic").await.unwrap();

        assert!(cache.retrieve("topic").await.is_none());
        assert!(front.retrieve("topic").await.is_none());
        assert!(!dir.path().join("topic").exists());
    }

    #[tokio::test]
    async fn test_list_per_layer_without_merging() {
        let dir = tempdir().unwrap();
        // too small for the second blob
        let cache = TieredCache::new()
            .add(MemoryLayer::new(8))
            .add(FileLayer::new(dir.path()));

        cache
            .store("small", &Blob::new("text/plain", "tiny"))
            .await
            .unwrap();
        cache
            .store("large", &Blob::new("text/plain", "far too large"))
            .await
            .unwrap();

        let mut lists = cache.list().await;
        for list in &mut lists {
            list.sort();
        }
        assert_eq!(lists, vec![vec!["small"], vec!["large", "small"]]);
    }

    #[tokio::test]
    async fn test_empty_cache() {
        let cache = TieredCache::new();

        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        cache
            .store("topic", &Blob::new("text/plain", "x"))
            .await
            .unwrap();
        assert!(cache.retrieve("topic").await.is_none());
        assert!(cache.list().await.is_empty());
    }
}
