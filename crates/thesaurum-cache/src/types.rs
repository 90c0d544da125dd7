//! Cache types

use serde::{Deserialize, Serialize};

/// Metadata recorded alongside every cached payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Payload length as recorded at write time
    pub size: u64,
    /// MIME content type
    pub datatype: String,
}

/// A cached payload plus its metadata
///
/// Every layer keeps its own copy; a blob is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    meta: Metadata,
    data: Vec<u8>,
}

impl Blob {
    /// Build a blob whose recorded size is the payload length
    pub fn new(datatype: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        Self {
            meta: Metadata {
                size: data.len() as u64,
                datatype: datatype.into(),
            },
            data,
        }
    }

    /// Build a blob from already-recorded metadata, keeping `meta.size` verbatim
    pub fn from_parts(meta: Metadata, data: Vec<u8>) -> Self {
        Self { meta, data }
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    pub fn size(&self) -> u64 {
        self.meta.size
    }

    pub fn datatype(&self) -> &str {
        &self.meta.datatype
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Lookup counters kept by the tiered cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub promotions: u64,
}

/// Occupancy of a memory layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub entries: usize,
    pub total_size: u64,
    pub max_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_new_records_payload_length() {
        let blob = Blob::new("text/plain", "hello");
        assert_eq!(blob.size(), 5);
        assert_eq!(blob.datatype(), "text/plain");
        assert_eq!(blob.data(), b"hello");
    }

    #[test]
    fn test_blob_from_parts_keeps_recorded_size() {
        let meta = Metadata {
            size: 42,
            datatype: "application/json".to_string(),
        };
        let blob = Blob::from_parts(meta.clone(), b"{}".to_vec());
        assert_eq!(blob.size(), 42);
        assert_eq!(blob.meta(), &meta);
        assert_eq!(blob.into_data(), b"{}".to_vec());
    }

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.promotions, 0);
    }

    #[test]
    fn test_memory_stats_serialization() {
        let stats = MemoryStats {
            entries: 3,
            total_size: 12345,
            max_size: 1048576,
        };

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("12345"));
        assert!(json.contains("1048576"));

        let deserialized: MemoryStats = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, stats);
    }
}
