//! Response types for the Thesaurum server

use serde::{Deserialize, Serialize};
use thesaurum_cache::CacheStats;

/// Occupancy of one cache layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerHealth {
    pub name: String,
    pub entries: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub layers: Vec<LayerHealth>,
    pub cache: CacheStats,
}
