//! Thesaurum - tiered topic blob cache over HTTP
//!
//! Clients store, fetch, list and delete byte blobs by topic. Blobs live in an
//! ordered chain of cache layers configured from the environment.

mod config;
mod error;
mod server;
mod types;
mod validation;

use crate::config::{LayerKind, ServerConfig};
use crate::error::Result;
use crate::server::{start_server, ServerState, SharedState};
use std::sync::Arc;
use thesaurum_cache::{FileLayer, MemoryLayer, TieredCache};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("thesaurum_server=info".parse()?)
        .add_directive("thesaurum_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Thesaurum...");

    // Load configuration from environment
    let config = ServerConfig::from_env()?;
    info!("Port: {}", config.port);
    info!("Cache layers: {:?}", config.layers);
    info!("Max memory cache: {} bytes", config.max_memory_cache);
    info!("Data path: {:?}", config.data_path);

    let cache = build_cache(&config).await?;
    let state: SharedState = Arc::new(ServerState::new(cache));

    // Start HTTP server (blocking)
    start_server(state, &config).await?;

    Ok(())
}

/// Assemble the layer chain in configured order
async fn build_cache(config: &ServerConfig) -> Result<TieredCache> {
    let mut cache = TieredCache::new();
    for kind in &config.layers {
        cache = match kind {
            LayerKind::InMemory => cache.add(MemoryLayer::new(config.max_memory_cache)),
            LayerKind::File => {
                let layer = FileLayer::new(&config.data_path);
                layer.init().await?;
                cache.add(layer)
            }
        };
    }
    Ok(cache)
}
