//! HTTP server for topic endpoints
//!
//! Provides /health, /topic/ and /topic/{topic}, plus the static editor under
//! /editor.

use crate::config::ServerConfig;
use crate::error::Result;
use crate::types::{HealthResponse, LayerHealth};
use crate::validation::validate_topic;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thesaurum_cache::{Blob, TieredCache};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{debug, info};

/// Datatype recorded when a write carries no Content-Type
const DEFAULT_DATATYPE: &str = "application/octet-stream";

/// Shared state for the HTTP server
pub struct ServerState {
    pub cache: TieredCache,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(cache: TieredCache) -> Self {
        Self {
            cache,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/topic/", get(list_topics))
        .route(
            "/topic/{topic}",
            get(get_topic).post(post_topic).delete(delete_topic),
        )
        .nest_service("/editor", ServeDir::new(&config.static_dir))
        .layer(DefaultBodyLimit::max(config.max_body_size));

    let router = match cors_layer(config) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

fn cors_layer(config: &ServerConfig) -> Option<CorsLayer> {
    let origin = config.cors_allow_origin.as_deref()?;
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    if origin == "*" {
        return Some(cors.allow_origin(Any));
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => Some(cors.allow_origin(value)),
        Err(e) => {
            tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
            None
        }
    }
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, config: &ServerConfig) -> std::io::Result<()> {
    let router = create_router(state, config);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;
    let layers = state
        .cache
        .layer_names()
        .into_iter()
        .zip(state.cache.list().await)
        .map(|(name, topics)| LayerHealth {
            name: name.to_string(),
            entries: topics.len(),
        })
        .collect();

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        layers,
        cache: state.cache.stats(),
    })
}

/// List topics, one array per layer
async fn list_topics(State(state): State<SharedState>) -> Json<Vec<Vec<String>>> {
    Json(state.cache.list().await)
}

/// Get the blob stored under a topic
async fn get_topic(
    State(state): State<SharedState>,
    Path(topic): Path<String>,
) -> Result<Response> {
    validate_topic(&topic)?;

    let Some(blob) = state.cache.retrieve(&topic).await else {
        debug!(topic = %topic, "Topic not found");
        return Ok((StatusCode::NOT_FOUND, "could not find data for topic").into_response());
    };

    let content_type = HeaderValue::from_str(blob.datatype())
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_DATATYPE));

    Ok(([(header::CONTENT_TYPE, content_type)], blob.into_data()).into_response())
}

/// Store the request body under a topic
async fn post_topic(
    State(state): State<SharedState>,
    Path(topic): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str> {
    validate_topic(&topic)?;

    let datatype = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_DATATYPE);

    let blob = Blob::new(datatype, body.to_vec());
    debug!(topic = %topic, size = blob.size(), datatype = %datatype, "Storing topic");
    state.cache.store(&topic, &blob).await?;

    Ok("success")
}

/// Delete a topic from every layer
async fn delete_topic(
    State(state): State<SharedState>,
    Path(topic): Path<String>,
) -> Result<&'static str> {
    validate_topic(&topic)?;
    state.cache.delete(&topic).await?;
    Ok("success")
}
