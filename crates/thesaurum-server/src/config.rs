use crate::error::{Result, ServerError};
use std::path::PathBuf;
use std::str::FromStr;

/// A layer kind selectable from `CACHE_LAYERS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    InMemory,
    File,
}

impl FromStr for LayerKind {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "InMemory" => Ok(LayerKind::InMemory),
            "File" => Ok(LayerKind::File),
            other => Err(ServerError::Config(format!(
                "unknown cache layer {:?} (expected InMemory or File)",
                other
            ))),
        }
    }
}

/// Server configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Layers in lookup order, fastest first
    pub layers: Vec<LayerKind>,
    pub max_memory_cache: u64,
    pub data_path: PathBuf,
    pub cors_allow_origin: Option<String>,
    pub static_dir: PathBuf,
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            layers: vec![LayerKind::InMemory, LayerKind::File],
            max_memory_cache: 1024 * 1024, // 1MB
            data_path: PathBuf::from("data"),
            cors_allow_origin: None,
            static_dir: PathBuf::from("static"),
            max_body_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

impl ServerConfig {
    /// Parse configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from any variable lookup, e.g. a map in tests
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let layers = match lookup("CACHE_LAYERS") {
            Some(value) => parse_layers(&value)?,
            None => defaults.layers,
        };

        let port = parse_or(&lookup, "PORT", defaults.port)?;
        let max_memory_cache = parse_or(&lookup, "MAX_MEMORY_CACHE", defaults.max_memory_cache)?;
        let max_body_size = parse_or(&lookup, "MAX_BODY_SIZE", defaults.max_body_size)?;

        let data_path = lookup("DATA_FILEPATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_path);

        let static_dir = lookup("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);

        let cors_allow_origin = lookup("CORS_ALLOW_ORIGIN")
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty());

        Ok(Self {
            port,
            layers,
            max_memory_cache,
            data_path,
            cors_allow_origin,
            static_dir,
            max_body_size,
        })
    }
}

fn parse_layers(value: &str) -> Result<Vec<LayerKind>> {
    let layers = value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(LayerKind::from_str)
        .collect::<Result<Vec<_>>>()?;

    if layers.is_empty() {
        return Err(ServerError::Config(
            "CACHE_LAYERS selects no cache layers".to_string(),
        ));
    }
    Ok(layers)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| ServerError::Config(format!("error parsing {}: {}", key, e))),
        None => Ok(default),
    }
}
