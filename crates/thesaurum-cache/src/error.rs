//! Error types for the tiered cache

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("{layer} layer I/O error for topic {topic:?}: {source}")]
    Io {
        layer: &'static str,
        topic: String,
        #[source]
        source: std::io::Error,
    },

    /// One or more layers failed during a fan-out operation
    #[error("{}", join_messages(.0))]
    Aggregate(Vec<CacheError>),
}

impl CacheError {
    pub fn io(layer: &'static str, topic: &str, source: std::io::Error) -> Self {
        CacheError::Io {
            layer,
            topic: topic.to_string(),
            source,
        }
    }

    /// Fold per-layer failures into one value; `None` when nothing failed.
    pub fn aggregate(errors: Vec<CacheError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(CacheError::Aggregate(errors))
        }
    }

    /// Number of layer failures carried by this error
    pub fn failure_count(&self) -> usize {
        match self {
            CacheError::Io { .. } => 1,
            CacheError::Aggregate(errors) => errors.iter().map(|e| e.failure_count()).sum(),
        }
    }
}

fn join_messages(errors: &[CacheError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, CacheError>;
