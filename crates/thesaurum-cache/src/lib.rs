//! Tiered topic blob cache
//!
//! Blobs are addressed by opaque string topics and stored across an ordered
//! chain of layers, fastest first. Writes and deletes fan out to every layer;
//! reads probe the chain front-to-back and promote hits into the faster layers.

mod cache;
mod error;
mod file;
mod layer;
mod lru;
mod memory;
mod types;

pub use cache::TieredCache;
pub use error::{CacheError, Result};
pub use file::{decode_record, encode_record, FileLayer};
pub use layer::CacheLayer;
pub use lru::{LruList, LruTracker};
pub use memory::MemoryLayer;
pub use types::{Blob, CacheStats, MemoryStats, Metadata};
