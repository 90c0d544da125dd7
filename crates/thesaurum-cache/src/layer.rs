//! The operation set shared by every cache layer

use crate::error::Result;
use crate::types::Blob;
use async_trait::async_trait;

/// One rung of the cache chain.
///
/// Implementations must be safe to call from many tasks at once. `retrieve`
/// never fails: anything other than a clean hit is reported as a miss.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Short name used in logs, errors and health output
    fn name(&self) -> &'static str;

    /// Store `blob` under `topic`, replacing any previous value
    async fn store(&self, topic: &str, blob: &Blob) -> Result<()>;

    /// Look up `topic`, returning `None` on a miss
    async fn retrieve(&self, topic: &str) -> Option<Blob>;

    /// Remove `topic`; removing an absent topic succeeds
    async fn delete(&self, topic: &str) -> Result<()>;

    /// Snapshot of the topics currently held, in no particular order
    async fn list(&self) -> Vec<String>;
}
