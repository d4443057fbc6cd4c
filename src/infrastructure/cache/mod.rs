use async_trait::async_trait;

use crate::domain::models::DeliveryRecord;

pub mod in_memory;
pub mod redis_cache;

/// Ordered, append-only store of delivery records sitting in front of the repository.
#[async_trait]
pub trait DeliveryCache: Send + Sync {
    /// All cached records, oldest first. Empty when nothing has been cached yet.
    async fn entries(&self) -> anyhow::Result<Vec<DeliveryRecord>>;

    /// Appends `records` after the existing entries, keeping their order.
    async fn append(&self, records: &[DeliveryRecord]) -> anyhow::Result<()>;
}
