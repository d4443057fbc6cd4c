use async_trait::async_trait;
use tokio::sync::RwLock;

use super::DeliveryCache;
use crate::domain::models::DeliveryRecord;

#[derive(Default)]
pub struct InMemoryDeliveryCache {
    records: RwLock<Vec<DeliveryRecord>>,
}

impl InMemoryDeliveryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryCache for InMemoryDeliveryCache {
    async fn entries(&self) -> anyhow::Result<Vec<DeliveryRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn append(&self, records: &[DeliveryRecord]) -> anyhow::Result<()> {
        self.records.write().await.extend_from_slice(records);
        Ok(())
    }
}
