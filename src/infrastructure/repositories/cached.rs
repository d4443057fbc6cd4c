use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use crate::{
    domain::{
        models::{DeliveryRecord, Message},
        repositories::MessageRepository,
    },
    infrastructure::cache::DeliveryCache,
};

/// Cache-aside decorator that serves `get_all_sent` from a [`DeliveryCache`].
///
/// Once the cache holds any entry it is treated as authoritative. Population is not
/// coordinated, so two callers missing the cache at the same time both fill it and the
/// entries end up duplicated.
pub struct CachedMessageRepository {
    inner: Arc<dyn MessageRepository>,
    cache: Arc<dyn DeliveryCache>,
}

impl CachedMessageRepository {
    pub fn new(inner: Arc<dyn MessageRepository>, cache: Arc<dyn DeliveryCache>) -> Arc<Self> {
        Arc::new(Self { inner, cache })
    }
}

#[async_trait]
impl MessageRepository for CachedMessageRepository {
    async fn get_next_unsent(&self) -> anyhow::Result<Option<Message>> {
        self.inner.get_next_unsent().await
    }

    async fn get_all_unsent(&self) -> anyhow::Result<Vec<Message>> {
        self.inner.get_all_unsent().await
    }

    async fn get_all_sent(&self) -> anyhow::Result<Vec<DeliveryRecord>> {
        let cached = self
            .cache
            .entries()
            .await
            .context("getting sent messages from cache")?;
        if !cached.is_empty() {
            return Ok(cached);
        }

        let records = self.inner.get_all_sent().await?;
        if !records.is_empty() {
            self.cache
                .append(&records)
                .await
                .context("adding messages to cache")?;
            debug!(count = records.len(), "populated delivery cache");
        }
        Ok(records)
    }

    /// The store is written first. A cache failure afterwards is reported even though
    /// the message is already durable.
    async fn save(&self, message: &Message) -> anyhow::Result<()> {
        self.inner.save(message).await?;

        if let Some(record) = message.delivery() {
            self.cache
                .append(std::slice::from_ref(record))
                .await
                .context("adding message to cache")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::infrastructure::cache::in_memory::InMemoryDeliveryCache;
    use crate::infrastructure::repositories::in_memory::InMemoryMessageRepository;
    use crate::testing::{FlakyRepository, fixed_time};

    struct BrokenCache;

    #[async_trait]
    impl DeliveryCache for BrokenCache {
        async fn entries(&self) -> anyhow::Result<Vec<DeliveryRecord>> {
            Err(anyhow!("cache down"))
        }

        async fn append(&self, _records: &[DeliveryRecord]) -> anyhow::Result<()> {
            Err(anyhow!("cache down"))
        }
    }

    fn delivered(id: &str) -> Message {
        let mut message = Message::new(id, "+994551234567", "hi").unwrap();
        message.set_sent(format!("ext-{id}"), fixed_time()).unwrap();
        message
    }

    fn record(external_id: &str) -> DeliveryRecord {
        DeliveryRecord {
            external_id: external_id.to_string(),
            sent_at: fixed_time(),
        }
    }

    #[tokio::test]
    async fn get_all_sent_populates_cache_once() {
        let inner = Arc::new(FlakyRepository::new(InMemoryMessageRepository::from_messages(
            vec![delivered("1"), delivered("2")],
        )));
        let cache = Arc::new(InMemoryDeliveryCache::new());
        let repo = CachedMessageRepository::new(inner.clone(), cache.clone());

        let first = repo.get_all_sent().await.unwrap();
        let second = repo.get_all_sent().await.unwrap();

        assert_eq!(first, vec![record("ext-1"), record("ext-2")]);
        assert_eq!(second, first);
        assert_eq!(cache.entries().await.unwrap(), first);
        assert_eq!(inner.sent_calls(), 1);
    }

    #[tokio::test]
    async fn get_all_sent_with_nothing_delivered_leaves_cache_empty() {
        let inner = Arc::new(FlakyRepository::new(InMemoryMessageRepository::new()));
        let cache = Arc::new(InMemoryDeliveryCache::new());
        let repo = CachedMessageRepository::new(inner.clone(), cache.clone());

        assert!(repo.get_all_sent().await.unwrap().is_empty());
        assert!(repo.get_all_sent().await.unwrap().is_empty());

        assert!(cache.entries().await.unwrap().is_empty());
        assert_eq!(inner.sent_calls(), 2);
    }

    #[tokio::test]
    async fn non_empty_cache_is_authoritative() {
        let inner = Arc::new(FlakyRepository::new(InMemoryMessageRepository::from_messages(
            vec![delivered("1")],
        )));
        let cache = Arc::new(InMemoryDeliveryCache::new());
        cache.append(&[record("stale")]).await.unwrap();
        let repo = CachedMessageRepository::new(inner.clone(), cache);

        assert_eq!(repo.get_all_sent().await.unwrap(), vec![record("stale")]);
        assert_eq!(inner.sent_calls(), 0);
    }

    #[tokio::test]
    async fn save_appends_delivery_to_cache() {
        let inner = Arc::new(InMemoryMessageRepository::from_messages(vec![
            Message::new("1", "+994551234567", "hi").unwrap(),
        ]));
        let cache = Arc::new(InMemoryDeliveryCache::new());
        let repo = CachedMessageRepository::new(inner.clone(), cache.clone());

        repo.save(&delivered("1")).await.unwrap();

        assert_eq!(cache.entries().await.unwrap(), vec![record("ext-1")]);
        assert!(!inner.find("1").await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn save_of_pending_message_skips_cache() {
        let inner = Arc::new(InMemoryMessageRepository::new());
        let cache = Arc::new(InMemoryDeliveryCache::new());
        let repo = CachedMessageRepository::new(inner, cache.clone());

        repo.save(&Message::new("1", "+994551234567", "hi").unwrap())
            .await
            .unwrap();

        assert!(cache.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_skips_cache() {
        let inner = Arc::new(FlakyRepository::new(InMemoryMessageRepository::from_messages(
            vec![Message::new("1", "+994551234567", "hi").unwrap()],
        )));
        inner.fail_save("disk full");
        let cache = Arc::new(InMemoryDeliveryCache::new());
        let repo = CachedMessageRepository::new(inner, cache.clone());

        let err = repo.save(&delivered("1")).await.unwrap_err();

        assert_eq!(err.to_string(), "disk full");
        assert!(cache.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_failure_after_durable_save_is_reported() {
        let inner = Arc::new(InMemoryMessageRepository::from_messages(vec![
            Message::new("1", "+994551234567", "hi").unwrap(),
        ]));
        let repo = CachedMessageRepository::new(inner.clone(), Arc::new(BrokenCache));

        let err = repo.save(&delivered("1")).await.unwrap_err();

        assert_eq!(format!("{err:#}"), "adding message to cache: cache down");
        assert!(!inner.find("1").await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn cache_read_failure_is_reported() {
        let inner = Arc::new(InMemoryMessageRepository::new());
        let repo = CachedMessageRepository::new(inner, Arc::new(BrokenCache));

        let err = repo.get_all_sent().await.unwrap_err();

        assert_eq!(
            format!("{err:#}"),
            "getting sent messages from cache: cache down"
        );
    }

    #[tokio::test]
    async fn pending_queries_bypass_cache() {
        let inner = Arc::new(InMemoryMessageRepository::from_messages(vec![
            delivered("1"),
            Message::new("2", "+994551234567", "hi").unwrap(),
        ]));
        let repo = CachedMessageRepository::new(inner, Arc::new(BrokenCache));

        assert_eq!(repo.get_next_unsent().await.unwrap().unwrap().id(), "2");
        assert_eq!(repo.get_all_unsent().await.unwrap().len(), 1);
    }
}
