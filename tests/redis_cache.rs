//! Integration tests for the Redis delivery cache.
//!
//! Run against a disposable Redis:
//! `REDIS_URL=redis://127.0.0.1:6379 cargo test --test redis_cache -- --ignored`

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use messaging_dispatcher::domain::models::DeliveryRecord;
use messaging_dispatcher::domain::repositories::{MessageRepository, MessageWriter};
use messaging_dispatcher::infrastructure::cache::DeliveryCache;
use messaging_dispatcher::infrastructure::cache::redis_cache::RedisDeliveryCache;
use messaging_dispatcher::infrastructure::repositories::cached::CachedMessageRepository;
use messaging_dispatcher::infrastructure::repositories::in_memory::InMemoryMessageRepository;

struct TestKey {
    url: String,
    key: String,
}

impl TestKey {
    fn new() -> Option<Self> {
        let Ok(url) = std::env::var("REDIS_URL") else {
            eprintln!("REDIS_URL not set, skipping");
            return None;
        };
        Some(Self {
            url,
            key: format!("test:sent_messages:{}", uuid::Uuid::new_v4()),
        })
    }

    async fn cache(&self) -> RedisDeliveryCache {
        RedisDeliveryCache::connect(&self.url, self.key.clone())
            .await
            .unwrap()
    }

    async fn cleanup(&self) {
        let client = redis::Client::open(self.url.as_str()).unwrap();
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: i64 = redis::cmd("DEL")
            .arg(&self.key)
            .query_async(&mut conn)
            .await
            .unwrap();
    }
}

fn record(external_id: &str, minute: u32) -> DeliveryRecord {
    DeliveryRecord {
        external_id: external_id.to_string(),
        sent_at: Utc.with_ymd_and_hms(2025, 1, 15, 10, minute, 0).unwrap(),
    }
}

#[tokio::test]
#[ignore]
async fn appended_records_keep_oldest_first_order() {
    let Some(key) = TestKey::new() else {
        return;
    };
    let cache = key.cache().await;

    assert!(cache.entries().await.unwrap().is_empty());
    cache.append(&[]).await.unwrap();
    cache
        .append(&[record("ext-1", 1), record("ext-2", 2)])
        .await
        .unwrap();
    cache.append(&[record("ext-3", 3)]).await.unwrap();

    let entries = cache.entries().await.unwrap();
    key.cleanup().await;

    assert_eq!(
        entries,
        vec![record("ext-1", 1), record("ext-2", 2), record("ext-3", 3)]
    );
}

#[tokio::test]
#[ignore]
async fn cached_repository_fills_redis_from_the_store() {
    let Some(key) = TestKey::new() else {
        return;
    };
    let store = Arc::new(InMemoryMessageRepository::new());
    let mut message = store.insert("+994551234567", "hello").await.unwrap();
    message
        .set_sent("ext-1", Utc.with_ymd_and_hms(2025, 1, 15, 10, 1, 0).unwrap())
        .unwrap();
    store.save(&message).await.unwrap();
    let repo = CachedMessageRepository::new(store.clone(), Arc::new(key.cache().await));

    assert_eq!(repo.get_all_sent().await.unwrap(), vec![record("ext-1", 1)]);
    let mut next = store.insert("+994551234568", "later").await.unwrap();
    next.set_sent("ext-2", Utc.with_ymd_and_hms(2025, 1, 15, 10, 2, 0).unwrap())
        .unwrap();
    repo.save(&next).await.unwrap();

    let cached = key.cache().await.entries().await.unwrap();
    key.cleanup().await;

    assert_eq!(cached, vec![record("ext-1", 1), record("ext-2", 2)]);
}
