use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    models::{DeliveryRecord, Message},
    repositories::{MessageRepository, MessageWriter},
};

#[derive(Default)]
struct Store {
    messages: Vec<Message>,
    last_id: u64,
}

/// Keeps messages in a vector, in creation order.
#[derive(Default)]
pub struct InMemoryMessageRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store; the vector order becomes creation order.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let last_id = messages
            .iter()
            .filter_map(|m| m.id().parse::<u64>().ok())
            .max()
            .unwrap_or_default();
        Self {
            store: Arc::new(RwLock::new(Store { messages, last_id })),
        }
    }

    pub async fn find(&self, id: &str) -> Option<Message> {
        let store = self.store.read().await;
        store.messages.iter().find(|m| m.id() == id).cloned()
    }
}

#[async_trait]
impl MessageWriter for InMemoryMessageRepository {
    async fn insert(&self, recipient: &str, content: &str) -> anyhow::Result<Message> {
        let mut store = self.store.write().await;
        let message = Message::new((store.last_id + 1).to_string(), recipient, content)?;
        store.last_id += 1;
        store.messages.push(message.clone());
        Ok(message)
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn get_next_unsent(&self) -> anyhow::Result<Option<Message>> {
        let store = self.store.read().await;
        Ok(store.messages.iter().find(|m| m.is_pending()).cloned())
    }

    async fn get_all_unsent(&self) -> anyhow::Result<Vec<Message>> {
        let store = self.store.read().await;
        Ok(store
            .messages
            .iter()
            .filter(|m| m.is_pending())
            .cloned()
            .collect())
    }

    async fn get_all_sent(&self) -> anyhow::Result<Vec<DeliveryRecord>> {
        let store = self.store.read().await;
        Ok(store
            .messages
            .iter()
            .filter_map(|m| m.delivery().cloned())
            .collect())
    }

    async fn save(&self, message: &Message) -> anyhow::Result<()> {
        if message.is_pending() {
            return Ok(());
        }
        let mut store = self.store.write().await;
        let stored = store
            .messages
            .iter_mut()
            .find(|m| m.id() == message.id())
            .ok_or_else(|| anyhow!("message {} not found", message.id()))?;
        *stored = message.clone();
        Ok(())
    }
}
