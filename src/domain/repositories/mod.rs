use async_trait::async_trait;

use crate::domain::models::{DeliveryRecord, Message};

/// Durable storage of outbound messages.
///
/// Ordering is by creation, oldest first. Implementations are shared across concurrent
/// dispatch runs. `get_next_unsent` does not claim the message it returns: overlapping
/// callers can receive the same one, and delivery is at-least-once.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Oldest pending message, or `None` when the queue is empty.
    async fn get_next_unsent(&self) -> anyhow::Result<Option<Message>>;

    async fn get_all_unsent(&self) -> anyhow::Result<Vec<Message>>;

    async fn get_all_sent(&self) -> anyhow::Result<Vec<DeliveryRecord>>;

    /// Persists the delivery state of `message`. Saving a pending message is a no-op.
    async fn save(&self, message: &Message) -> anyhow::Result<()>;
}

/// Creation of new pending messages.
#[async_trait]
pub trait MessageWriter: Send + Sync {
    /// Stores a pending message for `recipient` and returns it with its assigned id.
    async fn insert(&self, recipient: &str, content: &str) -> anyhow::Result<Message>;
}
