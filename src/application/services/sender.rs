use async_trait::async_trait;

use crate::domain::models::{Message, SendReceipt};

/// Delivers a message to an external provider.
///
/// Any failure (transport, unexpected status, malformed response) is reported as a
/// single opaque error.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: &Message) -> anyhow::Result<SendReceipt>;
}
