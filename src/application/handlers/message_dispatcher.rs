use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::{
    application::services::sender::MessageSender,
    domain::{
        models::{DeliveryRecord, Message},
        repositories::MessageRepository,
    },
};

/// Runs dispatch cycles: fetch a pending message, deliver it, mark it sent, persist it.
///
/// Delivery is at-least-once and not transactional. When the provider accepts a message
/// but persisting the new state fails, the message stays pending in storage and a later
/// cycle delivers it again.
pub struct MessageDispatcher {
    messages: Arc<dyn MessageRepository>,
    sender: Arc<dyn MessageSender>,
    pacing: Duration,
}

impl MessageDispatcher {
    pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

    pub fn new(messages: Arc<dyn MessageRepository>, sender: Arc<dyn MessageSender>) -> Self {
        Self {
            messages,
            sender,
            pacing: Self::DEFAULT_PACING,
        }
    }

    /// Delay inserted between consecutive deliveries of [`send_all_unsent`](Self::send_all_unsent).
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Delivers the oldest pending message. An empty queue is not an error.
    #[instrument(skip_all, err)]
    pub async fn send_next(&self) -> anyhow::Result<()> {
        let Some(mut message) = self
            .messages
            .get_next_unsent()
            .await
            .context("getting next unsent message")?
        else {
            debug!("no pending messages");
            return Ok(());
        };

        self.deliver(&mut message).await
    }

    /// Delivers every pending message in order, pausing between sends.
    ///
    /// Stops at the first failure; messages delivered before it stay delivered.
    #[instrument(skip_all, err)]
    pub async fn send_all_unsent(&self) -> anyhow::Result<()> {
        let pending = self
            .messages
            .get_all_unsent()
            .await
            .context("getting all unsent messages")?;

        info!(count = pending.len(), "sending all pending messages");

        for (index, mut message) in pending.into_iter().enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            self.deliver(&mut message).await?;
        }

        Ok(())
    }

    #[instrument(skip_all, err)]
    pub async fn list_delivered(&self) -> anyhow::Result<Vec<DeliveryRecord>> {
        self.messages
            .get_all_sent()
            .await
            .context("listing sent messages")
    }

    async fn deliver(&self, message: &mut Message) -> anyhow::Result<()> {
        let receipt = self
            .sender
            .send(message)
            .await
            .context("sending message")?;

        message
            .set_sent(receipt.external_id, receipt.sent_at)
            .context("setting message sent status")?;

        self.messages
            .save(message)
            .await
            .context("saving message")?;

        info!(
            message_id = %message.id(),
            external_id = message.external_id().unwrap_or_default(),
            "message delivered"
        );
        Ok(())
    }
}
