//! Hand-written doubles shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    application::services::sender::MessageSender,
    domain::{
        models::{DeliveryRecord, Message, SendReceipt},
        repositories::MessageRepository,
    },
    infrastructure::repositories::in_memory::InMemoryMessageRepository,
};

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()
}

#[derive(Default)]
struct SenderState {
    receipt: Option<SendReceipt>,
    failures: HashMap<String, String>,
    sent: Vec<Message>,
}

/// Records every message it is asked to send. Replies with `ext-<id>` at
/// [`fixed_time`] unless a receipt or a failure is configured.
#[derive(Default)]
pub struct StubSender {
    state: Mutex<SenderState>,
}

impl StubSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_receipt(&self, receipt: SendReceipt) {
        self.state.lock().unwrap().receipt = Some(receipt);
    }

    pub fn fail_for(&self, id: &str, reason: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(id.to_string(), reason.to_string());
    }

    pub fn sent_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.sent.iter().map(|m| m.id().to_string()).collect()
    }

    pub fn sent_contents(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.sent.iter().map(|m| m.content().to_string()).collect()
    }
}

#[async_trait]
impl MessageSender for StubSender {
    async fn send(&self, message: &Message) -> anyhow::Result<SendReceipt> {
        let mut state = self.state.lock().unwrap();
        state.sent.push(message.clone());
        if let Some(reason) = state.failures.get(message.id()) {
            return Err(anyhow!("{reason}"));
        }
        Ok(state.receipt.clone().unwrap_or_else(|| SendReceipt {
            external_id: format!("ext-{}", message.id()),
            sent_at: fixed_time(),
        }))
    }
}

#[derive(Default)]
struct Failures {
    fetch: Option<String>,
    save: Option<String>,
    sent: Option<String>,
}

/// Wraps an [`InMemoryMessageRepository`] and fails selected operations on demand.
pub struct FlakyRepository {
    inner: InMemoryMessageRepository,
    failures: Mutex<Failures>,
    sent_calls: AtomicUsize,
}

impl FlakyRepository {
    pub fn new(inner: InMemoryMessageRepository) -> Self {
        Self {
            inner,
            failures: Mutex::new(Failures::default()),
            sent_calls: AtomicUsize::new(0),
        }
    }

    /// Fails both `get_next_unsent` and `get_all_unsent`.
    pub fn fail_fetch(&self, reason: &str) {
        self.failures.lock().unwrap().fetch = Some(reason.to_string());
    }

    pub fn fail_save(&self, reason: &str) {
        self.failures.lock().unwrap().save = Some(reason.to_string());
    }

    pub fn fail_sent(&self, reason: &str) {
        self.failures.lock().unwrap().sent = Some(reason.to_string());
    }

    pub fn inner(&self) -> &InMemoryMessageRepository {
        &self.inner
    }

    pub fn sent_calls(&self) -> usize {
        self.sent_calls.load(Ordering::SeqCst)
    }

    fn check(&self, pick: impl Fn(&Failures) -> &Option<String>) -> anyhow::Result<()> {
        match pick(&self.failures.lock().unwrap()) {
            Some(reason) => Err(anyhow!("{reason}")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MessageRepository for FlakyRepository {
    async fn get_next_unsent(&self) -> anyhow::Result<Option<Message>> {
        self.check(|f| &f.fetch)?;
        self.inner.get_next_unsent().await
    }

    async fn get_all_unsent(&self) -> anyhow::Result<Vec<Message>> {
        self.check(|f| &f.fetch)?;
        self.inner.get_all_unsent().await
    }

    async fn get_all_sent(&self) -> anyhow::Result<Vec<DeliveryRecord>> {
        self.sent_calls.fetch_add(1, Ordering::SeqCst);
        self.check(|f| &f.sent)?;
        self.inner.get_all_sent().await
    }

    async fn save(&self, message: &Message) -> anyhow::Result<()> {
        self.check(|f| &f.save)?;
        self.inner.save(message).await
    }
}
