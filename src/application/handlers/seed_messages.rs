use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{application::services::scheduler::ScheduledJob, domain::repositories::MessageWriter};

const WORDS: &[&str] = &[
    "quick", "delivery", "order", "ready", "pickup", "today", "your", "code", "is", "please",
    "confirm", "appointment", "tomorrow", "thanks", "for", "shopping", "with", "us", "new",
    "offer", "available", "until", "friday", "balance", "updated", "account", "reminder",
    "payment", "received", "welcome",
];

/// Inserts `count` fake pending messages per run.
pub struct SeedMessagesJob {
    messages: Arc<dyn MessageWriter>,
    count: usize,
}

impl SeedMessagesJob {
    pub fn new(messages: Arc<dyn MessageWriter>, count: usize) -> Self {
        Self { messages, count }
    }

    pub async fn seed(&self) -> anyhow::Result<()> {
        let fakes: Vec<(String, String)> = {
            let mut rng = rand::thread_rng();
            (0..self.count)
                .map(|_| (fake_recipient(&mut rng), fake_sentence(&mut rng, 6)))
                .collect()
        };

        for (recipient, content) in &fakes {
            self.messages
                .insert(recipient, content)
                .await
                .context("inserting message")?;
        }
        info!(count = fakes.len(), "finished seeding messages");
        Ok(())
    }
}

#[async_trait]
impl ScheduledJob for SeedMessagesJob {
    async fn run(&self, _shutdown: CancellationToken) -> anyhow::Result<()> {
        self.seed().await
    }
}

/// `+994` followed by nine random digits.
pub fn fake_recipient(rng: &mut impl Rng) -> String {
    let digits: String = (0..9)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    format!("+994{digits}")
}

pub fn fake_sentence(rng: &mut impl Rng, words: usize) -> String {
    let mut sentence = (0..words)
        .filter_map(|_| WORDS.choose(&mut *rng).copied())
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(first) = sentence.get(..1) {
        let upper = first.to_uppercase();
        sentence.replace_range(..1, &upper);
    }
    sentence.push('.');
    sentence
}
