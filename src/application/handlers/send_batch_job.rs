use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::application::{
    handlers::message_dispatcher::MessageDispatcher, services::scheduler::ScheduledJob,
};

/// Scheduler job: up to `count` sequential [`MessageDispatcher::send_next`] calls per tick.
pub struct SendBatchJob {
    dispatcher: Arc<MessageDispatcher>,
    count: usize,
}

impl SendBatchJob {
    pub fn new(dispatcher: Arc<MessageDispatcher>, count: usize) -> Self {
        Self { dispatcher, count }
    }
}

#[async_trait]
impl ScheduledJob for SendBatchJob {
    async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        for _ in 0..self.count {
            if shutdown.is_cancelled() {
                debug!("shutdown requested, leaving batch early");
                break;
            }
            self.dispatcher.send_next().await?;
        }
        Ok(())
    }
}
