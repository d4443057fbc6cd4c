use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use poem::{Server, listener::TcpListener};
use tokio::main;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use messaging_dispatcher::{
    application::{
        handlers::{message_dispatcher::MessageDispatcher, send_batch_job::SendBatchJob},
        services::scheduler::{Daemon, TimerScheduler},
    },
    config::Config,
    domain::repositories::MessageRepository,
    infrastructure::{
        cache::redis_cache::RedisDeliveryCache,
        messaging::webhook::WebhookSender,
        repositories::{
            cached::CachedMessageRepository,
            postgres::{self, PostgresMessageRepository},
        },
    },
    logging,
    presentation::http::{build_app, endpoints::root::ApiState},
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[main]
async fn main() -> anyhow::Result<()> {
    let config = Config::try_parse()?;
    logging::init(config.environment, &config.log_level);
    config.log_summary();

    let messages = init_message_repository(&config).await?;
    let sender = Arc::new(
        WebhookSender::new(config.webhook.clone()).context("creating webhook sender")?,
    );
    let dispatcher = Arc::new(
        MessageDispatcher::new(messages, sender).with_pacing(config.scheduler.batch_pacing),
    );

    let shutdown = CancellationToken::new();

    tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move {
            if let Err(err) = dispatcher.send_all_unsent().await {
                error!(error = %format!("{err:#}"), "failed to send all pending messages");
            }
        }
    });

    let job = Arc::new(SendBatchJob::new(
        dispatcher.clone(),
        config.scheduler.messages_per_interval,
    ));
    let scheduler: Arc<dyn Daemon> = Arc::new(
        TimerScheduler::new("message-sender", job, config.scheduler.interval)?
            .with_overlap(config.scheduler.overlap),
    );
    scheduler.start(&shutdown).await?;

    let state = Arc::new(ApiState {
        dispatcher,
        scheduler: scheduler.clone(),
        shutdown: shutdown.clone(),
    });
    let server_url = config.server_url();
    let app = build_app(state, &server_url);

    info!(url = %server_url, "starting server");

    let signal = {
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutting down");
            shutdown.cancel();
        }
    };

    Server::new(TcpListener::bind(config.bind_address()))
        .run_with_graceful_shutdown(app, signal, Some(SHUTDOWN_GRACE))
        .await
        .context("running http server")?;

    scheduler.stop().await?;
    info!("shutdown complete");
    Ok(())
}

async fn init_message_repository(config: &Config) -> anyhow::Result<Arc<dyn MessageRepository>> {
    let pool = postgres::connect(&config.postgres.url, config.postgres.max_connections).await?;
    postgres::run_migrations(&pool).await?;
    let store: Arc<dyn MessageRepository> = PostgresMessageRepository::new(pool);

    if !config.redis.enabled {
        return Ok(store);
    }
    let cache = RedisDeliveryCache::connect(&config.redis.url, config.redis.cache_key.clone())
        .await?;
    Ok(CachedMessageRepository::new(store, Arc::new(cache)))
}
