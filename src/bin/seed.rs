use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::main;
use tokio_util::sync::CancellationToken;
use tracing::info;

use messaging_dispatcher::{
    application::{
        handlers::seed_messages::SeedMessagesJob,
        services::scheduler::{Daemon, TimerScheduler},
    },
    config::Environment,
    infrastructure::repositories::postgres::{self, PostgresMessageRepository},
    logging,
};

/// Seed the message table with fake pending messages.
#[derive(Parser)]
#[command(name = "seed", version)]
struct Cli {
    /// Postgres database URL
    #[arg(long, env = "DATABASE_URL")]
    db_url: String,

    /// Seconds between seed runs; 0 runs once
    #[arg(short, long, default_value_t = 0)]
    interval: u64,

    /// Messages inserted per run
    #[arg(short, long, default_value_t = 1)]
    count: usize,
}

#[main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(Environment::Dev, "debug");

    let pool = postgres::connect(&cli.db_url, 2).await?;
    postgres::run_migrations(&pool).await?;
    let job = Arc::new(SeedMessagesJob::new(
        PostgresMessageRepository::new(pool),
        cli.count,
    ));

    if cli.interval == 0 {
        return job.seed().await;
    }

    let shutdown = CancellationToken::new();
    let seeder = TimerScheduler::new("message-seeder", job, Duration::from_secs(cli.interval))?;
    seeder.start(&shutdown).await?;
    info!(interval_secs = cli.interval, count = cli.count, "seeding until ctrl-c");

    tokio::signal::ctrl_c().await?;
    shutdown.cancel();
    seeder.stop().await?;
    Ok(())
}
