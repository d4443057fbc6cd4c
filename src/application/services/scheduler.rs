use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Work triggered by a [`TimerScheduler`] on every tick.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// `shutdown` is the token the scheduler was started with. Stopping the scheduler
    /// does not cancel it, so a run in flight is allowed to finish.
    async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()>;
}

/// A background process that can be started and stopped repeatedly.
#[async_trait]
pub trait Daemon: Send + Sync {
    /// Starts ticking until [`stop`](Daemon::stop) is called or `shutdown` is cancelled.
    /// Starting a running daemon does nothing.
    async fn start(&self, shutdown: &CancellationToken) -> Result<(), SchedulerError>;

    /// Stops ticking and waits for the loop to exit. Stopping an idle daemon does nothing.
    /// Concurrent callers all return only once the loop has exited.
    async fn stop(&self) -> Result<(), SchedulerError>;

    async fn state(&self) -> SchedulerState;
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler period must be greater than zero")]
    ZeroPeriod,
    #[error("scheduler is stopping")]
    StopInProgress,
    #[error("scheduler loop terminated abnormally: {0}")]
    LoopFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
}

/// What to do when a tick arrives while an earlier run is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Start another run regardless.
    #[default]
    AlwaysFire,
    /// Drop the tick.
    SkipIfRunning,
}

enum Lifecycle {
    Idle,
    Running {
        generation: u64,
        stop: CancellationToken,
        exited: CancellationToken,
        handle: JoinHandle<()>,
    },
    Stopping {
        generation: u64,
        exited: CancellationToken,
    },
}

struct Shared {
    lifecycle: Lifecycle,
    generation: u64,
}

/// Runs a [`ScheduledJob`] at a fixed period.
///
/// Runs are spawned without waiting for earlier ones, unless
/// [`OverlapPolicy::SkipIfRunning`] is selected. Job failures are logged and never stop
/// the loop.
pub struct TimerScheduler {
    name: String,
    job: Arc<dyn ScheduledJob>,
    period: Duration,
    overlap: OverlapPolicy,
    shared: Arc<Mutex<Shared>>,
    // Shared across restarts so a run left over from a previous start still counts.
    in_flight: Arc<AtomicUsize>,
}

impl TimerScheduler {
    pub fn new(
        name: impl Into<String>,
        job: Arc<dyn ScheduledJob>,
        period: Duration,
    ) -> Result<Self, SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod);
        }
        Ok(Self {
            name: name.into(),
            job,
            period,
            overlap: OverlapPolicy::default(),
            shared: Arc::new(Mutex::new(Shared {
                lifecycle: Lifecycle::Idle,
                generation: 0,
            })),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }
}

#[async_trait]
impl Daemon for TimerScheduler {
    async fn start(&self, shutdown: &CancellationToken) -> Result<(), SchedulerError> {
        let mut shared = self.shared.lock().await;
        match shared.lifecycle {
            Lifecycle::Running { .. } => return Ok(()),
            Lifecycle::Stopping { .. } => return Err(SchedulerError::StopInProgress),
            Lifecycle::Idle => {}
        }

        shared.generation += 1;
        let generation = shared.generation;
        let stop = shutdown.child_token();
        let exited = CancellationToken::new();

        let ticker = TickLoop {
            name: self.name.clone(),
            job: self.job.clone(),
            period: self.period,
            overlap: self.overlap,
            shutdown: shutdown.clone(),
            stop: stop.clone(),
            exited: exited.clone(),
            shared: self.shared.clone(),
            in_flight: self.in_flight.clone(),
            generation,
        };
        let handle = tokio::spawn(ticker.run());

        shared.lifecycle = Lifecycle::Running {
            generation,
            stop,
            exited,
            handle,
        };
        debug!(job = %self.name, "starting scheduler");
        Ok(())
    }

    async fn stop(&self) -> Result<(), SchedulerError> {
        let (generation, stop, exited, handle) = {
            let mut shared = self.shared.lock().await;
            let pending_exit = match &shared.lifecycle {
                Lifecycle::Stopping { exited, .. } => Some(exited.clone()),
                _ => None,
            };
            if let Some(exited) = pending_exit {
                drop(shared);
                // Another caller is already stopping; wait for the same loop to exit.
                exited.cancelled().await;
                return Ok(());
            }
            match std::mem::replace(&mut shared.lifecycle, Lifecycle::Idle) {
                Lifecycle::Running {
                    generation,
                    stop,
                    exited,
                    handle,
                } => {
                    shared.lifecycle = Lifecycle::Stopping {
                        generation,
                        exited: exited.clone(),
                    };
                    (generation, stop, exited, handle)
                }
                _ => return Ok(()),
            }
        };

        stop.cancel();
        // The loop resets the lifecycle to Idle itself before finishing.
        if let Err(err) = handle.await {
            let mut shared = self.shared.lock().await;
            let owned = matches!(
                shared.lifecycle,
                Lifecycle::Stopping { generation: g, .. } if g == generation
            );
            if owned {
                shared.lifecycle = Lifecycle::Idle;
            }
            exited.cancel();
            return Err(SchedulerError::LoopFailed(err.to_string()));
        }

        debug!(job = %self.name, "stopped scheduler");
        Ok(())
    }

    async fn state(&self) -> SchedulerState {
        match self.shared.lock().await.lifecycle {
            Lifecycle::Idle => SchedulerState::Idle,
            Lifecycle::Running { .. } => SchedulerState::Running,
            Lifecycle::Stopping { .. } => SchedulerState::Stopping,
        }
    }
}

struct TickLoop {
    name: String,
    job: Arc<dyn ScheduledJob>,
    period: Duration,
    overlap: OverlapPolicy,
    shutdown: CancellationToken,
    stop: CancellationToken,
    exited: CancellationToken,
    shared: Arc<Mutex<Shared>>,
    in_flight: Arc<AtomicUsize>,
    generation: u64,
}

impl TickLoop {
    async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                _ = ticker.tick() => self.fire(),
            }
        }

        let mut shared = self.shared.lock().await;
        let owned = match shared.lifecycle {
            Lifecycle::Running { generation, .. } | Lifecycle::Stopping { generation, .. } => {
                generation == self.generation
            }
            Lifecycle::Idle => false,
        };
        if owned {
            shared.lifecycle = Lifecycle::Idle;
        }
        self.exited.cancel();
        debug!(job = %self.name, "scheduler loop exited");
    }

    fn fire(&self) {
        match self.overlap {
            OverlapPolicy::AlwaysFire => {
                self.in_flight.fetch_add(1, Ordering::AcqRel);
            }
            OverlapPolicy::SkipIfRunning => {
                if self
                    .in_flight
                    .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    debug!(job = %self.name, "previous run still active, skipping tick");
                    return;
                }
            }
        }

        let guard = InFlight(self.in_flight.clone());
        let job = self.job.clone();
        let name = self.name.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let _guard = guard;
            debug!(job = %name, "running job");
            if let Err(err) = job.run(shutdown).await {
                error!(job = %name, error = %format!("{err:#}"), "job failed");
            }
            debug!(job = %name, "finished job");
        });
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
