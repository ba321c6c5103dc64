//! Daily notification scheduler.
//!
//! A [`Scheduler`] fires one valuation cycle per day at a local wall-clock
//! time. The first fire is today's `hour:minute` (or tomorrow's, if that has
//! already passed); every later fire is exactly 24 hours after the previous
//! deadline. The period is not recomputed from the wall clock, so a DST
//! transition while armed shifts the local fire time by the DST offset.
//!
//! The next deadline is measured from the previous deadline, not from the end
//! of the cycle, so a slow cycle does not push later fires back.
//!
//! One cycle is: compute a valuation, dispatch it to every channel, and on a
//! fully successful dispatch notify the registered [`CycleListener`]. Timer
//! cycles and [`Scheduler::send_now`] share a single-flight lock, so two
//! cycles never overlap.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::clock::{duration_until, next_daily_occurrence, Clock, SystemClock};
use crate::duration::format_duration;
use crate::notify::{DispatchError, Dispatcher};
use crate::valuation::{AggregateError, CompositeValuation, ValuationCycle};

const FIRE_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
    Firing,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Firing => "firing",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Scheduler can only be started once (currently {0})")]
    NotIdle(SchedulerState),

    #[error("Invalid fire time {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },
}

/// Why a single cycle did not complete.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Aggregation(#[from] AggregateError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Notified after a valuation has been delivered through every channel.
#[async_trait::async_trait]
pub trait CycleListener: Send + Sync {
    /// A failure here does not fail the cycle; the notification has already
    /// gone out.
    async fn on_notification_sent(&self, valuation: &CompositeValuation) -> anyhow::Result<()>;
}

struct Shared {
    dispatcher: Dispatcher,
    listener: RwLock<Option<Arc<dyn CycleListener>>>,
    state: watch::Sender<SchedulerState>,
    cycle_lock: Mutex<()>,
}

impl Shared {
    /// Move `from -> to`. Returns false (and leaves the state alone) if the
    /// scheduler is not in `from`, e.g. because it was stopped meanwhile.
    fn transition(&self, from: SchedulerState, to: SchedulerState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    async fn run_cycle(
        &self,
        cycle: &dyn ValuationCycle,
    ) -> Result<CompositeValuation, CycleError> {
        let _guard = self.cycle_lock.lock().await;

        let valuation = cycle.compute().await?;
        self.dispatcher.dispatch(&valuation).await?;

        let listener = self.listener.read().await.clone();
        if let Some(listener) = listener {
            if let Err(err) = listener.on_notification_sent(&valuation).await {
                warn!(
                    error = %format!("{err:#}"),
                    "notification sent but post-send step failed; cycle degraded"
                );
            }
        }

        Ok(valuation)
    }
}

pub struct Scheduler {
    shared: Arc<Shared>,
    clock: Arc<dyn Clock>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            shared: Arc::new(Shared {
                dispatcher,
                listener: RwLock::new(None),
                state,
                cycle_lock: Mutex::new(()),
            }),
            clock: Arc::new(SystemClock),
            task: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SchedulerState {
        *self.shared.state.borrow()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.shared.dispatcher
    }

    /// Register the post-send listener, replacing any previous one.
    pub async fn set_on_notification_sent(&self, listener: Arc<dyn CycleListener>) {
        *self.shared.listener.write().await = Some(listener);
    }

    /// Arm the daily timer. Returns the first fire time.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(
        &self,
        hour: u32,
        minute: u32,
        cycle: Arc<dyn ValuationCycle>,
    ) -> Result<DateTime<Local>, SchedulerError> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or(SchedulerError::InvalidTime { hour, minute })?;

        let mut task = self.task.lock().await;
        if !self
            .shared
            .transition(SchedulerState::Idle, SchedulerState::Armed)
        {
            return Err(SchedulerError::NotIdle(self.state()));
        }

        let now = self.clock.local_now();
        let fire_at = next_daily_occurrence(&now, at);
        let delay = duration_until(&now, &fire_at);

        info!(
            fire_at = %fire_at.format("%Y-%m-%d %H:%M %Z"),
            delay = %format_duration(delay),
            "daily notification armed"
        );

        let shared = self.shared.clone();
        let stop = self.shared.state.subscribe();
        *task = Some(tokio::spawn(run_timer(
            shared,
            cycle,
            Instant::now() + delay,
            stop,
        )));

        Ok(fire_at)
    }

    /// Cancel the timer. Terminal: a stopped scheduler cannot be restarted.
    ///
    /// A cycle already in flight runs to completion.
    pub fn stop(&self) {
        let previous = self.shared.state.send_replace(SchedulerState::Stopped);
        if previous != SchedulerState::Stopped {
            info!(%previous, "scheduler stopped");
        }
    }

    /// Wait for the timer task to exit after [`Scheduler::stop`].
    pub async fn join(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!(error = %err, "scheduler task ended abnormally");
            }
        }
    }

    /// Run one cycle immediately, outside the timer.
    pub async fn send_now(
        &self,
        cycle: &dyn ValuationCycle,
    ) -> Result<CompositeValuation, CycleError> {
        self.shared.run_cycle(cycle).await
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.state.send_replace(SchedulerState::Stopped);
    }
}

async fn run_timer(
    shared: Arc<Shared>,
    cycle: Arc<dyn ValuationCycle>,
    first_deadline: Instant,
    mut stop: watch::Receiver<SchedulerState>,
) {
    let mut deadline = first_deadline;

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {}
            _ = stopped(&mut stop) => break,
        }

        if !shared.transition(SchedulerState::Armed, SchedulerState::Firing) {
            break;
        }

        match shared.run_cycle(cycle.as_ref()).await {
            Ok(valuation) => info!(
                total = %valuation.total_value(),
                currency = valuation.reporting_currency(),
                "scheduled notification sent"
            ),
            Err(err) => error!(error = %err, "scheduled notification cycle failed"),
        }

        if !shared.transition(SchedulerState::Firing, SchedulerState::Armed) {
            break;
        }
        deadline += FIRE_PERIOD;
    }
}

/// Resolves once the scheduler is stopped or dropped.
async fn stopped(state: &mut watch::Receiver<SchedulerState>) {
    let _ = state
        .wait_for(|state| *state == SchedulerState::Stopped)
        .await;
}
