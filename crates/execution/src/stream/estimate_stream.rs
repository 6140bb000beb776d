//! Debounced, periodically refreshed estimate stream.

use async_trait::async_trait;
use stable_lp_domain::config::ChainConfig;
use stable_lp_domain::error::EstimateError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, warn};

/// Produces one estimate for one input.
#[async_trait]
pub trait EstimateSource: Send + Sync + 'static {
    type Input: Clone + Send + Sync + 'static;
    type Output: Clone + Send + Sync + 'static;

    async fn estimate(&self, input: &Self::Input) -> Result<Self::Output, EstimateError>;
}

/// Timing of an estimate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateStreamConfig {
    /// How long the input must stay unchanged before it is estimated.
    pub debounce: Duration,
    /// Re-estimate the current input this often, to follow pool drift.
    pub refresh_interval: Duration,
}

impl Default for EstimateStreamConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            refresh_interval: Duration::from_secs(10),
        }
    }
}

impl EstimateStreamConfig {
    pub fn from_chain(config: &ChainConfig) -> Self {
        Self {
            debounce: config.debounce(),
            refresh_interval: config.refresh_interval(),
        }
    }
}

/// What a consumer should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstimateState<T> {
    /// No input.
    Idle,
    /// Input changed; waiting for the debounce window or the read.
    Pending,
    Ready(T),
    /// The latest input has no estimate.
    Unavailable(EstimateError),
}

impl<T> EstimateState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Unavailable(_))
    }
}

type Outcome<T> = (u64, Result<T, EstimateError>);

/// Runs an [`EstimateSource`] against a changing input.
///
/// Every input change bumps a generation counter and restarts the debounce
/// window. Each estimate launched carries the generation it was started
/// for; a result whose generation is no longer current is dropped, so a
/// slow read for an old input never overwrites a newer one. A superseded
/// read is also aborted, so a read that never resolves does not outlive
/// its input.
///
/// The background task and any read in flight stop when the stream is
/// dropped.
pub struct EstimateStream<S: EstimateSource> {
    input: watch::Sender<Option<S::Input>>,
    state: watch::Receiver<EstimateState<S::Output>>,
    task: JoinHandle<()>,
}

impl<S: EstimateSource> EstimateStream<S> {
    /// Spawns the driver task. Must be called within a tokio runtime.
    pub fn spawn(source: Arc<S>, config: EstimateStreamConfig) -> Self {
        let (input_tx, input_rx) = watch::channel(None);
        let (state_tx, state_rx) = watch::channel(EstimateState::Idle);
        let task = tokio::spawn(drive(source, config, input_rx, state_tx));
        Self {
            input: input_tx,
            state: state_rx,
            task,
        }
    }

    /// Replaces the input; the previous estimate is discarded.
    pub fn set_input(&self, input: S::Input) {
        self.input.send_replace(Some(input));
    }

    /// Clears the input; the stream goes idle.
    pub fn clear(&self) {
        self.input.send_replace(None);
    }

    /// Current state.
    pub fn state(&self) -> EstimateState<S::Output> {
        self.state.borrow().clone()
    }

    /// A receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<EstimateState<S::Output>> {
        self.state.clone()
    }
}

impl<S: EstimateSource> Drop for EstimateStream<S> {
    fn drop(&mut self) {
        // dropping the driver drops its JoinSet, which aborts the read in flight
        self.task.abort();
    }
}

async fn drive<S: EstimateSource>(
    source: Arc<S>,
    config: EstimateStreamConfig,
    mut input_rx: watch::Receiver<Option<S::Input>>,
    state_tx: watch::Sender<EstimateState<S::Output>>,
) {
    let mut in_flight: JoinSet<Outcome<S::Output>> = JoinSet::new();
    let mut generation: u64 = 0;
    let mut debounce: Option<Instant> = None;
    let mut refresh = interval_at(
        Instant::now() + config.refresh_interval,
        config.refresh_interval,
    );
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let launch =
        |in_flight: &mut JoinSet<Outcome<S::Output>>, generation: u64, input: S::Input| {
            let source = source.clone();
            in_flight.abort_all();
            in_flight.spawn(async move { (generation, source.estimate(&input).await) });
        };

    info!(
        debounce_ms = config.debounce.as_millis() as u64,
        refresh_ms = config.refresh_interval.as_millis() as u64,
        "Estimate stream started"
    );

    loop {
        tokio::select! {
            changed = input_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                generation += 1;
                in_flight.abort_all();
                if input_rx.borrow_and_update().is_some() {
                    debounce = Some(Instant::now() + config.debounce);
                    state_tx.send_replace(EstimateState::Pending);
                } else {
                    debounce = None;
                    state_tx.send_replace(EstimateState::Idle);
                }
            }
            _ = sleep_until(debounce.unwrap_or_else(Instant::now)), if debounce.is_some() => {
                debounce = None;
                let input = input_rx.borrow().clone();
                if let Some(input) = input {
                    debug!(generation, "Debounce elapsed, estimating");
                    launch(&mut in_flight, generation, input);
                    refresh.reset();
                }
            }
            _ = refresh.tick() => {
                if debounce.is_some() {
                    continue;
                }
                let input = input_rx.borrow().clone();
                if let Some(input) = input {
                    generation += 1;
                    debug!(generation, "Periodic refresh, estimating");
                    launch(&mut in_flight, generation, input);
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                let (started, result) = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        if !e.is_cancelled() {
                            warn!(generation, error = %e, "Estimate task failed");
                        }
                        continue;
                    }
                };
                if started != generation {
                    debug!(started, current = generation, "Discarding stale estimate");
                    continue;
                }
                let next = match result {
                    Ok(output) => EstimateState::Ready(output),
                    Err(reason) => {
                        debug!(generation, reason = %reason, "Estimate unavailable");
                        EstimateState::Unavailable(reason)
                    }
                };
                state_tx.send_replace(next);
            }
        }
    }

    debug!("Estimate stream stopped");
}
