//! Periodic telemetry polling into a shared snapshot.
//!
//! The service issues the status query at a fixed period, decodes the
//! delimited response, and replaces the shared snapshot wholesale. Malformed
//! samples and transient wire failures are logged and skipped; the loop only
//! terminates through the explicit stop handshake.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tetherlink_wire::{Command, CommandChannel, Response, TelemetrySample, WireError};

/// Default status poll period (5 Hz).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Background status poller publishing the latest [`TelemetrySample`].
#[derive(Default)]
pub struct TelemetryService {
    snapshot: Arc<RwLock<Option<TelemetrySample>>>,
    worker: StdMutex<Option<Worker>>,
}

impl TelemetryService {
    /// Create a service with an empty snapshot and no loop running.
    pub fn new() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(None)),
            worker: StdMutex::new(None),
        }
    }

    /// Latest decoded sample, if any has been published yet.
    pub async fn latest(&self) -> Option<TelemetrySample> {
        self.snapshot.read().await.clone()
    }

    /// Start the poll loop. A loop already running is left in place.
    pub fn start(&self, channel: Arc<CommandChannel>, poll_interval: Duration) {
        let mut worker = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if worker.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let snapshot = Arc::clone(&self.snapshot);
        let handle = tokio::spawn(poll_loop(channel, snapshot, poll_interval, stop_rx));
        *worker = Some(Worker { stop_tx, handle });
        debug!(poll_ms = poll_interval.as_millis() as u64, "telemetry service started");
    }

    /// Stop the poll loop: request-stop, then await termination with a
    /// bounded join so teardown never blocks on a stuck loop.
    pub async fn stop(&self) {
        let worker = {
            let mut guard = match self.worker.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.take()
        };
        let Some(worker) = worker else {
            return;
        };

        let _ = worker.stop_tx.send(true);
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, worker.handle)
            .await
            .is_err()
        {
            warn!("telemetry loop did not stop within the join timeout");
        }
        debug!("telemetry service stopped");
    }
}

async fn poll_loop(
    channel: Arc<CommandChannel>,
    snapshot: Arc<RwLock<Option<TelemetrySample>>>,
    poll_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        match channel.try_send(&Command::StatusQuery).await {
            Ok(Response::Value(raw)) => match TelemetrySample::parse(&raw) {
                Ok(sample) => {
                    *snapshot.write().await = Some(sample);
                }
                Err(error) => warn!(%error, "discarding malformed telemetry sample"),
            },
            Ok(Response::Ok) => {
                warn!("status query answered with bare ok, no sample to decode");
            }
            // A command holds the channel; retry on the next tick.
            Err(WireError::ChannelBusy) => {}
            Err(error) => warn!(%error, "telemetry poll failed"),
        }
    }
}
