//! Background liveness pings with explicit pause arbitration.
//!
//! The vehicle drops out of SDK mode after a few seconds of command silence,
//! so a lightweight battery query is sent periodically while airborne. The
//! keepalive must never collide with a real exchange: it only fires when the
//! channel is idle, no pause guard is held, and no exchange completed within
//! the last period.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::state::SessionState;
use tetherlink_wire::{Command, CommandChannel, WireError};

/// Default liveness ping period.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(500);

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Keepalive loop with RAII pause arbitration.
#[derive(Default)]
pub struct KeepaliveArbiter {
    pause_depth: Arc<AtomicUsize>,
    worker: StdMutex<Option<Worker>>,
}

/// Guard holding the keepalive paused; dropped when the multi-step exchange
/// that took it completes.
pub struct PauseGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

impl KeepaliveArbiter {
    /// Create an arbiter with no loop running.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause the keepalive for the lifetime of the returned guard.
    ///
    /// Pauses nest: the loop stays quiet until every guard is dropped.
    pub fn pause(&self) -> PauseGuard {
        self.pause_depth.fetch_add(1, Ordering::AcqRel);
        PauseGuard {
            depth: Arc::clone(&self.pause_depth),
        }
    }

    /// Start the keepalive loop. A loop already running is left in place.
    pub fn start(
        &self,
        channel: Arc<CommandChannel>,
        state: Arc<RwLock<SessionState>>,
        interval: Duration,
    ) {
        let mut worker = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if worker.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let pause_depth = Arc::clone(&self.pause_depth);
        let handle = tokio::spawn(keepalive_loop(channel, state, pause_depth, interval, stop_rx));
        *worker = Some(Worker { stop_tx, handle });
        debug!(interval_ms = interval.as_millis() as u64, "keepalive started");
    }

    /// Stop the keepalive loop with the request-stop / bounded-join handshake.
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
            warn!("keepalive loop did not stop within the join timeout");
        }
        debug!("keepalive stopped");
    }
}

async fn keepalive_loop(
    channel: Arc<CommandChannel>,
    state: Arc<RwLock<SessionState>>,
    pause_depth: Arc<AtomicUsize>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        if pause_depth.load(Ordering::Acquire) > 0 {
            continue;
        }
        if !state.read().await.is_airborne() {
            continue;
        }
        // Recent real traffic already proves liveness.
        if channel.is_busy() || channel.idle_for() < interval {
            continue;
        }

        match channel.try_send(&Command::BatteryQuery).await {
            Ok(_) => debug!("keepalive ping acknowledged"),
            Err(WireError::ChannelBusy) => {}
            Err(error) => warn!(%error, "keepalive ping failed"),
        }
    }
}
