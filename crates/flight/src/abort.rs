//! Cooperative cancellation signal for high-level navigation.
//!
//! Cancellation contract: the flags are set by the geofence engine (or by the
//! manual abort entry points) and polled by the navigation controller at
//! defined yield points only: before each goto sub-step and between mission
//! operations. There is no preemption; cancellation latency is bounded by the
//! duration of one sub-step exchange. Each flag is cleared explicitly when a
//! new navigation operation starts.

use std::sync::atomic::{AtomicBool, Ordering};

/// Paired abort flags for goto and mission operations.
#[derive(Debug, Default)]
pub struct AbortSignal {
    goto_abort: AtomicBool,
    mission_abort: AtomicBool,
}

impl AbortSignal {
    /// Create a signal with both flags clear.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the current goto stop at its next sub-step boundary.
    pub fn request_goto_abort(&self) {
        self.goto_abort.store(true, Ordering::Release);
    }

    /// Request that the current mission stop before its next operation.
    pub fn request_mission_abort(&self) {
        self.mission_abort.store(true, Ordering::Release);
    }

    /// Request both aborts (geofence enforcement path).
    pub fn request_all(&self) {
        self.request_goto_abort();
        self.request_mission_abort();
    }

    /// Whether a goto abort is pending.
    pub fn goto_requested(&self) -> bool {
        self.goto_abort.load(Ordering::Acquire)
    }

    /// Whether a mission abort is pending.
    pub fn mission_requested(&self) -> bool {
        self.mission_abort.load(Ordering::Acquire)
    }

    /// Clear the goto flag at the start of a new goto.
    pub fn clear_goto(&self) {
        self.goto_abort.store(false, Ordering::Release);
    }

    /// Clear the mission flag at the start of a new mission.
    pub fn clear_mission(&self) {
        self.mission_abort.store(false, Ordering::Release);
    }
}
