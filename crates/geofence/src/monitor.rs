//! Geofence engine: configuration API, violation monitor, and enforcement.
//!
//! The monitor loop samples the dead-reckoned pose while the vehicle is
//! airborne and debounces violations over two consecutive samples before
//! enforcing. Enforcement always raises both navigation abort flags; in Hard
//! mode it additionally stops the monitor and issues a single emergency
//! landing per violation episode (latched until the engine is re-armed).
//! The landing itself is exempt from further scrutiny; the monitor is
//! already stopped when it runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::sync::RwLock as StdRwLock;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{GeofenceConfig, GeofenceMode};
use crate::error::{GeofenceError, GeofenceResult};
use crate::zone::ExclusionZone;
use tetherlink_flight::{Pose, SafetyMonitor, Session, SessionState};

/// Consecutive violating samples required before enforcement.
pub const VIOLATION_THRESHOLD: u32 = 2;

/// Settling delay before the Hard-mode emergency landing is sent.
const HARD_LAND_SETTLE_DELAY: Duration = Duration::from_millis(200);

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Result of checking a pose against the configured geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoseAssessment {
    /// Inside the inclusion box (or none configured) and outside every
    /// exclusion zone
    Clear,
    /// Outside the configured inclusion box
    OutsideInclusion,
    /// Inside at least one exclusion zone
    InsideExclusion,
}

struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Shared {
    config: StdRwLock<Option<GeofenceConfig>>,
    zones: StdRwLock<Vec<ExclusionZone>>,
    enabled: AtomicBool,
    landing_latched: AtomicBool,
    worker: StdMutex<Option<Worker>>,
}

impl Shared {
    fn config(&self) -> Option<GeofenceConfig> {
        match self.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn zones(&self) -> Vec<ExclusionZone> {
        match self.zones.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn assess(&self, x: f64, y: f64, z: f64) -> PoseAssessment {
        if !self.enabled.load(Ordering::Acquire) {
            return PoseAssessment::Clear;
        }
        if let Some(config) = self.config() {
            if !config.inside_inclusion(x, y, z) {
                return PoseAssessment::OutsideInclusion;
            }
        }
        if self.zones().iter().any(|zone| zone.contains(x, y, z)) {
            return PoseAssessment::InsideExclusion;
        }
        PoseAssessment::Clear
    }
}

/// Geofence configuration surface and monitor lifecycle.
pub struct GeofenceEngine {
    session: Arc<Session>,
    shared: Arc<Shared>,
}

impl GeofenceEngine {
    /// Create an engine bound to a session without registering it.
    pub fn new(session: Arc<Session>) -> Arc<Self> {
        Arc::new(Self {
            session,
            shared: Arc::new(Shared::default()),
        })
    }

    /// Create an engine and register it as the session's safety monitor
    /// (takeoff gate plus disconnect teardown).
    pub async fn install(session: Arc<Session>) -> Arc<Self> {
        let engine = Self::new(Arc::clone(&session));
        let monitor: Arc<dyn SafetyMonitor> = engine.clone();
        session
            .register_safety_monitor(Arc::downgrade(&monitor))
            .await;
        engine
    }

    /// Arm the geofence and (re)start the monitor loop.
    ///
    /// Widths are totals and are halved into the stored half-widths; a width
    /// of zero or less unconstrains that axis. A previously anchored center
    /// survives re-arming. Also clears the Hard-landing latch, making `set`
    /// the re-arm entry point after an emergency landing.
    pub async fn set(
        &self,
        max_width_x_cm: f64,
        max_width_y_cm: f64,
        max_z_cm: f64,
        z_min_cm: f64,
        mode: GeofenceMode,
        poll_interval: Duration,
    ) -> GeofenceResult<()> {
        let mut config = GeofenceConfig::from_widths(
            max_width_x_cm,
            max_width_y_cm,
            max_z_cm,
            z_min_cm,
            mode,
            poll_interval,
        )?;
        if let Some(previous) = self.shared.config() {
            config.center = previous.center;
        }
        let poll = config.poll_interval;

        {
            let mut guard = match self.shared.config.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = Some(config.clone());
        }
        self.shared.landing_latched.store(false, Ordering::Release);
        self.shared.enabled.store(true, Ordering::Release);
        self.restart_monitor(poll).await;

        info!(
            mode = ?config.mode,
            half_width_x = ?config.half_width_x,
            half_width_y = ?config.half_width_y,
            z_max = ?config.z_max_cm,
            "geofence armed"
        );
        Ok(())
    }

    /// Turn off monitoring without discarding the configuration or zones.
    pub async fn disable(&self) {
        self.shared.enabled.store(false, Ordering::Release);
        self.stop_monitor().await;
        info!("geofence disabled");
    }

    /// Re-anchor the inclusion center to the current pose.
    pub async fn recenter(&self) -> GeofenceResult<()> {
        let pose = self.session.pose().await;
        let mut guard = match self.shared.config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(config) = guard.as_mut() else {
            return Err(GeofenceError::NotConfigured);
        };
        config.recenter(pose.x_cm, pose.y_cm);
        info!(x = pose.x_cm, y = pose.y_cm, "geofence recentered");
        Ok(())
    }

    /// Append a circular exclusion zone; effective immediately.
    pub fn add_exclusion_circle(
        &self,
        center: (f64, f64),
        radius_cm: f64,
        z_min_cm: Option<f64>,
        z_max_cm: Option<f64>,
    ) -> GeofenceResult<()> {
        let zone = ExclusionZone::circle(center, radius_cm, z_min_cm, z_max_cm)?;
        self.push_zone(zone);
        info!(
            cx = center.0,
            cy = center.1,
            radius_cm,
            "exclusion circle added"
        );
        Ok(())
    }

    /// Append a polygonal exclusion zone; effective immediately.
    pub fn add_exclusion_polygon(
        &self,
        vertices: Vec<(f64, f64)>,
        z_min_cm: Option<f64>,
        z_max_cm: Option<f64>,
    ) -> GeofenceResult<()> {
        let count = vertices.len();
        let zone = ExclusionZone::polygon(vertices, z_min_cm, z_max_cm)?;
        self.push_zone(zone);
        info!(vertices = count, "exclusion polygon added");
        Ok(())
    }

    /// Remove every exclusion zone.
    pub fn clear_exclusions(&self) {
        let mut guard = match self.shared.zones.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clear();
        info!("exclusion zones cleared");
    }

    /// Number of configured exclusion zones.
    pub fn exclusion_count(&self) -> usize {
        match self.shared.zones.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Re-arm monitoring with the existing configuration, clearing the
    /// Hard-landing latch.
    pub async fn restart(&self) -> GeofenceResult<()> {
        let Some(config) = self.shared.config() else {
            return Err(GeofenceError::NotConfigured);
        };
        self.shared.landing_latched.store(false, Ordering::Release);
        self.shared.enabled.store(true, Ordering::Release);
        self.restart_monitor(config.poll_interval).await;
        Ok(())
    }

    /// Stop the monitor loop with the request-stop / bounded-join handshake.
    pub async fn stop(&self) {
        self.stop_monitor().await;
    }

    /// Check a pose against the configured geometry. Always
    /// [`PoseAssessment::Clear`] while the engine is disabled.
    pub fn assess(&self, x: f64, y: f64, z: f64) -> PoseAssessment {
        self.shared.assess(x, y, z)
    }

    /// Active enforcement mode, `None` while disabled or unconfigured.
    pub fn mode(&self) -> Option<GeofenceMode> {
        if !self.shared.enabled.load(Ordering::Acquire) {
            return None;
        }
        self.shared.config().map(|config| config.mode)
    }

    fn push_zone(&self, zone: ExclusionZone) {
        let mut guard = match self.shared.zones.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(zone);
    }

    async fn restart_monitor(&self, poll_interval: Duration) {
        self.stop_monitor().await;

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(monitor_loop(
            Arc::clone(&self.session),
            Arc::clone(&self.shared),
            poll_interval,
            stop_rx,
        ));
        let mut guard = match self.shared.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(Worker { stop_tx, handle });
        debug!(
            poll_ms = poll_interval.as_millis() as u64,
            "geofence monitor started"
        );
    }

    async fn stop_monitor(&self) {
        let worker = {
            let mut guard = match self.shared.worker.lock() {
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
            warn!("geofence monitor did not stop within the join timeout");
        }
        debug!("geofence monitor stopped");
    }
}

impl SafetyMonitor for GeofenceEngine {
    fn clear_for_takeoff(&self, pose: &Pose) -> Result<(), String> {
        if !self.shared.enabled.load(Ordering::Acquire) {
            return Ok(());
        }
        let Some(config) = self.shared.config() else {
            return Ok(());
        };
        if config.mode == GeofenceMode::Hard
            && !config.inside_inclusion(pose.x_cm, pose.y_cm, pose.z_cm)
        {
            return Err(format!(
                "pose ({:.1}, {:.1}, {:.1}) is outside the hard inclusion volume",
                pose.x_cm, pose.y_cm, pose.z_cm
            ));
        }
        Ok(())
    }

    fn on_disconnect(&self) {
        self.shared.enabled.store(false, Ordering::Release);
        // Signal only; the monitor task exits at its next poll point.
        let guard = match self.shared.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(worker) = guard.as_ref() {
            let _ = worker.stop_tx.send(true);
        }
    }
}

/// Consecutive-violation debounce: a single violating sample is noise, two
/// in a row are a breach. Any clean sample resets the streak.
#[derive(Debug)]
struct ViolationTracker {
    streak: u32,
    threshold: u32,
}

impl ViolationTracker {
    fn new(threshold: u32) -> Self {
        Self {
            streak: 0,
            threshold,
        }
    }

    /// Record one sample; returns whether enforcement should fire.
    fn record(&mut self, violated: bool) -> bool {
        if violated {
            self.streak += 1;
        } else {
            self.streak = 0;
        }
        self.streak >= self.threshold
    }
}

async fn monitor_loop(
    session: Arc<Session>,
    shared: Arc<Shared>,
    poll_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut tracker = ViolationTracker::new(VIOLATION_THRESHOLD);
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        if !shared.enabled.load(Ordering::Acquire) {
            continue;
        }
        if !session.state().await.is_airborne() {
            continue;
        }

        let pose = session.pose().await;
        let assessment = shared.assess(pose.x_cm, pose.y_cm, pose.z_cm);
        if !tracker.record(assessment != PoseAssessment::Clear) {
            continue;
        }

        let Some(config) = shared.config() else {
            continue;
        };
        warn!(
            x = pose.x_cm,
            y = pose.y_cm,
            z = pose.z_cm,
            assessment = ?assessment,
            mode = ?config.mode,
            "geofence violation"
        );
        session.abort().request_all();

        if config.mode == GeofenceMode::Hard {
            handle_hard_violation(&session, &shared).await;
            // Hard mode: monitoring stays down until the engine is re-armed.
            break;
        }
    }
}

async fn handle_hard_violation(session: &Arc<Session>, shared: &Arc<Shared>) {
    if shared.landing_latched.swap(true, Ordering::AcqRel) {
        return;
    }
    let state = session.state().await;
    if !matches!(
        state,
        SessionState::Flying | SessionState::Hovering | SessionState::TakingOff
    ) {
        return;
    }

    warn!("hard geofence violation, ordering emergency landing");
    let session = Arc::clone(session);
    tokio::spawn(async move {
        tokio::time::sleep(HARD_LAND_SETTLE_DELAY).await;
        if let Err(err) = session.land().await {
            error!(error = %err, "emergency landing failed");
        }
    });
}
