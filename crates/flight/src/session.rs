//! Vehicle session: lifecycle state machine over the command channel.
//!
//! A [`Session`] is created by [`Session::connect`] and owns the command
//! channel plus the telemetry and keepalive loops bound to it. Every
//! operation validates the current state; commands issued in a state that
//! does not accept them fail with [`FlightError::InvalidState`] rather than
//! being silently dropped.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::abort::AbortSignal;
use crate::error::{FlightError, FlightResult};
use crate::keepalive::{KeepaliveArbiter, DEFAULT_KEEPALIVE_INTERVAL};
use crate::pose::{MoveDirection, Pose, PoseTracker};
use crate::state::SessionState;
use crate::telemetry::{TelemetryService, DEFAULT_POLL_INTERVAL};
use tetherlink_wire::{ChannelConfig, Command, CommandChannel, Response, TelemetrySample};

const HEIGHT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Command channel endpoints and deadline
    pub channel: ChannelConfig,
    /// Telemetry poll period
    pub telemetry_poll_interval: Duration,
    /// Keepalive ping period
    pub keepalive_interval: Duration,
    /// How long takeoff waits for telemetry to confirm the height threshold
    pub takeoff_timeout: Duration,
    /// Height in centimeters confirming the vehicle left the ground
    pub takeoff_confirm_height_cm: u32,
    /// Assumed hover height when telemetry never confirms one
    pub hover_height_cm: u32,
    /// Battery percentage below which takeoff is refused
    pub battery_floor_pct: u8,
    /// Height at or below which a land request is a no-op
    pub ground_height_cm: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            telemetry_poll_interval: DEFAULT_POLL_INTERVAL,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            takeoff_timeout: Duration::from_secs(10),
            takeoff_confirm_height_cm: 30,
            hover_height_cm: 80,
            battery_floor_pct: 20,
            ground_height_cm: 20,
        }
    }
}

/// Seam for safety monitors that hook into the session lifecycle.
///
/// Registered as a weak reference: the session never keeps a monitor alive,
/// and a dropped monitor simply stops gating.
pub trait SafetyMonitor: Send + Sync {
    /// Consulted before takeoff; `Err` carries the reason the takeoff must
    /// be blocked at the current pose.
    fn clear_for_takeoff(&self, pose: &Pose) -> Result<(), String>;

    /// Disconnect teardown notification. Must signal, not block.
    fn on_disconnect(&self);
}

/// An established vehicle session.
pub struct Session {
    config: SessionConfig,
    channel: Arc<CommandChannel>,
    state: Arc<RwLock<SessionState>>,
    pose: PoseTracker,
    telemetry: TelemetryService,
    keepalive: KeepaliveArbiter,
    abort: AbortSignal,
    saved_landing_pose: RwLock<Option<Pose>>,
    monitor: RwLock<Option<Weak<dyn SafetyMonitor>>>,
}

impl Session {
    /// Perform the SDK handshake and establish a session.
    ///
    /// On success the pose is reset to the origin and the telemetry and
    /// keepalive loops are started. An absent or unexpected handshake
    /// response fails with [`FlightError::Connection`].
    pub async fn connect(config: SessionConfig) -> FlightResult<Self> {
        let channel = Arc::new(
            CommandChannel::bind(config.channel.clone())
                .await
                .map_err(|error| FlightError::Connection(error.to_string()))?,
        );

        match channel.send(&Command::Handshake).await {
            Ok(Response::Ok) => {}
            Ok(Response::Value(other)) => {
                return Err(FlightError::Connection(format!(
                    "unexpected handshake response: {other}"
                )))
            }
            Err(error) => return Err(FlightError::Connection(error.to_string())),
        }

        let state = Arc::new(RwLock::new(SessionState::Connected));
        let telemetry = TelemetryService::new();
        telemetry.start(Arc::clone(&channel), config.telemetry_poll_interval);
        let keepalive = KeepaliveArbiter::new();
        keepalive.start(
            Arc::clone(&channel),
            Arc::clone(&state),
            config.keepalive_interval,
        );

        info!(vehicle = %config.channel.vehicle_addr, "session connected");
        Ok(Self {
            config,
            channel,
            state,
            pose: PoseTracker::new(),
            telemetry,
            keepalive,
            abort: AbortSignal::new(),
            saved_landing_pose: RwLock::new(None),
            monitor: RwLock::new(None),
        })
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Current dead-reckoned pose snapshot.
    pub async fn pose(&self) -> Pose {
        self.pose.snapshot().await
    }

    /// Latest telemetry sample, if any.
    pub async fn telemetry(&self) -> Option<TelemetrySample> {
        self.telemetry.latest().await
    }

    /// The shared abort signal polled by the navigation controller.
    pub fn abort(&self) -> &AbortSignal {
        &self.abort
    }

    /// Reset dead reckoning to the world origin.
    pub async fn reset_pose(&self) {
        self.pose.reset().await;
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register the safety monitor consulted at takeoff and signalled at
    /// disconnect. Replaces any previous registration.
    pub async fn register_safety_monitor(&self, monitor: Weak<dyn SafetyMonitor>) {
        *self.monitor.write().await = Some(monitor);
    }

    /// Take off and climb toward `target_height_cm`.
    ///
    /// Refused below the battery floor unless `override_battery` is set, and
    /// refused when the registered safety monitor rejects the current pose.
    /// The transition to Hovering happens once telemetry confirms the height
    /// threshold or the bounded takeoff timeout elapses. A pose saved by the
    /// previous landing is restored so dead reckoning survives a land/takeoff
    /// cycle.
    pub async fn takeoff(&self, target_height_cm: u32, override_battery: bool) -> FlightResult<()> {
        let state = self.state().await;
        if state != SessionState::Connected {
            return Err(FlightError::InvalidState {
                op: "takeoff",
                state,
            });
        }

        if !override_battery {
            if let Some(sample) = self.telemetry.latest().await {
                if sample.battery_pct < self.config.battery_floor_pct {
                    return Err(FlightError::LowBattery {
                        battery_pct: sample.battery_pct,
                        floor_pct: self.config.battery_floor_pct,
                    });
                }
            }
        }

        let pose = self.pose.snapshot().await;
        if let Some(monitor) = self.monitor().await {
            monitor
                .clear_for_takeoff(&pose)
                .map_err(FlightError::TakeoffBlocked)?;
        }

        let _pause = self.keepalive.pause();
        self.set_state(SessionState::TakingOff).await;
        if let Err(error) = self.channel.send(&Command::Takeoff).await {
            self.set_state(SessionState::Connected).await;
            return Err(error.into());
        }

        let restored = {
            let saved = self.saved_landing_pose.write().await.take();
            if let Some(saved) = saved {
                self.pose.restore(saved).await;
                true
            } else {
                false
            }
        };

        let confirmed = self
            .wait_for_height(self.config.takeoff_confirm_height_cm)
            .await;
        if confirmed.is_none() {
            warn!(
                threshold_cm = self.config.takeoff_confirm_height_cm,
                "takeoff height not confirmed before timeout"
            );
        }
        if !restored {
            let seed = confirmed.unwrap_or(self.config.hover_height_cm);
            self.pose.set_height(seed as f64).await;
        }

        // Climb the remainder when the target sits above the hover height.
        let current = confirmed.unwrap_or(self.config.hover_height_cm);
        if target_height_cm > current + 20 {
            let delta = (target_height_cm - current).min(500);
            match self.channel.send(&Command::Up(delta)).await {
                Ok(_) => self.pose.apply_move(MoveDirection::Up, delta as f64).await,
                Err(error) => warn!(%error, delta_cm = delta, "ascent to target height failed"),
            }
        }

        self.set_state(SessionState::Hovering).await;
        info!(target_height_cm, "takeoff complete");
        Ok(())
    }

    /// Land and return to Connected.
    ///
    /// A no-op when the vehicle is already at or near ground level. The pose
    /// at the moment of landing is saved for the next takeoff.
    pub async fn land(&self) -> FlightResult<()> {
        let state = self.state().await;
        if state == SessionState::Landing {
            return Ok(());
        }
        if !matches!(
            state,
            SessionState::Flying | SessionState::Hovering | SessionState::TakingOff
        ) {
            return Err(FlightError::InvalidState { op: "land", state });
        }

        if let Some(sample) = self.telemetry.latest().await {
            if sample.height_cm <= self.config.ground_height_cm {
                info!(
                    height_cm = sample.height_cm,
                    "already at ground level, land skipped"
                );
                return Ok(());
            }
        }

        *self.saved_landing_pose.write().await = Some(self.pose.snapshot().await);

        let _pause = self.keepalive.pause();
        self.set_state(SessionState::Landing).await;
        if let Err(error) = self.channel.send(&Command::Land).await {
            self.set_state(SessionState::Hovering).await;
            return Err(error.into());
        }

        self.pose.set_height(0.0).await;
        self.set_state(SessionState::Connected).await;
        info!("landed");
        Ok(())
    }

    /// Execute a primitive move and integrate it into the pose on success.
    pub async fn move_in(&self, direction: MoveDirection, distance_cm: u32) -> FlightResult<()> {
        if distance_cm == 0 {
            return Ok(());
        }
        let state = self.state().await;
        if !state.accepts_movement() {
            return Err(FlightError::InvalidState { op: "move", state });
        }

        let _pause = self.keepalive.pause();
        self.set_state(SessionState::Flying).await;
        let result = self.channel.send(&direction.command(distance_cm)).await;
        self.set_state(SessionState::Hovering).await;

        result?;
        self.pose.apply_move(direction, distance_cm as f64).await;
        Ok(())
    }

    /// Move forward by centimeters.
    pub async fn forward(&self, distance_cm: u32) -> FlightResult<()> {
        self.move_in(MoveDirection::Forward, distance_cm).await
    }

    /// Move backward by centimeters.
    pub async fn back(&self, distance_cm: u32) -> FlightResult<()> {
        self.move_in(MoveDirection::Back, distance_cm).await
    }

    /// Strafe left by centimeters.
    pub async fn left(&self, distance_cm: u32) -> FlightResult<()> {
        self.move_in(MoveDirection::Left, distance_cm).await
    }

    /// Strafe right by centimeters.
    pub async fn right(&self, distance_cm: u32) -> FlightResult<()> {
        self.move_in(MoveDirection::Right, distance_cm).await
    }

    /// Climb by centimeters.
    pub async fn up(&self, distance_cm: u32) -> FlightResult<()> {
        self.move_in(MoveDirection::Up, distance_cm).await
    }

    /// Descend by centimeters.
    pub async fn down(&self, distance_cm: u32) -> FlightResult<()> {
        self.move_in(MoveDirection::Down, distance_cm).await
    }

    /// Rotate clockwise by degrees.
    pub async fn rotate_cw(&self, degrees: u32) -> FlightResult<()> {
        self.rotate(degrees as f64, Command::RotateCw(degrees)).await
    }

    /// Rotate counter-clockwise by degrees.
    pub async fn rotate_ccw(&self, degrees: u32) -> FlightResult<()> {
        self.rotate(-(degrees as f64), Command::RotateCcw(degrees))
            .await
    }

    /// Set the movement speed, clamped to the SDK's 10-100 cm/s range.
    pub async fn set_speed(&self, cm_per_s: u32) -> FlightResult<()> {
        let state = self.state().await;
        if state == SessionState::Disconnected {
            return Err(FlightError::InvalidState {
                op: "set_speed",
                state,
            });
        }
        let clamped = cm_per_s.clamp(10, 100);
        let _pause = self.keepalive.pause();
        self.channel.send(&Command::SetSpeed(clamped)).await?;
        Ok(())
    }

    /// Tear down the session: signal the safety monitor, stop the telemetry
    /// and keepalive loops (bounded joins), and transition to Disconnected.
    pub async fn disconnect(&self) {
        if let Some(monitor) = self.monitor().await {
            monitor.on_disconnect();
        }
        self.keepalive.stop().await;
        self.telemetry.stop().await;
        self.set_state(SessionState::Disconnected).await;
        info!("session disconnected");
    }

    async fn rotate(&self, signed_deg: f64, command: Command) -> FlightResult<()> {
        let state = self.state().await;
        if !state.accepts_movement() {
            return Err(FlightError::InvalidState { op: "rotate", state });
        }

        let _pause = self.keepalive.pause();
        self.set_state(SessionState::Flying).await;
        let result = self.channel.send(&command).await;
        self.set_state(SessionState::Hovering).await;

        result?;
        self.pose.apply_rotation(signed_deg).await;
        Ok(())
    }

    async fn monitor(&self) -> Option<Arc<dyn SafetyMonitor>> {
        self.monitor.read().await.as_ref().and_then(Weak::upgrade)
    }

    async fn set_state(&self, next: SessionState) {
        *self.state.write().await = next;
    }

    /// Poll telemetry until the height threshold is confirmed or the takeoff
    /// timeout elapses; returns the observed height on confirmation.
    async fn wait_for_height(&self, threshold_cm: u32) -> Option<u32> {
        let deadline = Instant::now() + self.config.takeoff_timeout;
        loop {
            if let Some(sample) = self.telemetry.latest().await {
                if sample.height_cm >= threshold_cm {
                    return Some(sample.height_cm);
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(HEIGHT_POLL_INTERVAL).await;
        }
    }
}
