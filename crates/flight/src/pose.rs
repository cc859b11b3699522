//! Dead-reckoning pose estimation.
//!
//! The vehicle has no absolute positioning, so the pose is maintained by
//! integrating acknowledged movement and rotation commands. Drift is expected
//! and bounded only by command-execution fidelity; no telemetry correction is
//! applied to x/y/yaw.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::RwLock;

use tetherlink_wire::Command;

/// Estimated vehicle pose in the world frame, centimeters and degrees.
///
/// The world frame is anchored at the connect/takeoff origin with X pointing
/// along the initial heading. `yaw_deg` is always normalized to `[0, 360)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pose {
    /// World-frame X in centimeters (initial heading axis)
    pub x_cm: f64,
    /// World-frame Y in centimeters (initial right-hand axis)
    pub y_cm: f64,
    /// Height above the origin in centimeters
    pub z_cm: f64,
    /// Heading in degrees, normalized to `[0, 360)`
    pub yaw_deg: f64,
    /// When the pose was last written
    pub last_update: SystemTime,
}

impl Pose {
    /// Pose at the world origin with zero heading.
    pub fn origin() -> Self {
        Self {
            x_cm: 0.0,
            y_cm: 0.0,
            z_cm: 0.0,
            yaw_deg: 0.0,
            last_update: SystemTime::now(),
        }
    }

    /// The pose this one would become after a world-frame translation.
    pub fn translated(&self, dx_cm: f64, dy_cm: f64, dz_cm: f64) -> Self {
        Self {
            x_cm: self.x_cm + dx_cm,
            y_cm: self.y_cm + dy_cm,
            z_cm: self.z_cm + dz_cm,
            yaw_deg: self.yaw_deg,
            last_update: SystemTime::now(),
        }
    }
}

/// Body-frame movement directions understood by the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveDirection {
    /// Along the heading
    Forward,
    /// Against the heading
    Back,
    /// Perpendicular to the heading, left
    Left,
    /// Perpendicular to the heading, right
    Right,
    /// Climb
    Up,
    /// Descend
    Down,
}

impl MoveDirection {
    /// Resolve a body-frame move of `distance_cm` at heading `yaw_deg` into a
    /// world-frame delta `(dx, dy, dz)`.
    ///
    /// Forward maps to `(d·cosθ, d·sinθ)`; the strafe axes use the
    /// perpendicular basis; up/down affect z only.
    pub fn world_delta(&self, distance_cm: f64, yaw_deg: f64) -> (f64, f64, f64) {
        let theta = yaw_deg.to_radians();
        let (cos, sin) = (theta.cos(), theta.sin());
        let d = distance_cm;
        match self {
            MoveDirection::Forward => (d * cos, d * sin, 0.0),
            MoveDirection::Back => (-d * cos, -d * sin, 0.0),
            MoveDirection::Right => (-d * sin, d * cos, 0.0),
            MoveDirection::Left => (d * sin, -d * cos, 0.0),
            MoveDirection::Up => (0.0, 0.0, d),
            MoveDirection::Down => (0.0, 0.0, -d),
        }
    }

    /// The wire command moving `distance_cm` in this direction.
    pub fn command(&self, distance_cm: u32) -> Command {
        match self {
            MoveDirection::Forward => Command::Forward(distance_cm),
            MoveDirection::Back => Command::Back(distance_cm),
            MoveDirection::Left => Command::Left(distance_cm),
            MoveDirection::Right => Command::Right(distance_cm),
            MoveDirection::Up => Command::Up(distance_cm),
            MoveDirection::Down => Command::Down(distance_cm),
        }
    }
}

/// Shared pose state, written only by the session after a command is
/// confirmed executed.
#[derive(Debug)]
pub struct PoseTracker {
    inner: RwLock<Pose>,
}

impl PoseTracker {
    /// Create a tracker at the world origin.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Pose::origin()),
        }
    }

    /// Current pose snapshot.
    pub async fn snapshot(&self) -> Pose {
        *self.inner.read().await
    }

    /// Reset the pose to the world origin.
    pub async fn reset(&self) {
        *self.inner.write().await = Pose::origin();
    }

    /// Restore a previously saved pose (e.g. the pose at the last landing).
    pub async fn restore(&self, pose: Pose) {
        let mut inner = self.inner.write().await;
        *inner = Pose {
            last_update: SystemTime::now(),
            ..pose
        };
    }

    /// Integrate an acknowledged move of `distance_cm` in `direction`.
    pub async fn apply_move(&self, direction: MoveDirection, distance_cm: f64) {
        let mut inner = self.inner.write().await;
        let (dx, dy, dz) = direction.world_delta(distance_cm, inner.yaw_deg);
        *inner = inner.translated(dx, dy, dz);
    }

    /// Integrate an acknowledged rotation by `signed_deg` (clockwise
    /// positive), keeping yaw in `[0, 360)`.
    pub async fn apply_rotation(&self, signed_deg: f64) {
        let mut inner = self.inner.write().await;
        inner.yaw_deg = (inner.yaw_deg + signed_deg).rem_euclid(360.0);
        inner.last_update = SystemTime::now();
    }

    /// Seed the height after a confirmed takeoff.
    pub async fn set_height(&self, z_cm: f64) {
        let mut inner = self.inner.write().await;
        inner.z_cm = z_cm;
        inner.last_update = SystemTime::now();
    }
}

impl Default for PoseTracker {
    fn default() -> Self {
        Self::new()
    }
}
