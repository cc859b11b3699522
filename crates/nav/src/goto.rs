//! Relative goto with sub-step decomposition.
//!
//! A world-frame displacement is resolved into body-frame legs using the yaw
//! at call time (goto never rotates, so the basis stays valid), then each leg
//! is walked in sub-steps of at most 20 cm. Before every sub-step the
//! controller checks the goto abort flag, projects the pose the sub-step
//! would produce, and consults the geofence: Hard mode halts the remaining
//! sub-steps, Soft mode warns and continues.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tetherlink_flight::{MoveDirection, Session};
use tetherlink_geofence::{GeofenceEngine, GeofenceMode, PoseAssessment};

/// Upper bound on a single sub-step, centimeters.
pub const MAX_SUBSTEP_CM: f64 = 20.0;

/// Remainders below this are not worth commanding.
const MIN_SUBSTEP_CM: f64 = 1.0;

/// A requested world-frame displacement in centimeters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Displacement {
    /// World-frame X delta
    pub dx_cm: f64,
    /// World-frame Y delta
    pub dy_cm: f64,
    /// Vertical delta
    pub dz_cm: f64,
}

/// How a navigation operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavStatus {
    /// Every planned sub-step executed
    Completed,
    /// Stopped early by an abort flag or a Hard-mode geofence rejection
    Aborted,
    /// A sub-step exchange failed (timeout or vehicle rejection)
    Failed,
}

/// Completion report for a goto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavReport {
    /// How the operation ended
    pub status: NavStatus,
    /// Sub-steps actually executed
    pub steps_executed: u32,
    /// Sub-steps planned from the requested displacement
    pub steps_planned: u32,
}

/// Navigation controller over a session and its geofence engine.
pub struct NavigationController {
    session: Arc<Session>,
    geofence: Arc<GeofenceEngine>,
}

impl NavigationController {
    /// Create a controller.
    pub fn new(session: Arc<Session>, geofence: Arc<GeofenceEngine>) -> Self {
        Self { session, geofence }
    }

    /// Execute a relative displacement as bounded sub-steps.
    ///
    /// Clears the goto abort flag at start. Aborts and Hard-mode geofence
    /// rejections report partial completion rather than failing.
    pub async fn goto(&self, displacement: Displacement) -> NavReport {
        let abort = self.session.abort();
        abort.clear_goto();

        let pose = self.session.pose().await;
        let steps = plan_substeps(&plan_legs(&displacement, pose.yaw_deg));
        let steps_planned = steps.len() as u32;
        let mut steps_executed = 0;

        for (direction, distance_cm) in steps {
            // Cancellation contract: the abort flag is honored here, at the
            // sub-step boundary, before any new exchange starts.
            if abort.goto_requested() {
                info!(steps_executed, steps_planned, "goto aborted");
                return NavReport {
                    status: NavStatus::Aborted,
                    steps_executed,
                    steps_planned,
                };
            }

            let current = self.session.pose().await;
            let (dx, dy, dz) = direction.world_delta(distance_cm as f64, current.yaw_deg);
            let projected = current.translated(dx, dy, dz);
            let assessment =
                self.geofence
                    .assess(projected.x_cm, projected.y_cm, projected.z_cm);
            if assessment != PoseAssessment::Clear {
                if self.geofence.mode() == Some(GeofenceMode::Hard) {
                    warn!(
                        ?assessment,
                        x = projected.x_cm,
                        y = projected.y_cm,
                        z = projected.z_cm,
                        "sub-step rejected by hard geofence, halting goto"
                    );
                    return NavReport {
                        status: NavStatus::Aborted,
                        steps_executed,
                        steps_planned,
                    };
                }
                warn!(
                    ?assessment,
                    x = projected.x_cm,
                    y = projected.y_cm,
                    z = projected.z_cm,
                    "sub-step projects outside the geofence, continuing in soft mode"
                );
            }

            if let Err(error) = self.session.move_in(direction, distance_cm).await {
                warn!(%error, ?direction, distance_cm, "goto sub-step failed");
                return NavReport {
                    status: NavStatus::Failed,
                    steps_executed,
                    steps_planned,
                };
            }
            steps_executed += 1;
        }

        NavReport {
            status: NavStatus::Completed,
            steps_executed,
            steps_planned,
        }
    }

    /// Manually request that the current goto stop at its next sub-step.
    pub fn abort_goto(&self) {
        self.session.abort().request_goto_abort();
    }

    /// Manually request that the current mission stop before its next step.
    pub fn abort_mission(&self) {
        self.session.abort().request_mission_abort();
    }

    pub(crate) fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

/// Resolve a world-frame displacement into body-frame legs at `yaw_deg`.
fn plan_legs(displacement: &Displacement, yaw_deg: f64) -> Vec<(MoveDirection, f64)> {
    let theta = yaw_deg.to_radians();
    let (cos, sin) = (theta.cos(), theta.sin());
    // Inverse of the move basis: forward is (cosθ, sinθ), right is (−sinθ, cosθ).
    let forward = displacement.dx_cm * cos + displacement.dy_cm * sin;
    let right = -displacement.dx_cm * sin + displacement.dy_cm * cos;

    let mut legs = Vec::new();
    push_leg(&mut legs, forward, MoveDirection::Forward, MoveDirection::Back);
    push_leg(&mut legs, right, MoveDirection::Right, MoveDirection::Left);
    push_leg(&mut legs, displacement.dz_cm, MoveDirection::Up, MoveDirection::Down);
    legs
}

fn push_leg(
    legs: &mut Vec<(MoveDirection, f64)>,
    amount: f64,
    positive: MoveDirection,
    negative: MoveDirection,
) {
    if amount.abs() < MIN_SUBSTEP_CM {
        return;
    }
    let direction = if amount >= 0.0 { positive } else { negative };
    legs.push((direction, amount.abs()));
}

/// Split legs into sub-steps of at most [`MAX_SUBSTEP_CM`].
fn plan_substeps(legs: &[(MoveDirection, f64)]) -> Vec<(MoveDirection, u32)> {
    let mut steps = Vec::new();
    for &(direction, magnitude) in legs {
        let mut remaining = magnitude;
        while remaining >= MIN_SUBSTEP_CM {
            let step = remaining.min(MAX_SUBSTEP_CM);
            let distance = step.round() as u32;
            if distance > 0 {
                steps.push((direction, distance));
            }
            remaining -= step;
        }
    }
    steps
}
