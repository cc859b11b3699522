//! Mission sequencing.
//!
//! A mission is an ordered list of goto and rotate operations. The mission
//! abort flag is checked between operations; when it fires the mission stops
//! immediately without rolling back what already executed.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::goto::{Displacement, NavStatus, NavigationController};

/// One mission operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MissionStep {
    /// Relative world-frame displacement executed as a goto
    Goto(Displacement),
    /// Signed rotation in degrees, clockwise positive
    Rotate {
        /// Turn angle; negative turns counter-clockwise
        degrees: f64,
    },
}

/// Completion report for a mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionReport {
    /// How the mission ended
    pub status: NavStatus,
    /// Operations fully completed
    pub steps_completed: u32,
    /// Operations requested
    pub steps_total: u32,
}

impl NavigationController {
    /// Run mission steps in order, honoring the mission abort flag between
    /// operations. Clears the flag at start; an abort mid-sequence stops
    /// immediately and reports how far the mission got.
    pub async fn run_mission(&self, steps: &[MissionStep]) -> MissionReport {
        let abort = self.session().abort();
        abort.clear_mission();

        let steps_total = steps.len() as u32;
        let mut steps_completed = 0;

        for step in steps {
            if abort.mission_requested() {
                info!(steps_completed, steps_total, "mission aborted");
                return MissionReport {
                    status: NavStatus::Aborted,
                    steps_completed,
                    steps_total,
                };
            }

            match step {
                MissionStep::Goto(displacement) => {
                    let report = self.goto(*displacement).await;
                    if report.status != NavStatus::Completed {
                        return MissionReport {
                            status: report.status,
                            steps_completed,
                            steps_total,
                        };
                    }
                }
                MissionStep::Rotate { degrees } => {
                    let whole = degrees.round();
                    if whole != 0.0 {
                        let result = if whole > 0.0 {
                            self.session().rotate_cw(whole as u32).await
                        } else {
                            self.session().rotate_ccw(-whole as u32).await
                        };
                        if let Err(error) = result {
                            warn!(%error, degrees, "mission rotation failed");
                            return MissionReport {
                                status: NavStatus::Failed,
                                steps_completed,
                                steps_total,
                            };
                        }
                    }
                }
            }
            steps_completed += 1;
        }

        MissionReport {
            status: NavStatus::Completed,
            steps_completed,
            steps_total,
        }
    }
}
