//! Vehicle session layer: lifecycle state machine, telemetry snapshotting,
//! dead-reckoning pose estimation, and keepalive arbitration.
//!
//! A [`Session`] owns the command channel and every background loop bound to
//! it. Operations validate the current [`SessionState`] and fail with
//! [`FlightError::InvalidState`] instead of silently dropping; background
//! loops stop only through the explicit shutdown handshake driven by
//! [`Session::disconnect`].

pub mod abort;
pub mod error;
pub mod keepalive;
pub mod pose;
pub mod session;
pub mod state;
pub mod telemetry;

pub use abort::AbortSignal;
pub use error::{FlightError, FlightResult};
pub use keepalive::KeepaliveArbiter;
pub use pose::{MoveDirection, Pose, PoseTracker};
pub use session::{SafetyMonitor, Session, SessionConfig};
pub use state::SessionState;
pub use telemetry::TelemetryService;
