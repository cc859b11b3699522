//! Error types for session operations.

use thiserror::Error;

use crate::state::SessionState;
use tetherlink_wire::WireError;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum FlightError {
    /// Handshake with the vehicle failed
    #[error("connection handshake failed: {0}")]
    Connection(String),

    /// Operation is not valid in the current session state
    #[error("operation '{op}' not valid in state {state}")]
    InvalidState {
        /// The rejected operation
        op: &'static str,
        /// Session state at the time of the call
        state: SessionState,
    },

    /// Battery is below the takeoff safety floor
    #[error("battery at {battery_pct}% is below the {floor_pct}% takeoff floor")]
    LowBattery {
        /// Latest reported battery level
        battery_pct: u8,
        /// Configured safety floor
        floor_pct: u8,
    },

    /// A registered safety monitor rejected the takeoff
    #[error("takeoff blocked: {0}")]
    TakeoffBlocked(String),

    /// Wire-level failure (timeout, rejection, I/O)
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}

/// Result type for session operations.
pub type FlightResult<T> = Result<T, FlightError>;
