//! Session lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicle lifecycle state owned by the session state machine.
///
/// Transitions: `Disconnected → Connected → TakingOff → Flying ⇄ Hovering
/// → Landing → Connected`, with `disconnect` reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No session established
    Disconnected,
    /// Handshake complete, vehicle on the ground
    Connected,
    /// Takeoff commanded, climbing to the hover height
    TakingOff,
    /// Executing a movement or rotation
    Flying,
    /// Airborne and holding position
    Hovering,
    /// Landing commanded, descending
    Landing,
}

impl SessionState {
    /// Whether the vehicle is off the ground in this state.
    pub fn is_airborne(&self) -> bool {
        matches!(
            self,
            SessionState::TakingOff
                | SessionState::Flying
                | SessionState::Hovering
                | SessionState::Landing
        )
    }

    /// Whether movement and rotation commands are accepted in this state.
    pub fn accepts_movement(&self) -> bool {
        matches!(self, SessionState::Flying | SessionState::Hovering)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::TakingOff => "taking-off",
            SessionState::Flying => "flying",
            SessionState::Hovering => "hovering",
            SessionState::Landing => "landing",
        };
        write!(f, "{name}")
    }
}
