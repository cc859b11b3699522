//! Command and response codec for the vehicle's text SDK.
//!
//! Commands are a closed set fixed at compile time; anything outside the SDK
//! verb list never reaches the wire. Responses are classified into `ok`,
//! explicit rejection, or a raw value payload (numeric telemetry or a
//! delimited status string).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{WireError, WireResult};

/// A request the vehicle understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// SDK-mode handshake (`command`)
    Handshake,
    /// Motors on, climb to the default hover height (`takeoff`)
    Takeoff,
    /// Descend and stop motors (`land`)
    Land,
    /// Move forward by centimeters
    Forward(u32),
    /// Move backward by centimeters
    Back(u32),
    /// Strafe left by centimeters
    Left(u32),
    /// Strafe right by centimeters
    Right(u32),
    /// Climb by centimeters
    Up(u32),
    /// Descend by centimeters
    Down(u32),
    /// Rotate clockwise by degrees
    RotateCw(u32),
    /// Rotate counter-clockwise by degrees
    RotateCcw(u32),
    /// Set the forward speed in cm/s
    SetSpeed(u32),
    /// Query the battery percentage (`battery?`)
    BatteryQuery,
    /// Query the delimited status string (`state?`)
    StatusQuery,
}

impl Command {
    /// Encode the command into its wire text.
    pub fn wire(&self) -> String {
        match self {
            Command::Handshake => "command".to_string(),
            Command::Takeoff => "takeoff".to_string(),
            Command::Land => "land".to_string(),
            Command::Forward(cm) => format!("forward {cm}"),
            Command::Back(cm) => format!("back {cm}"),
            Command::Left(cm) => format!("left {cm}"),
            Command::Right(cm) => format!("right {cm}"),
            Command::Up(cm) => format!("up {cm}"),
            Command::Down(cm) => format!("down {cm}"),
            Command::RotateCw(deg) => format!("cw {deg}"),
            Command::RotateCcw(deg) => format!("ccw {deg}"),
            Command::SetSpeed(cm_s) => format!("speed {cm_s}"),
            Command::BatteryQuery => "battery?".to_string(),
            Command::StatusQuery => "state?".to_string(),
        }
    }

    /// Whether this command is a read-only query.
    pub fn is_query(&self) -> bool {
        matches!(self, Command::BatteryQuery | Command::StatusQuery)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire())
    }
}

/// A classified response from the vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// The command was accepted and executed
    Ok,
    /// A value payload (numeric telemetry or a delimited status string)
    Value(String),
}

impl Response {
    /// Classify raw response text.
    ///
    /// `ok` (any case) maps to [`Response::Ok`]; anything starting with
    /// `error` is surfaced as [`WireError::Rejected`] carrying the full
    /// response text; everything else is a value payload.
    pub fn parse(raw: &str) -> WireResult<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(WireError::MalformedResponse("empty response".to_string()));
        }
        if text.eq_ignore_ascii_case("ok") {
            return Ok(Response::Ok);
        }
        if text.to_ascii_lowercase().starts_with("error") {
            return Err(WireError::Rejected(text.to_string()));
        }
        Ok(Response::Value(text.to_string()))
    }
}
