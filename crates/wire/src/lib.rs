//! Wire-level protocol layer for the vehicle's text SDK.
//!
//! The vehicle speaks a plain-text UDP protocol: each request string elicits
//! exactly one response (`ok`, `error`, or a value payload) within a fixed
//! deadline. This crate provides:
//! - the command/response codec ([`Command`], [`Response`])
//! - the single-exchange command channel ([`CommandChannel`])
//! - status-string decoding into telemetry samples ([`TelemetrySample`])

pub mod channel;
pub mod command;
pub mod error;
pub mod status;

pub use channel::{ChannelConfig, CommandChannel};
pub use command::{Command, Response};
pub use error::{WireError, WireResult};
pub use status::TelemetrySample;
