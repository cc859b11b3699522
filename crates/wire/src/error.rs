//! Error types for wire-level operations.

use thiserror::Error;

/// Errors that can occur on the command channel.
#[derive(Debug, Error)]
pub enum WireError {
    /// No response arrived within the exchange deadline
    #[error("command timed out after {deadline_ms} ms: {command}")]
    Timeout {
        /// Wire text of the command that timed out
        command: String,
        /// Deadline that elapsed, in milliseconds
        deadline_ms: u64,
    },

    /// The vehicle answered with an explicit error response
    #[error("vehicle rejected command: {0}")]
    Rejected(String),

    /// Another exchange currently holds the channel
    #[error("command channel is busy")]
    ChannelBusy,

    /// Response bytes were not valid protocol text
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Status string could not be decoded into a telemetry sample
    #[error("malformed status string: {0}")]
    MalformedStatus(String),

    /// Network I/O errors
    #[error("network I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;
