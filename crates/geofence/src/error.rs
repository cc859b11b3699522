//! Error types for geofence configuration.

use thiserror::Error;

/// Errors that can occur in the geofence configuration API.
///
/// Violations are deliberately not errors: they surface as logged events and
/// abort signals so an in-progress flight is never unwound mid-call.
#[derive(Debug, Error)]
pub enum GeofenceError {
    /// Malformed or non-positive parameters, rejected before any state change
    #[error("invalid geofence configuration: {0}")]
    InvalidConfiguration(String),

    /// Operation requires a configured geofence
    #[error("geofence has not been configured")]
    NotConfigured,
}

/// Result type for geofence operations.
pub type GeofenceResult<T> = Result<T, GeofenceError>;
