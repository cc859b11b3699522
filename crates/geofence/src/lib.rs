//! Real-time geofence monitoring and enforcement.
//!
//! An inclusion box (axis-aligned, centered) keeps the vehicle inside a
//! volume; exclusion zones (polygons and circles with optional altitude
//! bands) keep it out of no-fly regions. A background monitor samples the
//! dead-reckoned pose, debounces violations over two consecutive samples,
//! and enforces by raising the navigation abort flags, plus, in Hard mode,
//! a single latched emergency landing per violation episode.

pub mod config;
pub mod error;
pub mod geometry;
pub mod monitor;
pub mod zone;

pub use config::{GeofenceConfig, GeofenceMode};
pub use error::{GeofenceError, GeofenceResult};
pub use monitor::{GeofenceEngine, PoseAssessment};
pub use zone::ExclusionZone;
