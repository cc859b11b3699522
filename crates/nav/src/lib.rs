//! High-level navigation: relative goto and mission sequencing.
//!
//! Large displacements are decomposed into bounded sub-steps so geofence
//! checks and cooperative cancellation happen at fine granularity. Aborts,
//! whether manual or geofence-triggered, are ordinary early termination
//! reported in the completion status, never an error: an airborne vehicle
//! must not be left in an undefined state by an unwound call stack.

pub mod goto;
pub mod mission;

pub use goto::{Displacement, NavReport, NavStatus, NavigationController};
pub use mission::{MissionReport, MissionStep};
