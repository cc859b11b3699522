//! Inclusion-box configuration.
//!
//! The inclusion box is axis-aligned and centered; callers configure total
//! widths, which are halved into the stored half-widths. A width that is
//! zero or negative disables inclusion checking on that axis only; with both
//! X and Y disabled no inclusion box is enforced and only exclusion zones
//! apply.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GeofenceError, GeofenceResult};

/// Default inclusion width on X, centimeters.
pub const DEFAULT_MAX_WIDTH_X_CM: f64 = 150.0;
/// Default inclusion width on Y, centimeters.
pub const DEFAULT_MAX_WIDTH_Y_CM: f64 = 150.0;
/// Default altitude ceiling, centimeters.
pub const DEFAULT_MAX_Z_CM: f64 = 120.0;
/// Default monitor poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Floor applied to the monitor poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Violation response policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeofenceMode {
    /// Violations are logged and high-level navigation is signalled to
    /// abort; in-flight primitive movement is allowed to complete.
    Soft,
    /// Violations force an emergency landing.
    Hard,
}

/// Inclusion-box geometry and monitor policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceConfig {
    /// Box center in world centimeters
    pub center: (f64, f64),
    /// Half-width on X; `None` = unconstrained on X
    pub half_width_x: Option<f64>,
    /// Half-width on Y; `None` = unconstrained on Y
    pub half_width_y: Option<f64>,
    /// Altitude floor, applied only while a ceiling is configured
    pub z_min_cm: f64,
    /// Altitude ceiling; `None` = unconstrained on Z
    pub z_max_cm: Option<f64>,
    /// Violation response policy
    pub mode: GeofenceMode,
    /// Monitor poll interval, floored at [`MIN_POLL_INTERVAL`]
    pub poll_interval: Duration,
}

impl GeofenceConfig {
    /// Validate and build a configuration from total widths.
    ///
    /// A width (or ceiling) that is zero or negative unconstrains that axis.
    /// Non-finite parameters or an altitude floor above the ceiling are
    /// rejected without partial application.
    pub fn from_widths(
        max_width_x_cm: f64,
        max_width_y_cm: f64,
        max_z_cm: f64,
        z_min_cm: f64,
        mode: GeofenceMode,
        poll_interval: Duration,
    ) -> GeofenceResult<Self> {
        for (name, value) in [
            ("max_width_x", max_width_x_cm),
            ("max_width_y", max_width_y_cm),
            ("max_z", max_z_cm),
            ("z_min", z_min_cm),
        ] {
            if !value.is_finite() {
                return Err(GeofenceError::InvalidConfiguration(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if max_z_cm > 0.0 && z_min_cm >= max_z_cm {
            return Err(GeofenceError::InvalidConfiguration(format!(
                "z_min {z_min_cm} must sit below z_max {max_z_cm}"
            )));
        }

        Ok(Self {
            center: (0.0, 0.0),
            half_width_x: axis_half_width(max_width_x_cm),
            half_width_y: axis_half_width(max_width_y_cm),
            z_min_cm,
            z_max_cm: (max_z_cm > 0.0).then_some(max_z_cm),
            mode,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        })
    }

    /// Whether `(x, y, z)` is inside the inclusion box. Unconstrained axes
    /// always pass; with every axis unconstrained the test is trivially true.
    pub fn inside_inclusion(&self, x: f64, y: f64, z: f64) -> bool {
        let (cx, cy) = self.center;
        let in_x = self
            .half_width_x
            .map_or(true, |half| (x - cx).abs() <= half);
        let in_y = self
            .half_width_y
            .map_or(true, |half| (y - cy).abs() <= half);
        let in_z = self
            .z_max_cm
            .map_or(true, |max| self.z_min_cm <= z && z <= max);
        in_x && in_y && in_z
    }

    /// Re-anchor the box center.
    pub fn recenter(&mut self, x: f64, y: f64) {
        self.center = (x, y);
    }
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            half_width_x: Some(DEFAULT_MAX_WIDTH_X_CM / 2.0),
            half_width_y: Some(DEFAULT_MAX_WIDTH_Y_CM / 2.0),
            z_min_cm: 0.0,
            z_max_cm: Some(DEFAULT_MAX_Z_CM),
            mode: GeofenceMode::Soft,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

fn axis_half_width(total_width: f64) -> Option<f64> {
    (total_width > 0.0).then_some(total_width / 2.0)
}
