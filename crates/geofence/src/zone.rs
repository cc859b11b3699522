//! Exclusion zone model.
//!
//! Zones are a closed tagged set fixed at construction: malformed shapes are
//! rejected at the API boundary instead of being tolerated at check time.
//! Each zone carries an optional altitude band; an absent bound counts as
//! satisfied.

use serde::{Deserialize, Serialize};

use crate::error::{GeofenceError, GeofenceResult};
use crate::geometry::{point_in_circle, point_in_polygon};

/// A region the vehicle must stay outside of.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum ExclusionZone {
    /// Planar polygon with an optional altitude band
    Polygon {
        /// Ordered vertices, at least 3
        vertices: Vec<(f64, f64)>,
        /// Lower altitude bound in centimeters, `None` = unbounded
        z_min_cm: Option<f64>,
        /// Upper altitude bound in centimeters, `None` = unbounded
        z_max_cm: Option<f64>,
    },
    /// Circle with an optional altitude band
    Circle {
        /// Center in world centimeters
        center: (f64, f64),
        /// Radius in centimeters, strictly positive
        radius_cm: f64,
        /// Lower altitude bound in centimeters, `None` = unbounded
        z_min_cm: Option<f64>,
        /// Upper altitude bound in centimeters, `None` = unbounded
        z_max_cm: Option<f64>,
    },
}

impl ExclusionZone {
    /// Validate and build a polygon zone.
    pub fn polygon(
        vertices: Vec<(f64, f64)>,
        z_min_cm: Option<f64>,
        z_max_cm: Option<f64>,
    ) -> GeofenceResult<Self> {
        if vertices.len() < 3 {
            return Err(GeofenceError::InvalidConfiguration(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if vertices
            .iter()
            .any(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(GeofenceError::InvalidConfiguration(
                "polygon vertices must be finite".to_string(),
            ));
        }
        validate_z_band(z_min_cm, z_max_cm)?;
        Ok(Self::Polygon {
            vertices,
            z_min_cm,
            z_max_cm,
        })
    }

    /// Validate and build a circle zone.
    pub fn circle(
        center: (f64, f64),
        radius_cm: f64,
        z_min_cm: Option<f64>,
        z_max_cm: Option<f64>,
    ) -> GeofenceResult<Self> {
        if !center.0.is_finite() || !center.1.is_finite() {
            return Err(GeofenceError::InvalidConfiguration(
                "circle center must be finite".to_string(),
            ));
        }
        if !radius_cm.is_finite() || radius_cm <= 0.0 {
            return Err(GeofenceError::InvalidConfiguration(format!(
                "circle radius must be positive, got {radius_cm}"
            )));
        }
        validate_z_band(z_min_cm, z_max_cm)?;
        Ok(Self::Circle {
            center,
            radius_cm,
            z_min_cm,
            z_max_cm,
        })
    }

    /// Whether `(x, y, z)` falls within this zone (boundary included) and
    /// inside its altitude band.
    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        let (planar, z_min, z_max) = match self {
            ExclusionZone::Polygon {
                vertices,
                z_min_cm,
                z_max_cm,
            } => (point_in_polygon(x, y, vertices), z_min_cm, z_max_cm),
            ExclusionZone::Circle {
                center,
                radius_cm,
                z_min_cm,
                z_max_cm,
            } => (
                point_in_circle(x, y, center.0, center.1, *radius_cm),
                z_min_cm,
                z_max_cm,
            ),
        };
        planar
            && z_min.map_or(true, |min| z >= min)
            && z_max.map_or(true, |max| z <= max)
    }
}

fn validate_z_band(z_min_cm: Option<f64>, z_max_cm: Option<f64>) -> GeofenceResult<()> {
    if let Some(min) = z_min_cm {
        if !min.is_finite() {
            return Err(GeofenceError::InvalidConfiguration(
                "z_min must be finite".to_string(),
            ));
        }
    }
    if let Some(max) = z_max_cm {
        if !max.is_finite() {
            return Err(GeofenceError::InvalidConfiguration(
                "z_max must be finite".to_string(),
            ));
        }
    }
    if let (Some(min), Some(max)) = (z_min_cm, z_max_cm) {
        if min > max {
            return Err(GeofenceError::InvalidConfiguration(format!(
                "inverted altitude band: z_min {min} > z_max {max}"
            )));
        }
    }
    Ok(())
}
