//! Planar containment primitives.
//!
//! Boundary points count as inside for both shapes: the polygon test runs an
//! explicit on-segment pass before the even-odd ray cast, and the circle test
//! compares squared distances with an epsilon tolerance.

const EPS: f64 = 1e-6;

/// Even-odd point-in-polygon test with boundary inclusion.
///
/// Degenerate polygons (fewer than 3 vertices) contain nothing.
pub fn point_in_polygon(x: f64, y: f64, vertices: &[(f64, f64)]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        let (x1, y1) = vertices[i];
        let (x2, y2) = vertices[(i + 1) % n];
        if point_on_segment(x, y, x1, y1, x2, y2) {
            return true;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > y) != (yj > y) {
            let denom = if yj - yi != 0.0 { yj - yi } else { 1e-9 };
            let x_intersect = (xj - xi) * (y - yi) / denom + xi;
            if x < x_intersect {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Whether `(px, py)` lies on the segment `(x1, y1)-(x2, y2)`.
pub fn point_on_segment(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> bool {
    let cross = ((px - x1) * (y2 - y1) - (py - y1) * (x2 - x1)).abs();
    if cross > EPS {
        return false;
    }
    // Collinear: inside the segment iff the vectors to both endpoints point
    // in opposite directions.
    let dot = (px - x1) * (px - x2) + (py - y1) * (py - y2);
    dot <= EPS
}

/// Boundary-inclusive point-in-circle test via squared distances.
pub fn point_in_circle(x: f64, y: f64, cx: f64, cy: f64, radius: f64) -> bool {
    let (dx, dy) = (x - cx, y - cy);
    dx * dx + dy * dy <= radius * radius + EPS
}
