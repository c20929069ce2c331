//! Ray and closest-point projection onto a triangle soup.

use tracing::{instrument, warn};

use crate::discretize::TriangleSoup;
use crate::error::GeometryError;
use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;
use crate::Tolerance;

/// The two surface points found by shooting a line through a sample point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeProjection {
    /// Nearest hit along `+direction`.
    pub up: Point3d,
    /// Nearest hit along `-direction`.
    pub down: Point3d,
}

impl NodeProjection {
    /// Physical thickness at this station.
    pub fn thickness(&self) -> f64 {
        self.up.distance_to(&self.down)
    }
}

/// Möller–Trumbore line/triangle intersection.
///
/// Unlike a one-sided ray test this returns the signed line parameter `t`
/// for hits on either side of `origin`; `direction` must be unit length.
fn line_triangle_intersect(
    origin: &Point3d,
    direction: &Vec3,
    p0: &Point3d,
    e1: &Vec3,
    e2: &Vec3,
    tol: &Tolerance,
) -> Option<f64> {
    let h = direction.cross(e2);
    let a = e1.dot(&h);

    // Line is parallel to the triangle plane (or the triangle is degenerate).
    if a.abs() < tol.parallel {
        return None;
    }

    let f = 1.0 / a;
    let s = *origin - *p0;
    let u = f * s.dot(&h);
    if u < -tol.barycentric || u > 1.0 + tol.barycentric {
        return None;
    }

    let q = s.cross(e1);
    let v = f * direction.dot(&q);
    if v < -tol.barycentric || u + v > 1.0 + tol.barycentric {
        return None;
    }

    Some(f * e2.dot(&q))
}

/// Project `point` up and down along `direction` through the soup.
///
/// The direction is copied and normalized locally, so the caller's vector is
/// never modified. Fails when no hit exists on either side, including the
/// case where the point already lies on the surface (zero offsets).
pub fn project_node(
    point: &Point3d,
    direction: &Vec3,
    soup: &TriangleSoup,
    tol: &Tolerance,
) -> Result<NodeProjection, GeometryError> {
    let failed = || GeometryError::ProjectionFailed {
        point: point.to_array(),
        direction: direction.to_array(),
    };
    let dir = direction.normalized().ok_or_else(failed)?;

    let mut t_up = f64::INFINITY;
    let mut t_down = f64::NEG_INFINITY;
    for idx in 0..soup.len() {
        let hit = line_triangle_intersect(point, &dir, &soup.p0[idx], &soup.v1[idx], &soup.v2[idx], tol);
        match hit {
            Some(t) if t > tol.coincidence && t < t_up => t_up = t,
            Some(t) if t < -tol.coincidence && t > t_down => t_down = t,
            _ => {}
        }
    }

    if !t_up.is_finite() || !t_down.is_finite() {
        warn!(point = ?point.to_array(), direction = ?direction.to_array(), "node projection failed");
        return Err(failed());
    }

    Ok(NodeProjection {
        up: *point + dir * t_up,
        down: *point + dir * t_down,
    })
}

/// Closest point on a triangle (Ericson, Real-Time Collision Detection 5.1.5).
fn closest_point_on_triangle(p: &Point3d, a: &Point3d, ab: &Vec3, ac: &Vec3) -> Point3d {
    let ap = *p - *a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = ap - *ab;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *a + *ab;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return *a + *ab * v;
    }

    let cp = ap - *ac;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *a + *ac;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return *a + *ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return *a + *ab + (*ac - *ab) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    *a + *ab * v + *ac * w
}

/// Result of [`project_points`].
#[derive(Debug, Clone, PartialEq)]
pub struct PointProjectionSummary {
    /// Closest surface point for every query point.
    pub projected: Vec<Point3d>,
    /// Offset from each query point to its projection.
    pub offsets: Vec<Vec3>,
    /// Number of points farther than `50 * eps` from the surface.
    pub bad_count: usize,
    pub max_error: f64,
    /// `None` when no points were given.
    pub rms_error: Option<f64>,
}

/// One-off closest-point projection of arbitrary points onto the soup.
///
/// Unlike the grid builder this never fails: points that do not land within
/// `50 * eps` of the surface are counted and reported with a warning.
#[instrument(skip(points, soup), fields(points = points.len()))]
pub fn project_points(points: &[Point3d], soup: &TriangleSoup, eps: f64) -> PointProjectionSummary {
    let mut projected = Vec::with_capacity(points.len());
    let mut offsets = Vec::with_capacity(points.len());

    for p in points {
        let mut best = *p;
        let mut best_dist = f64::INFINITY;
        for idx in 0..soup.len() {
            let c = closest_point_on_triangle(p, &soup.p0[idx], &soup.v1[idx], &soup.v2[idx]);
            let d = p.distance_to(&c);
            if d < best_dist {
                best_dist = d;
                best = c;
            }
        }
        projected.push(best);
        offsets.push(*p - best);
    }

    let threshold = eps * 50.0;
    let mut bad_count = 0;
    let mut max_error: f64 = 0.0;
    let mut sum_sq = 0.0;
    for (p, off) in points.iter().zip(&offsets) {
        let nrm = off.length();
        max_error = max_error.max(nrm);
        sum_sq += nrm * nrm;
        if nrm > threshold {
            bad_count += 1;
            warn!(point = ?p.to_array(), delta = ?off.to_array(), "point not projected to tolerance");
        }
    }
    // An empty soup leaves every offset at zero but nothing was projected.
    if soup.is_empty() {
        bad_count = points.len();
        max_error = f64::INFINITY;
    }
    let rms_error = if points.is_empty() {
        None
    } else {
        Some((sum_sq / points.len() as f64).sqrt())
    };

    if bad_count > 0 {
        warn!(
            bad_count,
            tolerance = eps,
            max_error,
            rms_error = ?rms_error,
            "point(s) not projected to tolerance"
        );
    }

    PointProjectionSummary {
        projected,
        offsets,
        bad_count,
        max_error,
        rms_error,
    }
}
