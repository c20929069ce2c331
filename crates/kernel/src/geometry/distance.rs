//! Euclidean distance metrics and their reverse-mode gradients.

use super::point::Point3d;
use super::vector::Vec3;

/// Euclidean distance `||p - q||`.
pub fn edist(p: &Point3d, q: &Point3d) -> f64 {
    p.distance_to(q)
}

/// Gradient of [`edist`] with respect to `p` and `q`.
///
/// Undefined when the points coincide; callers keep pairs non-degenerate.
pub fn edist_grad(p: &Point3d, q: &Point3d) -> (Vec3, Vec3) {
    let diff = *p - *q;
    let d = diff.length();
    let pb = diff / d;
    (pb, -pb)
}

/// Value of the ratio `||a - b|| / ||c - d||`.
pub fn distance_ratio(a: &Point3d, b: &Point3d, c: &Point3d, d: &Point3d) -> f64 {
    edist(a, b) / edist(c, d)
}

/// Gradient of [`distance_ratio`] with respect to `a`, `b`, `c`, `d`
/// by the quotient rule.
pub fn distance_ratio_grad(a: &Point3d, b: &Point3d, c: &Point3d, d: &Point3d) -> [Vec3; 4] {
    let t = edist(a, b);
    let ch = edist(c, d);
    let (ab, bb) = edist_grad(a, b);
    let (cb, db) = edist_grad(c, d);
    let outer = t / (ch * ch);
    [ab / ch, bb / ch, cb * -outer, db * -outer]
}
