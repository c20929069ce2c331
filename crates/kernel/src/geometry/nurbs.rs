use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;
use crate::error::GeometryError;

/// A NURBS (Non-Uniform Rational B-Spline) curve in 3D.
///
/// Degree-1 curves built with [`NurbsCurve::polyline`] are the piecewise-linear
/// leading/trailing-edge boundaries used by the grid builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NurbsCurve {
    /// Degree of the curve.
    pub degree: usize,
    /// Control points in 3D.
    pub control_points: Vec<Point3d>,
    /// Weights for rational curves. If empty, treated as all 1.0 (non-rational).
    pub weights: Vec<f64>,
    /// Knot vector (must have len = control_points.len() + degree + 1).
    pub knots: Vec<f64>,
}

impl NurbsCurve {
    pub fn try_new(
        degree: usize,
        control_points: Vec<Point3d>,
        weights: Vec<f64>,
        knots: Vec<f64>,
    ) -> Result<Self, GeometryError> {
        if control_points.len() <= degree {
            return Err(GeometryError::InvalidSurface(format!(
                "degree {} curve needs more than {} control points",
                degree,
                control_points.len()
            )));
        }
        if knots.len() != control_points.len() + degree + 1 {
            return Err(GeometryError::InvalidSurface(
                "knot vector length must be n + p + 1".into(),
            ));
        }
        if !weights.is_empty() && weights.len() != control_points.len() {
            return Err(GeometryError::InvalidSurface(
                "weights must be empty or same length as control points".into(),
            ));
        }
        Ok(Self {
            degree,
            control_points,
            weights,
            knots,
        })
    }

    /// Create a non-rational B-spline curve.
    pub fn bspline(
        degree: usize,
        control_points: Vec<Point3d>,
        knots: Vec<f64>,
    ) -> Result<Self, GeometryError> {
        Self::try_new(degree, control_points, vec![], knots)
    }

    /// Fit a piecewise-linear curve through `points`, parameterized by
    /// normalized chord length on `[0, 1]`.
    ///
    /// Consecutive duplicate points are collapsed; fewer than two distinct
    /// points is an error.
    pub fn polyline(points: &[Point3d]) -> Result<Self, GeometryError> {
        let mut distinct: Vec<Point3d> = Vec::with_capacity(points.len());
        for p in points {
            if distinct.last().map_or(true, |last| last.distance_to(p) > 0.0) {
                distinct.push(*p);
            }
        }
        if distinct.len() < 2 {
            return Err(GeometryError::DegeneratePolyline {
                count: points.len(),
            });
        }

        let mut params = Vec::with_capacity(distinct.len());
        let mut acc = 0.0;
        params.push(0.0);
        for pair in distinct.windows(2) {
            acc += pair[0].distance_to(&pair[1]);
            params.push(acc);
        }
        for s in params.iter_mut() {
            *s /= acc;
        }
        // Guard against rounding in the final division.
        if let Some(last) = params.last_mut() {
            *last = 1.0;
        }

        let mut knots = Vec::with_capacity(params.len() + 2);
        knots.push(0.0);
        knots.extend_from_slice(&params);
        knots.push(1.0);
        Self::bspline(1, distinct, knots)
    }

    fn is_rational(&self) -> bool {
        !self.weights.is_empty()
    }

    fn weight(&self, i: usize) -> f64 {
        if self.is_rational() {
            self.weights[i]
        } else {
            1.0
        }
    }

    /// Number of control points.
    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    /// Parameter domain [t_min, t_max].
    pub fn domain(&self) -> (f64, f64) {
        (
            self.knots[self.degree],
            self.knots[self.knots.len() - self.degree - 1],
        )
    }

    fn find_span(&self, t: f64) -> usize {
        find_span(&self.knots, self.num_control_points(), self.degree, t)
    }

    /// Evaluate the curve at parameter t using de Boor's algorithm.
    pub fn evaluate(&self, t: f64) -> Point3d {
        let span = self.find_span(t);
        let basis = basis_functions(&self.knots, span, t, self.degree);
        let p = self.degree;

        let mut acc = Vec3::ZERO;
        let mut w_sum = 0.0;
        for (i, b) in basis.iter().enumerate() {
            let idx = span - p + i;
            let bw = b * self.weight(idx);
            acc += self.control_points[idx].to_vec3() * bw;
            w_sum += bw;
        }
        if self.is_rational() {
            acc = acc / w_sum;
        }
        Point3d::ORIGIN + acc
    }

    /// Evaluate at `n` uniformly spaced parameters spanning the whole domain.
    pub fn sample_uniform(&self, n: usize) -> Vec<Point3d> {
        linspace(self.domain(), n)
            .into_iter()
            .map(|t| self.evaluate(t))
            .collect()
    }
}

/// A NURBS surface patch (tensor-product).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NurbsSurface {
    pub degree_u: usize,
    pub degree_v: usize,
    /// Control points grid: [u_index * num_v + v_index]
    pub control_points: Vec<Point3d>,
    pub weights: Vec<f64>,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    pub num_u: usize,
    pub num_v: usize,
}

impl NurbsSurface {
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        degree_u: usize,
        degree_v: usize,
        control_points: Vec<Point3d>,
        weights: Vec<f64>,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        num_u: usize,
        num_v: usize,
    ) -> Result<Self, GeometryError> {
        let surf = Self {
            degree_u,
            degree_v,
            control_points,
            weights,
            knots_u,
            knots_v,
            num_u,
            num_v,
        };
        surf.validate()?;
        Ok(surf)
    }

    /// Check that the control net, weights and knot vectors are consistent.
    ///
    /// The fields are public, so patches built or deserialized directly must
    /// pass through here before being evaluated.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let (num_u, num_v) = (self.num_u, self.num_v);
        let (degree_u, degree_v) = (self.degree_u, self.degree_v);
        if num_u <= degree_u || num_v <= degree_v {
            return Err(GeometryError::InvalidSurface(format!(
                "{}x{} control net too small for degree ({}, {})",
                num_u, num_v, degree_u, degree_v
            )));
        }
        if self.control_points.len() != num_u * num_v {
            return Err(GeometryError::InvalidSurface(format!(
                "expected {} control points, found {}",
                num_u * num_v,
                self.control_points.len()
            )));
        }
        if self.knots_u.len() != num_u + degree_u + 1 || self.knots_v.len() != num_v + degree_v + 1 {
            return Err(GeometryError::InvalidSurface(
                "knot vector length must be n + p + 1 in both directions".into(),
            ));
        }
        if !self.weights.is_empty() && self.weights.len() != self.control_points.len() {
            return Err(GeometryError::InvalidSurface(
                "weights must be empty or same length as control points".into(),
            ));
        }
        for (knots, degree, n) in [(&self.knots_u, degree_u, num_u), (&self.knots_v, degree_v, num_v)] {
            if knots.iter().any(|k| !k.is_finite()) || knots.windows(2).any(|w| w[1] < w[0]) {
                return Err(GeometryError::InvalidSurface(
                    "knot vectors must be finite and non-decreasing".into(),
                ));
            }
            if knots[degree] >= knots[n] {
                return Err(GeometryError::InvalidSurface("empty parameter domain".into()));
            }
        }
        Ok(())
    }

    /// Bilinear patch through four corners: `p00` at (u0, v0), `p10` at
    /// (u1, v0), `p01` at (u0, v1) and `p11` at (u1, v1).
    pub fn bilinear(p00: Point3d, p10: Point3d, p01: Point3d, p11: Point3d) -> Self {
        Self {
            degree_u: 1,
            degree_v: 1,
            control_points: vec![p00, p01, p10, p11],
            weights: vec![],
            knots_u: vec![0.0, 0.0, 1.0, 1.0],
            knots_v: vec![0.0, 0.0, 1.0, 1.0],
            num_u: 2,
            num_v: 2,
        }
    }

    fn is_rational(&self) -> bool {
        !self.weights.is_empty()
    }

    fn weight(&self, u_idx: usize, v_idx: usize) -> f64 {
        if self.is_rational() {
            self.weights[u_idx * self.num_v + v_idx]
        } else {
            1.0
        }
    }

    pub fn domain_u(&self) -> (f64, f64) {
        (
            self.knots_u[self.degree_u],
            self.knots_u[self.knots_u.len() - self.degree_u - 1],
        )
    }

    pub fn domain_v(&self) -> (f64, f64) {
        (
            self.knots_v[self.degree_v],
            self.knots_v[self.knots_v.len() - self.degree_v - 1],
        )
    }

    /// Evaluate the surface at (u, v).
    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        let span_u = find_span(&self.knots_u, self.num_u, self.degree_u, u);
        let span_v = find_span(&self.knots_v, self.num_v, self.degree_v, v);
        let basis_u = basis_functions(&self.knots_u, span_u, u, self.degree_u);
        let basis_v = basis_functions(&self.knots_v, span_v, v, self.degree_v);

        let mut acc = Vec3::ZERO;
        let mut w_sum = 0.0;

        for (i, bu) in basis_u.iter().enumerate() {
            let u_idx = span_u - self.degree_u + i;
            for (j, bv) in basis_v.iter().enumerate() {
                let v_idx = span_v - self.degree_v + j;
                let cp = self.control_points[u_idx * self.num_v + v_idx];
                let bw = bu * bv * self.weight(u_idx, v_idx);
                acc += cp.to_vec3() * bw;
                w_sum += bw;
            }
        }

        if self.is_rational() {
            acc = acc / w_sum;
        }
        Point3d::ORIGIN + acc
    }

    /// Parameter values at which the patch is tessellated: every knot of the
    /// interior knot vector plus `level` evenly spaced values inside each
    /// knot interval, in both directions.
    pub fn refined_params(&self, level: usize) -> (Vec<f64>, Vec<f64>) {
        (
            fill_knots(&self.knots_u, self.degree_u, level),
            fill_knots(&self.knots_v, self.degree_v, level),
        )
    }
}

/// `n` evenly spaced values covering `[lo, hi]` inclusive.
pub fn linspace((lo, hi): (f64, f64), n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![lo],
        _ => (0..n)
            .map(|i| lo + (hi - lo) * (i as f64 / (n - 1) as f64))
            .collect(),
    }
}

/// Strip the clamped end knots and insert `level` samples in every interval.
fn fill_knots(knots: &[f64], degree: usize, level: usize) -> Vec<f64> {
    let interior = &knots[degree..knots.len() - degree];
    let mut out = Vec::with_capacity(interior.len() + (interior.len() - 1) * level);
    for pair in interior.windows(2) {
        let seg = linspace((pair[0], pair[1]), level + 2);
        out.extend_from_slice(&seg[..seg.len() - 1]);
    }
    if let Some(last) = interior.last() {
        out.push(*last);
    }
    out
}

/// Find the knot span index for parameter t using binary search.
fn find_span(knots: &[f64], num_ctrl: usize, degree: usize, t: f64) -> usize {
    let n = num_ctrl - 1;
    let p = degree;

    if t >= knots[n + 1] {
        // Last non-empty span so the end of the domain evaluates to the last point.
        let mut span = n;
        while span > p && knots[span] >= knots[n + 1] {
            span -= 1;
        }
        return span;
    }
    if t <= knots[p] {
        return p;
    }

    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Compute B-spline basis functions at parameter t.
fn basis_functions(knots: &[f64], span: usize, t: f64, degree: usize) -> Vec<f64> {
    let p = degree;
    let mut n_vals = vec![0.0; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    n_vals[0] = 1.0;
    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = n_vals[r] / (right[r + 1] + left[j - r]);
            n_vals[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n_vals[j] = saved;
    }
    n_vals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyline_uses_chord_length() {
        // Segment lengths 1 and 3: the knee sits at s = 0.25.
        let c = NurbsCurve::polyline(&[
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 3.0, 0.0),
        ])
        .unwrap();
        let knee = c.evaluate(0.25);
        assert!(knee.distance_to(&Point3d::new(1.0, 0.0, 0.0)) < 1e-12);
        let mid = c.evaluate(0.5);
        assert!(mid.distance_to(&Point3d::new(1.0, 1.0, 0.0)) < 1e-12);
        let end = c.evaluate(1.0);
        assert!(end.distance_to(&Point3d::new(1.0, 3.0, 0.0)) < 1e-12);
    }

    #[test]
    fn test_polyline_collapses_duplicates() {
        let c = NurbsCurve::polyline(&[
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(0.0, 0.0, 2.0),
        ])
        .unwrap();
        assert_eq!(c.num_control_points(), 2);
        let pts = c.sample_uniform(3);
        assert!((pts[1].z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_polyline_rejects_single_point() {
        let err = NurbsCurve::polyline(&[Point3d::ORIGIN, Point3d::ORIGIN]).unwrap_err();
        assert_eq!(err, GeometryError::DegeneratePolyline { count: 2 });
    }

    #[test]
    fn test_nurbs_quadratic_curve() {
        let c = NurbsCurve::bspline(
            2,
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(5.0, 10.0, 0.0),
                Point3d::new(10.0, 0.0, 0.0),
            ],
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        let mid = c.evaluate(0.5);
        assert!((mid.x - 5.0).abs() < 1e-10);
        assert!((mid.y - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_nurbs_circle_via_rational() {
        let w = std::f64::consts::FRAC_1_SQRT_2;
        let c = NurbsCurve::try_new(
            2,
            vec![
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(1.0, 1.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
            ],
            vec![1.0, w, 1.0],
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        for p in c.sample_uniform(21) {
            let r = (p.x * p.x + p.y * p.y).sqrt();
            assert!((r - 1.0).abs() < 1e-7, "radius {}", r);
        }
    }

    #[test]
    fn test_bad_knot_vector_is_error() {
        let res = NurbsCurve::bspline(1, vec![Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0)], vec![0.0, 1.0]);
        assert!(res.is_err());
    }

    #[test]
    fn test_bilinear_patch_corners() {
        let s = NurbsSurface::bilinear(
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(2.0, 0.0, 0.0),
            Point3d::new(0.0, 0.0, 3.0),
            Point3d::new(2.0, 0.0, 3.0),
        );
        assert_eq!(s.evaluate(1.0, 0.0), Point3d::new(2.0, 0.0, 0.0));
        assert_eq!(s.evaluate(0.0, 1.0), Point3d::new(0.0, 0.0, 3.0));
        let c = s.evaluate(0.5, 0.5);
        assert!(c.distance_to(&Point3d::new(1.0, 0.0, 1.5)) < 1e-12);
    }

    #[test]
    fn test_refined_params_insert_midpoints() {
        let s = NurbsSurface::try_new(
            2,
            1,
            vec![Point3d::ORIGIN; 8],
            vec![],
            vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0],
            vec![0.0, 0.0, 1.0, 1.0],
            4,
            2,
        )
        .unwrap();
        let (u, v) = s.refined_params(1);
        assert_eq!(u, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(v, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_linspace_edges() {
        assert!(linspace((0.0, 1.0), 0).is_empty());
        assert_eq!(linspace((2.0, 5.0), 1), vec![2.0]);
        assert_eq!(linspace((0.0, 1.0), 3), vec![0.0, 0.5, 1.0]);
    }
}
