//! Two-dimensional transfinite interpolation.

use super::point::Point3d;
use super::vector::Vec3;

/// A structured `n_i x n_j` grid of points stored row-major (`i` outer).
#[derive(Debug, Clone, PartialEq)]
pub struct PointGrid {
    pub n_i: usize,
    pub n_j: usize,
    pub points: Vec<Point3d>,
}

impl PointGrid {
    pub fn get(&self, i: usize, j: usize) -> Point3d {
        self.points[i * self.n_j + j]
    }
}

/// Blend four boundary curves into an interior grid.
///
/// `e0` and `e1` run along `i` at `j = 0` and `j = n_j - 1`; `e2` and `e3`
/// run along `j` at `i = 0` and `i = n_i - 1`. Corners are expected to be
/// shared (`e0[0] == e2[0]` and so on), which holds when the closing curves
/// are built from the endpoints of the other two.
pub fn tfi_2d(e0: &[Point3d], e1: &[Point3d], e2: &[Point3d], e3: &[Point3d]) -> PointGrid {
    let n_i = e0.len();
    let n_j = e2.len();
    let param = |k: usize, n: usize| {
        if n > 1 {
            k as f64 / (n - 1) as f64
        } else {
            0.0
        }
    };

    let c00 = e0[0].to_vec3();
    let c10 = e0[n_i - 1].to_vec3();
    let c01 = e1[0].to_vec3();
    let c11 = e1[n_i - 1].to_vec3();

    let mut points = Vec::with_capacity(n_i * n_j);
    for i in 0..n_i {
        let u = param(i, n_i);
        for j in 0..n_j {
            let v = param(j, n_j);
            let blended: Vec3 = (1.0 - v) * e0[i].to_vec3()
                + v * e1[i].to_vec3()
                + (1.0 - u) * e2[j].to_vec3()
                + u * e3[j].to_vec3()
                - (u * v * c11
                    + u * (1.0 - v) * c10
                    + v * (1.0 - u) * c01
                    + (1.0 - u) * (1.0 - v) * c00);
            points.push(Point3d::ORIGIN + blended);
        }
    }

    PointGrid { n_i, n_j, points }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(a: Point3d, b: Point3d, n: usize) -> Vec<Point3d> {
        (0..n)
            .map(|k| a.lerp(&b, k as f64 / (n - 1) as f64))
            .collect()
    }

    #[test]
    fn test_tfi_unit_square_is_bilinear() {
        let p00 = Point3d::new(0.0, 0.0, 0.0);
        let p10 = Point3d::new(0.0, 0.0, 1.0);
        let p01 = Point3d::new(1.0, 0.0, 0.0);
        let p11 = Point3d::new(1.0, 0.0, 1.0);
        let grid = tfi_2d(
            &line(p00, p10, 3),
            &line(p01, p11, 3),
            &line(p00, p01, 5),
            &line(p10, p11, 5),
        );
        assert_eq!((grid.n_i, grid.n_j), (3, 5));
        let mid = grid.get(1, 2);
        assert!(mid.distance_to(&Point3d::new(0.5, 0.0, 0.5)) < 1e-12);
        assert!(grid.get(2, 4).distance_to(&p11) < 1e-12);
        assert!(grid.get(0, 4).distance_to(&p01) < 1e-12);
    }

    #[test]
    fn test_tfi_reproduces_boundaries() {
        // Curved leading edge: boundary samples must survive the blend.
        let le = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(0.3, 0.0, 1.0),
            Point3d::new(0.0, 0.0, 2.0),
        ];
        let te = line(Point3d::new(2.0, 0.0, 0.0), Point3d::new(2.0, 0.0, 2.0), 3);
        let root = line(le[0], te[0], 4);
        let tip = line(le[2], te[2], 4);
        let grid = tfi_2d(&le, &te, &root, &tip);
        for (i, p) in le.iter().enumerate() {
            assert!(grid.get(i, 0).distance_to(p) < 1e-12);
        }
        for (j, p) in tip.iter().enumerate() {
            assert!(grid.get(2, j).distance_to(p) < 1e-12);
        }
    }
}
