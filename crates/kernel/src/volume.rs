//! Signed hexahedron volume by pyramid decomposition, and its exact adjoint.
//!
//! Corner ordering for a cell is the bit pattern `x[a + 2b + 4c]` where `a`
//! steps the first grid direction, `b` the second and `c` goes from the up
//! surface to the down surface. A right-handed ordering gives a positive
//! volume; the mirror ordering gives the same magnitude negated.

use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;
use crate::grid::IntersectionGrid;

/// The six quadrilateral faces as closed corner cycles.
const HEX_FACES: [[usize; 4]; 6] = [
    [0, 1, 3, 2],
    [0, 2, 6, 4],
    [0, 4, 5, 1],
    [1, 5, 7, 3],
    [2, 3, 7, 6],
    [4, 6, 7, 5],
];

/// Six times the signed volume of the pyramid with quad base `(a, b, c, d)`
/// and apex `p`.
///
/// Uses the cross-diagonal area vector `(a - c) x (b - d)`, which is exact
/// for non-planar quads as well.
pub fn pyramid_volume(a: &Point3d, b: &Point3d, c: &Point3d, d: &Point3d, p: &Point3d) -> f64 {
    let base = Point3d::centroid(&[*a, *b, *c, *d]);
    let normal = (*a - *c).cross(&(*b - *d));
    (*p - base).dot(&normal)
}

/// Reverse-mode derivative of [`pyramid_volume`] with respect to
/// `[a, b, c, d, p]`.
pub fn pyramid_volume_grad(
    a: &Point3d,
    b: &Point3d,
    c: &Point3d,
    d: &Point3d,
    p: &Point3d,
) -> [Vec3; 5] {
    let w = *p - Point3d::centroid(&[*a, *b, *c, *d]);
    let u = *a - *c;
    let v = *b - *d;
    let n = u.cross(&v);

    // Through the base centroid every corner sees a quarter of -n.
    let base_b = n * -0.25;
    let ub = v.cross(&w);
    let vb = w.cross(&u);

    [base_b + ub, base_b + vb, base_b - ub, base_b - vb, n]
}

/// Signed volume of a hexahedron with corners in grid bit order.
pub fn hex_volume(x: &[Point3d; 8]) -> f64 {
    let apex = Point3d::centroid(x);
    HEX_FACES
        .iter()
        .map(|f| pyramid_volume(&x[f[0]], &x[f[1]], &x[f[2]], &x[f[3]], &apex))
        .sum::<f64>()
        / 6.0
}

/// Gradient of [`hex_volume`] with respect to all eight corners.
///
/// The apex adjoint accumulated over the six pyramids is spread back evenly
/// over the corners, since the apex is their mean.
pub fn hex_volume_grad(x: &[Point3d; 8]) -> [Vec3; 8] {
    let apex = Point3d::centroid(x);
    let mut xb = [Vec3::ZERO; 8];
    let mut apex_b = Vec3::ZERO;

    for f in &HEX_FACES {
        let g = pyramid_volume_grad(&x[f[0]], &x[f[1]], &x[f[2]], &x[f[3]], &apex);
        for (k, &corner) in f.iter().enumerate() {
            xb[corner] += g[k];
        }
        apex_b += g[4];
    }

    let share = apex_b / 8.0;
    for g in xb.iter_mut() {
        *g = (*g + share) / 6.0;
    }
    xb
}

/// Flat coordinate indices of the eight corners of cell `(i, j)`.
fn cell_indices(grid: &IntersectionGrid, i: usize, j: usize) -> [usize; 8] {
    [
        grid.index(i, j, 0),
        grid.index(i + 1, j, 0),
        grid.index(i, j + 1, 0),
        grid.index(i + 1, j + 1, 0),
        grid.index(i, j, 1),
        grid.index(i + 1, j, 1),
        grid.index(i, j + 1, 1),
        grid.index(i + 1, j + 1, 1),
    ]
}

fn cells(grid: &IntersectionGrid) -> impl Iterator<Item = [usize; 8]> + '_ {
    let n_i = grid.n_span.saturating_sub(1);
    let n_j = grid.n_chord.saturating_sub(1);
    (0..n_i).flat_map(move |i| (0..n_j).map(move |j| cell_indices(grid, i, j)))
}

/// Signed volume enclosed by an up/down grid: the sum over all
/// `(n_span - 1) x (n_chord - 1)` cells.
pub fn grid_volume(grid: &IntersectionGrid) -> f64 {
    cells(grid)
        .map(|idx| hex_volume(&idx.map(|k| grid.coords[k])))
        .sum()
}

/// Gradient of [`grid_volume`] with one entry per grid coordinate.
///
/// Corners shared by neighbouring cells accumulate every cell's contribution.
pub fn grid_volume_grad(grid: &IntersectionGrid) -> Vec<Vec3> {
    let mut out = vec![Vec3::ZERO; grid.coords.len()];
    for idx in cells(grid) {
        let g = hex_volume_grad(&idx.map(|k| grid.coords[k]));
        for (k, gk) in idx.iter().zip(g) {
            out[*k] += gk;
        }
    }
    out
}
