//! Structured up/down sample grids projected through a triangle soup.

use tracing::{debug, instrument};

use crate::discretize::TriangleSoup;
use crate::error::GeometryError;
use crate::geometry::nurbs::NurbsCurve;
use crate::geometry::point::Point3d;
use crate::geometry::tfi::{tfi_2d, PointGrid};
use crate::geometry::vector::Vec3;
use crate::projection::project_node;
use crate::Tolerance;

// ─── Intersection grid ─────────────────────────────────────────────────────

/// `n_span x n_chord` stations, each holding an up and a down point.
///
/// Coordinates are stored span-major with the pair innermost: station
/// `(i, j)` lives at `(i * n_chord + j) * 2` (up) and `+ 1` (down). A 1-D
/// grid has `n_chord == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionGrid {
    pub n_span: usize,
    pub n_chord: usize,
    pub coords: Vec<Point3d>,
}

impl IntersectionGrid {
    /// Wrap existing pair coordinates, checking the count.
    pub fn from_coords(
        n_span: usize,
        n_chord: usize,
        coords: Vec<Point3d>,
    ) -> Result<Self, GeometryError> {
        let expected = n_span * n_chord * 2;
        if coords.len() != expected {
            return Err(GeometryError::CoordinateCount {
                expected,
                found: coords.len(),
            });
        }
        Ok(Self {
            n_span,
            n_chord,
            coords,
        })
    }

    /// Flat index of the up (`k = 0`) or down (`k = 1`) point at `(i, j)`.
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.n_chord + j) * 2 + k
    }

    pub fn up(&self, i: usize, j: usize) -> Point3d {
        self.coords[self.index(i, j, 0)]
    }

    pub fn down(&self, i: usize, j: usize) -> Point3d {
        self.coords[self.index(i, j, 1)]
    }

    pub fn num_stations(&self) -> usize {
        self.n_span * self.n_chord
    }

    pub fn into_coords(self) -> Vec<Point3d> {
        self.coords
    }
}

/// Local "up" direction at every node from finite differences of the grid.
///
/// Uses one-sided differences on the boundary rows and centered differences
/// inside, then `d/d(span) x d/d(chord)`.
fn grid_normals(grid: &PointGrid) -> Vec<Vec3> {
    let (n_i, n_j) = (grid.n_i, grid.n_j);
    let mut normals = Vec::with_capacity(n_i * n_j);
    for i in 0..n_i {
        let (ia, ib) = (i.saturating_sub(1), (i + 1).min(n_i - 1));
        for j in 0..n_j {
            let (ja, jb) = (j.saturating_sub(1), (j + 1).min(n_j - 1));
            let u_vec = grid.get(ib, j) - grid.get(ia, j);
            let v_vec = grid.get(i, jb) - grid.get(i, ja);
            normals.push(u_vec.cross(&v_vec));
        }
    }
    normals
}

/// Build the 2-D grid spanned by a leading- and trailing-edge polyline.
///
/// Both edges are fitted with chord-length polylines and closed with
/// straight root and tip lines; TFI fills the interior. Every node is
/// projected along its grid normal and any failure aborts the whole build.
#[instrument(skip(le, te, soup, tol), fields(le = le.len(), te = te.len()))]
pub fn build_ruled_grid(
    le: &[Point3d],
    te: &[Point3d],
    n_span: usize,
    n_chord: usize,
    soup: &TriangleSoup,
    tol: &Tolerance,
) -> Result<IntersectionGrid, GeometryError> {
    if n_span < 2 || n_chord < 2 {
        return Err(GeometryError::InvalidGrid { n_span, n_chord });
    }
    let le_curve = NurbsCurve::polyline(le)?;
    let te_curve = NurbsCurve::polyline(te)?;
    let root = NurbsCurve::polyline(&[le_curve.evaluate(0.0), te_curve.evaluate(0.0)])?;
    let tip = NurbsCurve::polyline(&[le_curve.evaluate(1.0), te_curve.evaluate(1.0)])?;

    let nodes = tfi_2d(
        &le_curve.sample_uniform(n_span),
        &te_curve.sample_uniform(n_span),
        &root.sample_uniform(n_chord),
        &tip.sample_uniform(n_chord),
    );
    let normals = grid_normals(&nodes);

    let mut coords = Vec::with_capacity(n_span * n_chord * 2);
    for (node, normal) in nodes.points.iter().zip(&normals) {
        let proj = project_node(node, normal, soup, tol)?;
        coords.push(proj.up);
        coords.push(proj.down);
    }

    debug!(n_span, n_chord, "built ruled intersection grid");
    Ok(IntersectionGrid {
        n_span,
        n_chord,
        coords,
    })
}

/// Sample `n_con` stations along a polyline and project each along `axis`.
#[instrument(skip(points, soup, tol), fields(points = points.len()))]
pub fn build_polyline_grid(
    points: &[Point3d],
    n_con: usize,
    axis: &Vec3,
    soup: &TriangleSoup,
    tol: &Tolerance,
) -> Result<IntersectionGrid, GeometryError> {
    if n_con < 1 {
        return Err(GeometryError::InvalidGrid {
            n_span: n_con,
            n_chord: 1,
        });
    }
    let line = NurbsCurve::polyline(points)?;

    let mut coords = Vec::with_capacity(n_con * 2);
    for node in line.sample_uniform(n_con) {
        let proj = project_node(&node, axis, soup, tol)?;
        coords.push(proj.up);
        coords.push(proj.down);
    }

    debug!(n_con, "built polyline intersection grid");
    Ok(IntersectionGrid {
        n_span: n_con,
        n_chord: 1,
        coords,
    })
}

// ─── Thickness-to-chord stations ───────────────────────────────────────────

/// Fraction of the local thickness used to place the chord point.
const CHORD_OFFSET_FACTOR: f64 = 0.1;

/// Four points per station: up, down, midpoint and chord point.
///
/// The ratio at station `i` is `|p[4i] - p[4i+1]| / |p[4i+2] - p[4i+3]|`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThicknessToChordStations {
    pub points: Vec<Point3d>,
}

impl ThicknessToChordStations {
    pub fn num_stations(&self) -> usize {
        self.points.len() / 4
    }
}

/// Project a polyline's samples along `axis` and add the chord point of
/// every station, offset from the midpoint by 10% of the local thickness.
#[instrument(skip(points, soup, tol), fields(points = points.len()))]
pub fn build_thickness_to_chord_stations(
    points: &[Point3d],
    n_con: usize,
    axis: &Vec3,
    chord_dir: &Vec3,
    soup: &TriangleSoup,
    tol: &Tolerance,
) -> Result<ThicknessToChordStations, GeometryError> {
    let chord_unit = chord_dir.normalized().ok_or(GeometryError::ZeroDirection {
        direction: chord_dir.to_array(),
    })?;
    let pairs = build_polyline_grid(points, n_con, axis, soup, tol)?;

    let mut out = Vec::with_capacity(n_con * 4);
    for pair in pairs.coords.chunks_exact(2) {
        let (up, down) = (pair[0], pair[1]);
        let height = up.distance_to(&down);
        let mid = up.midpoint(&down);
        out.extend_from_slice(&[up, down, mid, mid + chord_unit * (CHORD_OFFSET_FACTOR * height)]);
    }

    Ok(ThicknessToChordStations { points: out })
}
