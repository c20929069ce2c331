//! Surface discretization into a flat triangle soup for projection queries.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::GeometryError;
use crate::geometry::nurbs::NurbsSurface;
use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;

/// Tessellation settings for [`TriangleSoup::from_surfaces`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscretizeConfig {
    /// Extra samples inserted inside every knot interval.
    pub level: usize,
}

impl Default for DiscretizeConfig {
    fn default() -> Self {
        Self { level: 1 }
    }
}

/// Unstructured triangles stored as an origin plus two edge vectors each.
///
/// Immutable once built; `set_surface` replaces the whole soup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleSoup {
    pub p0: Vec<Point3d>,
    pub v1: Vec<Vec3>,
    pub v2: Vec<Vec3>,
}

impl TriangleSoup {
    /// Wrap an already triangulated surface given as `[p0, v1, v2]`.
    pub fn from_parts(p0: Vec<Point3d>, v1: Vec<Vec3>, v2: Vec<Vec3>) -> Result<Self, GeometryError> {
        if v1.len() != p0.len() {
            return Err(GeometryError::CoordinateCount {
                expected: p0.len(),
                found: v1.len(),
            });
        }
        if v2.len() != p0.len() {
            return Err(GeometryError::CoordinateCount {
                expected: p0.len(),
                found: v2.len(),
            });
        }
        Ok(Self { p0, v1, v2 })
    }

    /// Tessellate every patch at its own knot resolution.
    ///
    /// Each parametric cell becomes two triangles fanned from opposite
    /// corners. No smoothing or refinement is applied; zero patches give an
    /// empty soup. Every patch is validated first, so a malformed one fails
    /// the whole call with `InvalidSurface`.
    #[instrument(skip(surfaces), fields(patches = surfaces.len()))]
    pub fn from_surfaces(
        surfaces: &[NurbsSurface],
        config: &DiscretizeConfig,
    ) -> Result<Self, GeometryError> {
        for surf in surfaces {
            surf.validate()?;
        }

        let mut soup = Self::default();
        for surf in surfaces {
            let (u, v) = surf.refined_params(config.level);
            for i in 0..u.len().saturating_sub(1) {
                for j in 0..v.len().saturating_sub(1) {
                    let c0 = surf.evaluate(u[i], v[j]);
                    let c1 = surf.evaluate(u[i + 1], v[j]);
                    let c2 = surf.evaluate(u[i], v[j + 1]);
                    let c3 = surf.evaluate(u[i + 1], v[j + 1]);

                    soup.push(c0, c1 - c0, c2 - c0);
                    soup.push(c3, c2 - c3, c1 - c3);
                }
            }
        }

        debug!(triangles = soup.len(), "discretized surface");
        Ok(soup)
    }

    fn push(&mut self, origin: Point3d, e1: Vec3, e2: Vec3) {
        self.p0.push(origin);
        self.v1.push(e1);
        self.v2.push(e2);
    }

    pub fn len(&self) -> usize {
        self.p0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p0.is_empty()
    }

    /// The three corners of triangle `idx`.
    pub fn corners(&self, idx: usize) -> [Point3d; 3] {
        let o = self.p0[idx];
        [o, o + self.v1[idx], o + self.v2[idx]]
    }

    /// Total area of all triangles.
    pub fn area(&self) -> f64 {
        (0..self.len())
            .map(|i| 0.5 * self.v1[i].cross(&self.v2[i]).length())
            .sum()
    }
}
