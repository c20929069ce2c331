pub mod discretize;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod projection;
pub mod volume;

// Re-export key types at crate root for convenience.
pub use discretize::{DiscretizeConfig, TriangleSoup};
pub use error::GeometryError;
pub use geometry::point::Point3d;
pub use geometry::vector::Vec3;
pub use grid::{IntersectionGrid, ThicknessToChordStations};
pub use projection::NodeProjection;

use serde::{Deserialize, Serialize};

/// Global tolerance configuration for ray projection queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Ray hits closer than this to the query point (in ray units) are ignored.
    pub coincidence: f64,
    /// Ray/triangle determinants smaller than this are treated as parallel.
    pub parallel: f64,
    /// Barycentric slack so hits on shared edges are not lost.
    pub barycentric: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            coincidence: 1e-10,
            parallel: 1e-14,
            barycentric: 1e-10,
        }
    }
}
