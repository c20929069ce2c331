//! The interface to the external shape parameterization.

use std::str::FromStr;

use dvcon_kernel::Point3d;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;

/// A deforming shape parameterization that owns named point sets.
///
/// Constraint containers pull their current coordinates by name whenever
/// they are evaluated; nothing is pushed to them.
pub trait GeometryParameterization {
    /// Embed `points` under `name` so later updates move them.
    fn add_point_set(&mut self, points: &[Point3d], name: &str) -> Result<(), ConstraintError>;

    /// Current coordinates of the point set `name`.
    fn update(&self, name: &str) -> Result<Vec<Point3d>, ConstraintError>;

    /// Total number of scalar design variables.
    fn num_design_vars(&self) -> usize;

    /// Names of the design-variable groups, in column order.
    fn var_names(&self) -> Vec<String>;

    /// Chain `d(metric)/d(points)` through to design-variable space.
    ///
    /// `d_points` has one row per metric and `3 * n_points` columns laid out
    /// `[x0, y0, z0, x1, ...]`; the result has one column per design variable.
    fn total_sensitivity(
        &self,
        d_points: &DMatrix<f64>,
        name: &str,
    ) -> Result<DMatrix<f64>, ConstraintError>;

    /// Local shape-variable groups, in a stable order.
    fn local_shape_groups(&self) -> &[LocalShapeGroup];

    /// Index lattice of control-point block `block`.
    fn local_index(&self, block: usize) -> Option<&LocalIndex>;

    /// Current position of global control point `index`.
    fn coefficient(&self, index: usize) -> Option<Point3d>;
}

/// A named group of local shape variables, one per listed coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalShapeGroup {
    pub name: String,
    /// Global control-point index driven by each variable of the group.
    pub coef_list: Vec<usize>,
    pub values: Vec<f64>,
}

impl LocalShapeGroup {
    pub fn new(name: impl Into<String>, coef_list: Vec<usize>) -> Self {
        let values = vec![0.0; coef_list.len()];
        Self {
            name: name.into(),
            coef_list,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ─── Block faces ───────────────────────────────────────────────────────────

/// One of the six faces of a structured control-point block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockFace {
    ILow,
    IHigh,
    JLow,
    JHigh,
    KLow,
    KHigh,
}

impl FromStr for BlockFace {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ilow" => Ok(BlockFace::ILow),
            "ihigh" => Ok(BlockFace::IHigh),
            "jlow" => Ok(BlockFace::JLow),
            "jhigh" => Ok(BlockFace::JHigh),
            "klow" => Ok(BlockFace::KLow),
            "khigh" => Ok(BlockFace::KHigh),
            _ => Err(ConstraintError::InvalidFace(s.to_string())),
        }
    }
}

/// Global control-point indices of a block, addressed by `(i, j, k)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalIndex {
    pub dims: [usize; 3],
    /// Stored with `k` fastest.
    pub indices: Vec<usize>,
}

impl LocalIndex {
    /// Number the control points of an `ni x nj x nk` block consecutively
    /// from `offset`.
    pub fn sequential(dims: [usize; 3], offset: usize) -> Self {
        let n = dims[0] * dims[1] * dims[2];
        Self {
            dims,
            indices: (offset..offset + n).collect(),
        }
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> usize {
        self.indices[(i * self.dims[1] + j) * self.dims[2] + k]
    }

    /// The 2-D slab of indices on `face`, as rows of the remaining two
    /// directions in `(i, j, k)` order.
    pub fn face(&self, face: BlockFace) -> Vec<Vec<usize>> {
        let [ni, nj, nk] = self.dims;
        let last = |n: usize| n.saturating_sub(1);
        match face {
            BlockFace::ILow | BlockFace::IHigh => {
                let i = if face == BlockFace::ILow { 0 } else { last(ni) };
                (0..nj)
                    .map(|j| (0..nk).map(|k| self.get(i, j, k)).collect())
                    .collect()
            }
            BlockFace::JLow | BlockFace::JHigh => {
                let j = if face == BlockFace::JLow { 0 } else { last(nj) };
                (0..ni)
                    .map(|i| (0..nk).map(|k| self.get(i, j, k)).collect())
                    .collect()
            }
            BlockFace::KLow | BlockFace::KHigh => {
                let k = if face == BlockFace::KLow { 0 } else { last(nk) };
                (0..ni)
                    .map(|i| (0..nj).map(|j| self.get(i, j, k)).collect())
                    .collect()
            }
        }
    }

    /// Split a face into the two opposite index sets of an LE/TE constraint.
    ///
    /// Exactly one face dimension must be 2 and the other larger than 2.
    pub fn face_index_sets(
        &self,
        face: BlockFace,
    ) -> Result<(Vec<usize>, Vec<usize>), ConstraintError> {
        let slab = self.face(face);
        let rows = slab.len();
        let cols = slab.first().map_or(0, Vec::len);
        if rows == 2 && cols > 2 {
            Ok((slab[0].clone(), slab[1].clone()))
        } else if cols == 2 && rows > 2 {
            Ok((
                slab.iter().map(|r| r[0]).collect(),
                slab.iter().map(|r| r[1]).collect(),
            ))
        } else {
            Err(ConstraintError::FaceShape { rows, cols })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_names_are_case_insensitive() {
        assert_eq!("iLow".parse::<BlockFace>().unwrap(), BlockFace::ILow);
        assert_eq!("KHIGH".parse::<BlockFace>().unwrap(), BlockFace::KHigh);
        assert!(matches!(
            "front".parse::<BlockFace>(),
            Err(ConstraintError::InvalidFace(f)) if f == "front"
        ));
    }

    #[test]
    fn test_face_slabs() {
        let lidx = LocalIndex::sequential([2, 3, 4], 0);
        assert_eq!(lidx.get(1, 2, 3), 23);
        let face = lidx.face(BlockFace::IHigh);
        assert_eq!(face.len(), 3);
        assert_eq!(face[0], vec![12, 13, 14, 15]);
        let face = lidx.face(BlockFace::KLow);
        assert_eq!(face, vec![vec![0, 4, 8], vec![12, 16, 20]]);
    }

    #[test]
    fn test_face_index_sets_two_rows() {
        // i-faces of a 4 x 2 x 3 block are 2 x 3 slabs.
        let lidx = LocalIndex::sequential([4, 2, 3], 0);
        let (a, b) = lidx.face_index_sets(BlockFace::ILow).unwrap();
        assert_eq!(a, vec![0, 1, 2]);
        assert_eq!(b, vec![3, 4, 5]);
    }

    #[test]
    fn test_face_index_sets_two_columns() {
        let lidx = LocalIndex::sequential([4, 3, 2], 0);
        let (a, b) = lidx.face_index_sets(BlockFace::IHigh).unwrap();
        assert_eq!(a, vec![18, 20, 22]);
        assert_eq!(b, vec![19, 21, 23]);
    }

    #[test]
    fn test_face_index_sets_rejects_bad_shape() {
        let lidx = LocalIndex::sequential([3, 3, 3], 0);
        let err = lidx.face_index_sets(BlockFace::JLow).unwrap_err();
        assert!(matches!(err, ConstraintError::FaceShape { rows: 3, cols: 3 }));

        let lidx = LocalIndex::sequential([3, 2, 2], 0);
        let err = lidx.face_index_sets(BlockFace::ILow).unwrap_err();
        assert!(matches!(err, ConstraintError::FaceShape { rows: 2, cols: 2 }));
    }
}
