//! Leading/trailing-edge constraints: linear equalities tying paired
//! control-point variables to move equal and opposite.

use std::io::Write;

use tracing::{debug, info};

use crate::constraint::{DvConstraint, Sensitivity};
use crate::error::ConstraintError;
use crate::parameterization::{BlockFace, GeometryParameterization, LocalShapeGroup};
use crate::problem::{ConstraintGroup, OptimizationProblem};
use crate::sparse::SparseJacobian;
use crate::tecplot::write_segment_zone;

/// How the paired control points are selected.
#[derive(Debug, Clone, PartialEq)]
pub enum LeTeSpec {
    /// Split a face of a control-point block into its two rows.
    Face { block: usize, face: BlockFace },
    /// Two explicit, equally long lists of global control-point indices.
    IndexSets { a: Vec<usize>, b: Vec<usize> },
}

impl LeTeSpec {
    /// Build a spec from optional block/face or index-set arguments; the
    /// block form wins when both are given.
    pub fn from_parts(
        block: Option<usize>,
        face: Option<&str>,
        a: Option<Vec<usize>>,
        b: Option<Vec<usize>>,
    ) -> Result<Self, ConstraintError> {
        match (block, face, a, b) {
            (Some(block), Some(face), _, _) => Ok(LeTeSpec::Face {
                block,
                face: face.parse()?,
            }),
            (_, _, Some(a), Some(b)) => Ok(LeTeSpec::IndexSets { a, b }),
            _ => Err(ConstraintError::MissingIndexSpec),
        }
    }

    /// Resolve to the two index sets.
    pub fn index_sets(
        &self,
        geo: &dyn GeometryParameterization,
    ) -> Result<(Vec<usize>, Vec<usize>), ConstraintError> {
        match self {
            LeTeSpec::Face { block, face } => geo
                .local_index(*block)
                .ok_or(ConstraintError::UnknownBlock(*block))?
                .face_index_sets(*face),
            LeTeSpec::IndexSets { a, b } => {
                if a.len() != b.len() {
                    return Err(ConstraintError::IndexSetMismatch {
                        a: a.len(),
                        b: b.len(),
                    });
                }
                Ok((a.clone(), b.clone()))
            }
        }
    }
}

/// Constant Jacobian rows, one per index pair found in a local group.
#[derive(Debug, Clone)]
pub struct LeTeConstraint {
    name: String,
    /// Jacobian block per local shape-variable group that matched any pair.
    jac: Vec<(String, SparseJacobian)>,
    /// Global indices of every matched pair, in row order.
    pairs: Vec<(usize, usize)>,
}

impl LeTeConstraint {
    /// Match every `(a[i], b[i])` pair against the coefficient lists of the
    /// parameterization's local groups.
    ///
    /// A pair contributes a row to a group's Jacobian only when both indices
    /// appear in that group's coefficient list; other pairs are dropped.
    pub fn new(
        name: String,
        index_a: &[usize],
        index_b: &[usize],
        geo: &dyn GeometryParameterization,
    ) -> Result<Self, ConstraintError> {
        if index_a.len() != index_b.len() {
            return Err(ConstraintError::IndexSetMismatch {
                a: index_a.len(),
                b: index_b.len(),
            });
        }

        let mut jac = Vec::new();
        let mut pairs = Vec::new();
        for group in geo.local_shape_groups() {
            check_group(group)?;
            // Column of each coefficient; the last occurrence wins.
            let column = |idx: usize| group.coef_list.iter().rposition(|&c| c == idx);

            let mut rows = Vec::new();
            for (&a, &b) in index_a.iter().zip(index_b) {
                if let (Some(up), Some(down)) = (column(a), column(b)) {
                    rows.push((up, down));
                    pairs.push((a, b));
                }
            }
            if rows.is_empty() {
                continue;
            }

            let mut block = SparseJacobian::new(rows.len(), group.len());
            for (r, (up, down)) in rows.iter().enumerate() {
                block.push(r, *up, 1.0);
                block.push(r, *down, 1.0);
            }
            debug!(group = %group.name, rows = rows.len(), "LE/TE rows");
            jac.push((group.name.clone(), block));
        }

        info!(name = %name, constraints = pairs.len(), "added LE/TE constraints");
        Ok(Self { name, jac, pairs })
    }

    pub fn jacobian(&self) -> &[(String, SparseJacobian)] {
        &self.jac
    }

    /// Matched global index pairs.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }
}

fn check_group(group: &LocalShapeGroup) -> Result<(), ConstraintError> {
    if group.coef_list.len() != group.values.len() {
        return Err(ConstraintError::GroupShape {
            name: group.name.clone(),
            coefs: group.coef_list.len(),
            values: group.values.len(),
        });
    }
    Ok(())
}

impl DvConstraint for LeTeConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }

    /// `J * x` for every matched group, concatenated in group order.
    fn evaluate(&self, geo: &dyn GeometryParameterization) -> Result<Vec<f64>, ConstraintError> {
        let groups = geo.local_shape_groups();
        let mut out = Vec::with_capacity(self.len());
        for (key, block) in &self.jac {
            let group = groups
                .iter()
                .find(|g| &g.name == key)
                .ok_or_else(|| ConstraintError::UnknownDesignGroup(key.clone()))?;
            check_group(group)?;
            if group.len() != block.cols {
                return Err(ConstraintError::GroupShape {
                    name: group.name.clone(),
                    coefs: block.cols,
                    values: group.len(),
                });
            }
            out.extend(block.mul_vec(&group.values));
        }
        Ok(out)
    }

    fn evaluate_sensitivity(
        &self,
        _geo: &dyn GeometryParameterization,
    ) -> Result<Option<Sensitivity>, ConstraintError> {
        Ok(Some(Sensitivity::Linear(self.jac.clone())))
    }

    fn register(&self, problem: &mut dyn OptimizationProblem, _geo: &dyn GeometryParameterization) {
        let n = self.len();
        if n == 0 {
            return;
        }
        problem.add_con_group(ConstraintGroup {
            name: self.name.clone(),
            count: n,
            lower: vec![0.0; n],
            upper: vec![0.0; n],
            scale: vec![1.0; n],
            wrt: self.jac.iter().map(|(k, _)| k.clone()).collect(),
            linear: true,
            jac: self.jac.clone(),
        });
    }

    fn write_tecplot(
        &self,
        geo: &dyn GeometryParameterization,
        out: &mut dyn Write,
    ) -> Result<(), ConstraintError> {
        let mut nodes = Vec::with_capacity(2 * self.pairs.len());
        for &(a, b) in &self.pairs {
            for idx in [a, b] {
                nodes.push(
                    geo.coefficient(idx)
                        .ok_or(ConstraintError::UnknownCoefficient(idx))?,
                );
            }
        }
        write_segment_zone(out, &self.name, &nodes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::LinearParameterization;
    use crate::parameterization::LocalIndex;

    #[test]
    fn test_spec_from_parts() {
        assert_eq!(
            LeTeSpec::from_parts(Some(0), Some("jHigh"), None, None).unwrap(),
            LeTeSpec::Face {
                block: 0,
                face: BlockFace::JHigh
            }
        );
        assert!(matches!(
            LeTeSpec::from_parts(Some(0), Some("side"), None, None),
            Err(ConstraintError::InvalidFace(_))
        ));
        assert!(matches!(
            LeTeSpec::from_parts(Some(0), None, Some(vec![1]), None),
            Err(ConstraintError::MissingIndexSpec)
        ));
    }

    #[test]
    fn test_mismatched_sets_rejected() {
        let geo = LinearParameterization::new();
        let spec = LeTeSpec::IndexSets {
            a: vec![0, 1],
            b: vec![2],
        };
        assert!(matches!(
            spec.index_sets(&geo),
            Err(ConstraintError::IndexSetMismatch { a: 2, b: 1 })
        ));
    }

    #[test]
    fn test_face_spec_resolves_through_block() {
        let mut geo = LinearParameterization::new();
        geo.add_block(LocalIndex::sequential([3, 2, 4], 10));
        let spec = LeTeSpec::Face {
            block: 0,
            face: BlockFace::ILow,
        };
        let (a, b) = spec.index_sets(&geo).unwrap();
        assert_eq!(a, vec![10, 11, 12, 13]);
        assert_eq!(b, vec![14, 15, 16, 17]);

        let missing = LeTeSpec::Face {
            block: 3,
            face: BlockFace::ILow,
        };
        assert!(matches!(missing.index_sets(&geo), Err(ConstraintError::UnknownBlock(3))));
    }

    #[test]
    fn test_unmatched_pairs_are_dropped() {
        let mut geo = LinearParameterization::new();
        geo.add_local_group(LocalShapeGroup::new("shape", vec![5, 6, 7]));
        let con = LeTeConstraint::new("lete".to_string(), &[5, 1], &[6, 2], &geo).unwrap();
        assert_eq!(con.len(), 1);
        assert_eq!(con.pairs(), &[(5, 6)]);
        let mut problem = crate::problem::ProblemDefinition::new();
        con.register(&mut problem, &geo);
        let group = problem.get("lete").unwrap();
        assert!(group.linear);
        assert_eq!(group.upper, vec![0.0]);
        assert_eq!(group.wrt, vec!["shape".to_string()]);
    }

    #[test]
    fn test_group_with_missing_values_rejected() {
        let mut geo = LinearParameterization::new();
        geo.add_local_group(LocalShapeGroup {
            name: "shape".to_string(),
            coef_list: vec![0, 1, 2, 3],
            values: vec![0.0; 2],
        });
        let err = LeTeConstraint::new("lete".to_string(), &[2], &[3], &geo).unwrap_err();
        assert!(matches!(
            err,
            ConstraintError::GroupShape { coefs: 4, values: 2, .. }
        ));
    }

    #[test]
    fn test_group_resized_after_construction_is_an_error() {
        let mut geo = LinearParameterization::new();
        geo.add_local_group(LocalShapeGroup::new("shape", vec![0, 1]));
        let con = LeTeConstraint::new("lete".to_string(), &[0], &[1], &geo).unwrap();

        let mut shrunk = LinearParameterization::new();
        shrunk.add_local_group(LocalShapeGroup::new("shape", vec![0]));
        assert!(matches!(
            con.evaluate(&shrunk),
            Err(ConstraintError::GroupShape { coefs: 2, values: 1, .. })
        ));
    }

    #[test]
    fn test_nothing_matched_registers_nothing() {
        let mut geo = LinearParameterization::new();
        geo.add_local_group(LocalShapeGroup::new("shape", vec![5, 6, 7]));
        let con = LeTeConstraint::new("lete".to_string(), &[0], &[1], &geo).unwrap();
        assert!(con.is_empty());
        assert!(con.evaluate(&geo).unwrap().is_empty());
        let mut problem = crate::problem::ProblemDefinition::new();
        con.register(&mut problem, &geo);
        assert!(problem.constraints.is_empty());
    }
}
