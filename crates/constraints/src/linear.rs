//! A parameterization whose point sets move linearly with the design variables.

use std::collections::BTreeMap;

use dvcon_kernel::{Point3d, Vec3};
use nalgebra::DMatrix;
use tracing::debug;

use crate::error::ConstraintError;
use crate::parameterization::{GeometryParameterization, LocalIndex, LocalShapeGroup};

/// Displacement per unit of a global design variable, as a function of the
/// undeformed position.
pub type DisplacementField = Box<dyn Fn(&Point3d) -> Vec3>;

struct GlobalVar {
    name: String,
    field: DisplacementField,
    value: f64,
}

/// Moves every embedded point as `p0 + sum_k x_k * f_k(p0)`.
///
/// Local shape-variable groups, control-point coefficients and block index
/// lattices are carried for LE/TE constraints; local variables do not move
/// embedded points.
#[derive(Default)]
pub struct LinearParameterization {
    globals: Vec<GlobalVar>,
    groups: Vec<LocalShapeGroup>,
    coefficients: Vec<Point3d>,
    blocks: Vec<LocalIndex>,
    point_sets: BTreeMap<String, Vec<Point3d>>,
}

impl LinearParameterization {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scalar design variable with displacement field `field`.
    pub fn add_global_var(
        &mut self,
        name: impl Into<String>,
        field: impl Fn(&Point3d) -> Vec3 + 'static,
    ) -> &mut Self {
        self.globals.push(GlobalVar {
            name: name.into(),
            field: Box::new(field),
            value: 0.0,
        });
        self
    }

    pub fn add_local_group(&mut self, group: LocalShapeGroup) -> &mut Self {
        self.groups.push(group);
        self
    }

    pub fn add_block(&mut self, index: LocalIndex) -> &mut Self {
        self.blocks.push(index);
        self
    }

    pub fn set_coefficients(&mut self, coefficients: Vec<Point3d>) -> &mut Self {
        self.coefficients = coefficients;
        self
    }

    /// Set the values of the design-variable group `name`.
    pub fn set_design_vars(&mut self, name: &str, values: &[f64]) -> Result<(), ConstraintError> {
        if let Some(var) = self.globals.iter_mut().find(|g| g.name == name) {
            if values.len() != 1 {
                return Err(ConstraintError::BoundShape {
                    what: "design variable",
                    expected: "a single value".to_string(),
                    found: format!("{} values", values.len()),
                });
            }
            var.value = values[0];
            return Ok(());
        }
        if let Some(group) = self.groups.iter_mut().find(|g| g.name == name) {
            if values.len() != group.len() {
                return Err(ConstraintError::BoundShape {
                    what: "design variable",
                    expected: format!("{} values", group.len()),
                    found: format!("{} values", values.len()),
                });
            }
            group.values.copy_from_slice(values);
            return Ok(());
        }
        Err(ConstraintError::UnknownDesignGroup(name.to_string()))
    }

    fn base_points(&self, name: &str) -> Result<&[Point3d], ConstraintError> {
        self.point_sets
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ConstraintError::UnknownPointSet(name.to_string()))
    }
}

impl GeometryParameterization for LinearParameterization {
    fn add_point_set(&mut self, points: &[Point3d], name: &str) -> Result<(), ConstraintError> {
        if self.point_sets.contains_key(name) {
            return Err(ConstraintError::DuplicateName(name.to_string()));
        }
        debug!(name, points = points.len(), "embedded point set");
        self.point_sets.insert(name.to_string(), points.to_vec());
        Ok(())
    }

    fn update(&self, name: &str) -> Result<Vec<Point3d>, ConstraintError> {
        let base = self.base_points(name)?;
        Ok(base
            .iter()
            .map(|p0| {
                self.globals
                    .iter()
                    .fold(*p0, |p, g| p + (g.field)(p0) * g.value)
            })
            .collect())
    }

    fn num_design_vars(&self) -> usize {
        self.globals.len() + self.groups.iter().map(LocalShapeGroup::len).sum::<usize>()
    }

    fn var_names(&self) -> Vec<String> {
        self.globals
            .iter()
            .map(|g| g.name.clone())
            .chain(self.groups.iter().map(|g| g.name.clone()))
            .collect()
    }

    fn total_sensitivity(
        &self,
        d_points: &DMatrix<f64>,
        name: &str,
    ) -> Result<DMatrix<f64>, ConstraintError> {
        let base = self.base_points(name)?;
        if d_points.ncols() != 3 * base.len() {
            return Err(ConstraintError::SensitivityShape {
                name: name.to_string(),
                expected: 3 * base.len(),
                found: d_points.ncols(),
            });
        }

        // d(points)/d(x): one column per global variable, local ones stay zero.
        let mut dpdx = DMatrix::zeros(3 * base.len(), self.num_design_vars());
        for (k, g) in self.globals.iter().enumerate() {
            for (p, p0) in base.iter().enumerate() {
                let f = (g.field)(p0);
                dpdx[(3 * p, k)] = f.x;
                dpdx[(3 * p + 1, k)] = f.y;
                dpdx[(3 * p + 2, k)] = f.z;
            }
        }
        Ok(d_points * dpdx)
    }

    fn local_shape_groups(&self) -> &[LocalShapeGroup] {
        &self.groups
    }

    fn local_index(&self, block: usize) -> Option<&LocalIndex> {
        self.blocks.get(block)
    }

    fn coefficient(&self, index: usize) -> Option<Point3d> {
        self.coefficients.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn stretch_y() -> LinearParameterization {
        let mut geo = LinearParameterization::new();
        geo.add_global_var("thick", |p: &Point3d| Vec3::new(0.0, p.y, 0.0))
            .add_global_var("shift", |_: &Point3d| Vec3::X)
            .add_local_group(LocalShapeGroup::new("local", vec![0, 1, 2]));
        geo
    }

    #[test]
    fn test_update_moves_points() {
        let mut geo = stretch_y();
        geo.add_point_set(&[Point3d::new(0.0, 0.5, 0.0)], "pts").unwrap();
        geo.set_design_vars("thick", &[0.2]).unwrap();
        geo.set_design_vars("shift", &[-1.0]).unwrap();
        let p = geo.update("pts").unwrap()[0];
        assert_abs_diff_eq!(p.y, 0.6, epsilon = 1e-14);
        assert_abs_diff_eq!(p.x, -1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_design_var_bookkeeping() {
        let geo = stretch_y();
        assert_eq!(geo.num_design_vars(), 5);
        assert_eq!(geo.var_names(), vec!["thick", "shift", "local"]);
    }

    #[test]
    fn test_total_sensitivity_chains_fields() {
        let mut geo = stretch_y();
        geo.add_point_set(&[Point3d::new(0.0, 0.5, 0.0), Point3d::new(0.0, -0.5, 0.0)], "pts")
            .unwrap();
        // d/dp of (y0 - y1)
        let d = DMatrix::from_row_slice(1, 6, &[0.0, 1.0, 0.0, 0.0, -1.0, 0.0]);
        let s = geo.total_sensitivity(&d, "pts").unwrap();
        assert_eq!(s.shape(), (1, 5));
        assert_abs_diff_eq!(s[(0, 0)], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(s[(0, 1)], 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_errors() {
        let mut geo = stretch_y();
        geo.add_point_set(&[Point3d::ORIGIN], "pts").unwrap();
        assert!(matches!(
            geo.add_point_set(&[Point3d::ORIGIN], "pts"),
            Err(ConstraintError::DuplicateName(_))
        ));
        assert!(matches!(geo.update("nope"), Err(ConstraintError::UnknownPointSet(_))));
        assert!(geo.set_design_vars("local", &[1.0]).is_err());
        let bad = DMatrix::zeros(1, 4);
        assert!(matches!(
            geo.total_sensitivity(&bad, "pts"),
            Err(ConstraintError::SensitivityShape { expected: 3, found: 4, .. })
        ));
    }
}
