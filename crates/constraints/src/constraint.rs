use std::io::Write;

use dvcon_kernel::{Point3d, Vec3};
use nalgebra::DMatrix;

use crate::error::ConstraintError;
use crate::parameterization::GeometryParameterization;
use crate::problem::OptimizationProblem;
use crate::sparse::SparseJacobian;

/// Derivative of a constraint set with respect to the design variables.
#[derive(Debug, Clone, PartialEq)]
pub enum Sensitivity {
    /// One row per constraint, one column per design variable.
    Dense(DMatrix<f64>),
    /// Constant Jacobian blocks, keyed by design-variable group.
    Linear(Vec<(String, SparseJacobian)>),
}

/// The contract shared by every constraint container.
pub trait DvConstraint {
    fn name(&self) -> &str;

    /// Number of constraint rows.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current values, pulled from the parameterization's latest geometry.
    fn evaluate(&self, geo: &dyn GeometryParameterization) -> Result<Vec<f64>, ConstraintError>;

    /// Derivative of [`evaluate`](Self::evaluate) with respect to the design
    /// variables, or `None` when there are none.
    fn evaluate_sensitivity(
        &self,
        geo: &dyn GeometryParameterization,
    ) -> Result<Option<Sensitivity>, ConstraintError>;

    /// Add this set to `problem` if it was created for the optimizer.
    fn register(&self, problem: &mut dyn OptimizationProblem, geo: &dyn GeometryParameterization);

    fn write_tecplot(
        &self,
        geo: &dyn GeometryParameterization,
        out: &mut dyn Write,
    ) -> Result<(), ConstraintError>;
}

/// Scatter per-point gradients into row `row` of a `d(metric)/d(points)`
/// matrix laid out `[x0, y0, z0, x1, ...]`.
pub(crate) fn scatter_point_grad(m: &mut DMatrix<f64>, row: usize, point: usize, g: &Vec3) {
    m[(row, 3 * point)] += g.x;
    m[(row, 3 * point + 1)] += g.y;
    m[(row, 3 * point + 2)] += g.z;
}

/// Pull `name` from the parameterization, checking the point count is unchanged.
pub(crate) fn pull_points(
    geo: &dyn GeometryParameterization,
    name: &str,
    expected: usize,
) -> Result<Vec<Point3d>, ConstraintError> {
    let coords = geo.update(name)?;
    if coords.len() != expected {
        return Err(dvcon_kernel::GeometryError::CoordinateCount {
            expected,
            found: coords.len(),
        }
        .into());
    }
    Ok(coords)
}
