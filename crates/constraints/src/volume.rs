//! Enclosed-volume constraint over an up/down grid.

use std::io::Write;

use dvcon_kernel::volume::{grid_volume, grid_volume_grad};
use dvcon_kernel::IntersectionGrid;
use nalgebra::DMatrix;
use tracing::{info, warn};

use crate::constraint::{pull_points, scatter_point_grad, DvConstraint, Sensitivity};
use crate::error::ConstraintError;
use crate::parameterization::GeometryParameterization;
use crate::problem::OptimizationProblem;
use crate::tecplot::write_grid_zone;

#[derive(Debug, Clone)]
pub struct VolumeConstraint {
    name: String,
    n_span: usize,
    n_chord: usize,
    lower: f64,
    upper: f64,
    scale: f64,
    scaled: bool,
    add_to_optimizer: bool,
    /// Positive reference volume.
    v0: f64,
    /// `-1.0` when the grid ordering produced a negative volume at
    /// construction; applied to every later value and gradient.
    sign: f64,
}

impl VolumeConstraint {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        grid: IntersectionGrid,
        lower: f64,
        upper: f64,
        scale: f64,
        scaled: bool,
        add_to_optimizer: bool,
        geo: &mut dyn GeometryParameterization,
    ) -> Result<Self, ConstraintError> {
        let raw = grid_volume(&grid);
        if scaled && raw == 0.0 {
            return Err(ConstraintError::ZeroVolume(name));
        }
        geo.add_point_set(&grid.coords, &name)?;
        let sign = if raw < 0.0 { -1.0 } else { 1.0 };
        if sign < 0.0 {
            warn!(name = %name, "grid ordering gives a negative volume, flipping sign");
        }

        info!(name = %name, v0 = raw.abs(), scaled, "added volume constraint");
        Ok(Self {
            name,
            n_span: grid.n_span,
            n_chord: grid.n_chord,
            lower,
            upper,
            scale,
            scaled,
            add_to_optimizer,
            v0: raw.abs(),
            sign,
        })
    }

    /// Volume at construction.
    pub fn reference(&self) -> f64 {
        self.v0
    }

    pub fn is_flipped(&self) -> bool {
        self.sign < 0.0
    }

    fn current_grid(&self, geo: &dyn GeometryParameterization) -> Result<IntersectionGrid, ConstraintError> {
        let coords = pull_points(geo, &self.name, self.n_span * self.n_chord * 2)?;
        Ok(IntersectionGrid::from_coords(self.n_span, self.n_chord, coords)?)
    }

    fn factor(&self) -> f64 {
        if self.scaled {
            self.sign / self.v0
        } else {
            self.sign
        }
    }
}

impl DvConstraint for VolumeConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        1
    }

    fn evaluate(&self, geo: &dyn GeometryParameterization) -> Result<Vec<f64>, ConstraintError> {
        let grid = self.current_grid(geo)?;
        let v = grid_volume(&grid) * self.sign;
        Ok(vec![if self.scaled { v / self.v0 } else { v }])
    }

    fn evaluate_sensitivity(
        &self,
        geo: &dyn GeometryParameterization,
    ) -> Result<Option<Sensitivity>, ConstraintError> {
        if geo.num_design_vars() == 0 {
            return Ok(None);
        }
        let grid = self.current_grid(geo)?;
        let factor = self.factor();
        let mut dv_dpt = DMatrix::zeros(1, 3 * grid.coords.len());
        for (p, g) in grid_volume_grad(&grid).iter().enumerate() {
            scatter_point_grad(&mut dv_dpt, 0, p, &(*g * factor));
        }
        Ok(Some(Sensitivity::Dense(
            geo.total_sensitivity(&dv_dpt, &self.name)?,
        )))
    }

    fn register(&self, problem: &mut dyn OptimizationProblem, geo: &dyn GeometryParameterization) {
        if self.add_to_optimizer {
            problem.add_con(&self.name, self.lower, self.upper, self.scale, &geo.var_names());
        }
    }

    fn write_tecplot(
        &self,
        geo: &dyn GeometryParameterization,
        out: &mut dyn Write,
    ) -> Result<(), ConstraintError> {
        let grid = self.current_grid(geo)?;
        write_grid_zone(out, &self.name, &grid)?;
        Ok(())
    }
}
