//! Thickness constraints: the distance across every up/down pair.

use std::io::Write;

use dvcon_kernel::geometry::distance::{edist, edist_grad};
use dvcon_kernel::Point3d;
use nalgebra::DMatrix;
use tracing::{debug, info};

use crate::constraint::{pull_points, scatter_point_grad, DvConstraint, Sensitivity};
use crate::error::ConstraintError;
use crate::parameterization::GeometryParameterization;
use crate::problem::{ConstraintGroup, OptimizationProblem};
use crate::tecplot::write_segment_zone;

/// A set of thickness stations, stored as consecutive up/down pairs.
#[derive(Debug, Clone)]
pub struct ThicknessConstraint {
    name: String,
    n_points: usize,
    lower: Vec<f64>,
    upper: Vec<f64>,
    scale: Vec<f64>,
    scaled: bool,
    add_to_optimizer: bool,
    /// Thickness of every station at construction.
    d0: Vec<f64>,
}

impl ThicknessConstraint {
    /// Embed `coords` in the parameterization and capture the reference
    /// thickness of every pair.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        coords: Vec<Point3d>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        scale: Vec<f64>,
        scaled: bool,
        add_to_optimizer: bool,
        geo: &mut dyn GeometryParameterization,
    ) -> Result<Self, ConstraintError> {
        geo.add_point_set(&coords, &name)?;
        let d0: Vec<f64> = coords
            .chunks_exact(2)
            .map(|pair| edist(&pair[0], &pair[1]))
            .collect();

        info!(name = %name, stations = d0.len(), scaled, "added thickness constraints");
        Ok(Self {
            name,
            n_points: coords.len(),
            lower,
            upper,
            scale,
            scaled,
            add_to_optimizer,
            d0,
        })
    }

    /// Reference thickness of every station.
    pub fn reference(&self) -> &[f64] {
        &self.d0
    }
}

impl DvConstraint for ThicknessConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.d0.len()
    }

    fn evaluate(&self, geo: &dyn GeometryParameterization) -> Result<Vec<f64>, ConstraintError> {
        let coords = pull_points(geo, &self.name, self.n_points)?;
        Ok(coords
            .chunks_exact(2)
            .zip(&self.d0)
            .map(|(pair, d0)| {
                let d = edist(&pair[0], &pair[1]);
                if self.scaled {
                    d / d0
                } else {
                    d
                }
            })
            .collect())
    }

    fn evaluate_sensitivity(
        &self,
        geo: &dyn GeometryParameterization,
    ) -> Result<Option<Sensitivity>, ConstraintError> {
        if geo.num_design_vars() == 0 {
            return Ok(None);
        }
        let coords = pull_points(geo, &self.name, self.n_points)?;
        let mut dt_dpt = DMatrix::zeros(self.len(), 3 * self.n_points);
        for (i, d0) in self.d0.iter().enumerate() {
            let (mut p1b, mut p2b) = edist_grad(&coords[2 * i], &coords[2 * i + 1]);
            if self.scaled {
                p1b = p1b / *d0;
                p2b = p2b / *d0;
            }
            scatter_point_grad(&mut dt_dpt, i, 2 * i, &p1b);
            scatter_point_grad(&mut dt_dpt, i, 2 * i + 1, &p2b);
        }
        debug!(name = %self.name, "thickness sensitivity");
        Ok(Some(Sensitivity::Dense(
            geo.total_sensitivity(&dt_dpt, &self.name)?,
        )))
    }

    fn register(&self, problem: &mut dyn OptimizationProblem, geo: &dyn GeometryParameterization) {
        if !self.add_to_optimizer {
            return;
        }
        problem.add_con_group(ConstraintGroup {
            name: self.name.clone(),
            count: self.len(),
            lower: self.lower.clone(),
            upper: self.upper.clone(),
            scale: self.scale.clone(),
            wrt: geo.var_names(),
            linear: false,
            jac: Vec::new(),
        });
    }

    fn write_tecplot(
        &self,
        geo: &dyn GeometryParameterization,
        out: &mut dyn Write,
    ) -> Result<(), ConstraintError> {
        let coords = pull_points(geo, &self.name, self.n_points)?;
        write_segment_zone(out, &self.name, &coords)?;
        Ok(())
    }
}
