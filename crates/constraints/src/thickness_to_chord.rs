//! Thickness-to-chord ratio constraints, always relative to the initial ratio.

use std::io::Write;

use dvcon_kernel::geometry::distance::{distance_ratio, distance_ratio_grad};
use dvcon_kernel::{Point3d, ThicknessToChordStations};
use nalgebra::DMatrix;
use tracing::info;

use crate::constraint::{pull_points, scatter_point_grad, DvConstraint, Sensitivity};
use crate::error::ConstraintError;
use crate::parameterization::GeometryParameterization;
use crate::problem::{ConstraintGroup, OptimizationProblem};
use crate::tecplot::write_segment_zone;

/// Stations of four points each: up, down, midpoint and chord point.
///
/// The absolute ratio depends on the arbitrary chord offset, so only the
/// ratio to its value at construction is ever reported.
#[derive(Debug, Clone)]
pub struct ThicknessToChordConstraint {
    name: String,
    n_points: usize,
    lower: Vec<f64>,
    upper: Vec<f64>,
    scale: Vec<f64>,
    add_to_optimizer: bool,
    toc0: Vec<f64>,
}

impl ThicknessToChordConstraint {
    pub fn new(
        name: String,
        stations: ThicknessToChordStations,
        lower: Vec<f64>,
        upper: Vec<f64>,
        scale: Vec<f64>,
        add_to_optimizer: bool,
        geo: &mut dyn GeometryParameterization,
    ) -> Result<Self, ConstraintError> {
        let coords = stations.points;
        geo.add_point_set(&coords, &name)?;
        let toc0: Vec<f64> = coords.chunks_exact(4).map(station_ratio).collect();

        info!(name = %name, stations = toc0.len(), "added thickness-to-chord constraints");
        Ok(Self {
            name,
            n_points: coords.len(),
            lower,
            upper,
            scale,
            add_to_optimizer,
            toc0,
        })
    }

    pub fn reference(&self) -> &[f64] {
        &self.toc0
    }
}

fn station_ratio(s: &[Point3d]) -> f64 {
    distance_ratio(&s[0], &s[1], &s[2], &s[3])
}

impl DvConstraint for ThicknessToChordConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.toc0.len()
    }

    fn evaluate(&self, geo: &dyn GeometryParameterization) -> Result<Vec<f64>, ConstraintError> {
        let coords = pull_points(geo, &self.name, self.n_points)?;
        Ok(coords
            .chunks_exact(4)
            .zip(&self.toc0)
            .map(|(s, toc0)| station_ratio(s) / toc0)
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
        let mut d_dpt = DMatrix::zeros(self.len(), 3 * self.n_points);
        for (i, (s, toc0)) in coords.chunks_exact(4).zip(&self.toc0).enumerate() {
            let grads = distance_ratio_grad(&s[0], &s[1], &s[2], &s[3]);
            for (k, g) in grads.iter().enumerate() {
                scatter_point_grad(&mut d_dpt, i, 4 * i + k, &(*g / *toc0));
            }
        }
        Ok(Some(Sensitivity::Dense(
            geo.total_sensitivity(&d_dpt, &self.name)?,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::LinearParameterization;
    use approx::assert_abs_diff_eq;
    use dvcon_kernel::Vec3;

    fn station(x: f64, top: f64, bottom: f64) -> [Point3d; 4] {
        let up = Point3d::new(x, top, 0.0);
        let down = Point3d::new(x, bottom, 0.0);
        let mid = up.midpoint(&down);
        let chord = mid + Vec3::X * (0.1 * (top - bottom));
        [up, down, mid, chord]
    }

    fn stations() -> ThicknessToChordStations {
        let mut points = station(0.2, 0.3, -0.1).to_vec();
        points.extend(station(0.7, 0.12, -0.05));
        ThicknessToChordStations { points }
    }

    fn build(geo: &mut LinearParameterization) -> ThicknessToChordConstraint {
        ThicknessToChordConstraint::new(
            "toc".to_string(),
            stations(),
            vec![1.0; 2],
            vec![3.0; 2],
            vec![1.0; 2],
            true,
            geo,
        )
        .unwrap()
    }

    #[test]
    fn test_ratio_is_one_at_construction() {
        let mut geo = LinearParameterization::new();
        let con = build(&mut geo);
        assert_eq!(con.evaluate(&geo).unwrap(), vec![1.0, 1.0]);
        // The chord point sits at 10% of the thickness.
        assert_abs_diff_eq!(con.reference()[0], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sensitivity_matches_finite_difference() {
        let mut geo = LinearParameterization::new();
        // Thicken only the up points of the stations, leaving chords alone.
        geo.add_global_var("lift", |p: &Point3d| {
            if p.y > 0.11 {
                Vec3::new(0.0, 1.0, 0.0)
            } else {
                Vec3::ZERO
            }
        });
        let con = build(&mut geo);
        let Some(Sensitivity::Dense(s)) = con.evaluate_sensitivity(&geo).unwrap() else {
            panic!("expected a dense sensitivity");
        };

        let h = 1e-6;
        geo.set_design_vars("lift", &[h]).unwrap();
        let plus = con.evaluate(&geo).unwrap();
        geo.set_design_vars("lift", &[-h]).unwrap();
        let minus = con.evaluate(&geo).unwrap();
        for i in 0..2 {
            let fd = (plus[i] - minus[i]) / (2.0 * h);
            assert_abs_diff_eq!(s[(i, 0)], fd, epsilon = 1e-6);
        }
    }
}
