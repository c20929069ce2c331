//! The `DvConstraints` registry: named constraint sets over one surface.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use dvcon_kernel::geometry::nurbs::NurbsSurface;
use dvcon_kernel::grid::{build_polyline_grid, build_ruled_grid, build_thickness_to_chord_stations};
use dvcon_kernel::projection::{project_points, PointProjectionSummary};
use dvcon_kernel::{DiscretizeConfig, Point3d, Tolerance, TriangleSoup, Vec3};
use tracing::{info, instrument};

use crate::config::ConstraintOptions;
use crate::constraint::{DvConstraint, Sensitivity};
use crate::error::ConstraintError;
use crate::lete::{LeTeConstraint, LeTeSpec};
use crate::parameterization::GeometryParameterization;
use crate::problem::OptimizationProblem;
use crate::tecplot::write_header;
use crate::thickness::ThicknessConstraint;
use crate::thickness_to_chord::ThicknessToChordConstraint;
use crate::volume::VolumeConstraint;

/// Geometric constraints defined over one discretized surface and one
/// shape parameterization.
///
/// Sets are kept in insertion order per kind. Thickness-to-chord sets share
/// the thickness collection and its default-name counter.
pub struct DvConstraints<G: GeometryParameterization> {
    soup: TriangleSoup,
    geometry: Option<G>,
    tolerance: Tolerance,
    thickness: Vec<Box<dyn DvConstraint>>,
    volume: Vec<VolumeConstraint>,
    lete: Vec<LeTeConstraint>,
}

impl<G: GeometryParameterization> Default for DvConstraints<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: GeometryParameterization> DvConstraints<G> {
    pub fn new() -> Self {
        Self::with_tolerance(Tolerance::default())
    }

    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        Self {
            soup: TriangleSoup::default(),
            geometry: None,
            tolerance,
            thickness: Vec::new(),
            volume: Vec::new(),
            lete: Vec::new(),
        }
    }

    // ─── Setup ─────────────────────────────────────────────────────────────

    /// Use an already triangulated surface.
    pub fn set_surface(&mut self, soup: TriangleSoup) {
        info!(triangles = soup.len(), "set surface");
        self.soup = soup;
    }

    /// Tessellate NURBS patches into the projection surface.
    ///
    /// The current surface is kept when any patch is malformed.
    pub fn set_surface_patches(
        &mut self,
        patches: &[NurbsSurface],
        config: &DiscretizeConfig,
    ) -> Result<(), ConstraintError> {
        self.set_surface(TriangleSoup::from_surfaces(patches, config)?);
        Ok(())
    }

    pub fn surface(&self) -> &TriangleSoup {
        &self.soup
    }

    pub fn set_geometry(&mut self, geometry: G) {
        self.geometry = Some(geometry);
    }

    pub fn geometry(&self) -> Option<&G> {
        self.geometry.as_ref()
    }

    pub fn geometry_mut(&mut self) -> Option<&mut G> {
        self.geometry.as_mut()
    }

    fn require_geometry(&mut self) -> Result<&mut G, ConstraintError> {
        self.geometry.as_mut().ok_or(ConstraintError::MissingGeometry)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.thickness
            .iter()
            .map(|c| c.name())
            .chain(self.volume.iter().map(|c| c.name()))
            .chain(self.lete.iter().map(|c| c.name()))
    }

    /// The explicit name, or `<prefix>_<count>`; either must be unused.
    fn resolve_name(
        &self,
        explicit: Option<&str>,
        prefix: &str,
        count: usize,
    ) -> Result<String, ConstraintError> {
        let name = match explicit {
            Some(n) => n.to_string(),
            None => format!("{prefix}_{count}"),
        };
        if self.names().any(|n| n == name) {
            return Err(ConstraintError::DuplicateName(name));
        }
        Ok(name)
    }

    // ─── Constraint builders ───────────────────────────────────────────────

    /// Thickness at every node of an `n_span x n_chord` grid spanning the
    /// region between the leading- and trailing-edge polylines.
    #[instrument(skip(self, le, te, opts))]
    pub fn add_thickness_constraints_2d(
        &mut self,
        le: &[Point3d],
        te: &[Point3d],
        n_span: usize,
        n_chord: usize,
        opts: &ConstraintOptions,
    ) -> Result<&str, ConstraintError> {
        self.require_geometry()?;
        let lower = opts.lower.expand_2d("lower", n_span, n_chord)?;
        let upper = opts.upper.expand_2d("upper", n_span, n_chord)?;
        let scale = opts.scale.expand_2d("scale", n_span, n_chord)?;
        let name = self.resolve_name(opts.name.as_deref(), "thickness_constraints", self.thickness.len())?;

        let grid = build_ruled_grid(le, te, n_span, n_chord, &self.soup, &self.tolerance)?;
        let geo = self.require_geometry()?;
        let con = ThicknessConstraint::new(
            name,
            grid.into_coords(),
            lower,
            upper,
            scale,
            opts.scaled,
            opts.add_to_optimizer,
            geo,
        )?;
        self.thickness.push(Box::new(con));
        Ok(self.last_thickness_name())
    }

    /// Thickness at `n_con` stations along a polyline, measured along `axis`.
    #[instrument(skip(self, points, opts))]
    pub fn add_thickness_constraints_1d(
        &mut self,
        points: &[Point3d],
        n_con: usize,
        axis: Vec3,
        opts: &ConstraintOptions,
    ) -> Result<&str, ConstraintError> {
        self.require_geometry()?;
        let lower = opts.lower.expand("lower", n_con)?;
        let upper = opts.upper.expand("upper", n_con)?;
        let scale = opts.scale.expand("scale", n_con)?;
        let name = self.resolve_name(opts.name.as_deref(), "thickness_constraints", self.thickness.len())?;

        let grid = build_polyline_grid(points, n_con, &axis, &self.soup, &self.tolerance)?;
        let geo = self.require_geometry()?;
        let con = ThicknessConstraint::new(
            name,
            grid.into_coords(),
            lower,
            upper,
            scale,
            opts.scaled,
            opts.add_to_optimizer,
            geo,
        )?;
        self.thickness.push(Box::new(con));
        Ok(self.last_thickness_name())
    }

    /// Thickness-to-chord ratio at `n_con` stations along a polyline.
    ///
    /// Always reported relative to the initial ratio; `opts.scaled` is ignored.
    #[instrument(skip(self, points, opts))]
    pub fn add_thickness_to_chord_constraints_1d(
        &mut self,
        points: &[Point3d],
        n_con: usize,
        axis: Vec3,
        chord_dir: Vec3,
        opts: &ConstraintOptions,
    ) -> Result<&str, ConstraintError> {
        self.require_geometry()?;
        let lower = opts.lower.expand("lower", n_con)?;
        let upper = opts.upper.expand("upper", n_con)?;
        let scale = opts.scale.expand("scale", n_con)?;
        let name = self.resolve_name(
            opts.name.as_deref(),
            "thickness_to_chord_constraints",
            self.thickness.len(),
        )?;

        let stations = build_thickness_to_chord_stations(
            points,
            n_con,
            &axis,
            &chord_dir,
            &self.soup,
            &self.tolerance,
        )?;
        let geo = self.require_geometry()?;
        let con = ThicknessToChordConstraint::new(
            name,
            stations,
            lower,
            upper,
            scale,
            opts.add_to_optimizer,
            geo,
        )?;
        self.thickness.push(Box::new(con));
        Ok(self.last_thickness_name())
    }

    /// Volume enclosed between the up and down surfaces of the ruled grid.
    #[instrument(skip(self, le, te, opts))]
    pub fn add_volume_constraint(
        &mut self,
        le: &[Point3d],
        te: &[Point3d],
        n_span: usize,
        n_chord: usize,
        opts: &ConstraintOptions,
    ) -> Result<&str, ConstraintError> {
        self.require_geometry()?;
        let lower = single(opts.lower.expand("lower", 1)?);
        let upper = single(opts.upper.expand("upper", 1)?);
        let scale = single(opts.scale.expand("scale", 1)?);
        let name = self.resolve_name(opts.name.as_deref(), "volume_constraint", self.volume.len())?;

        let grid = build_ruled_grid(le, te, n_span, n_chord, &self.soup, &self.tolerance)?;
        let geo = self.require_geometry()?;
        let con = VolumeConstraint::new(
            name,
            grid,
            lower,
            upper,
            scale,
            opts.scaled,
            opts.add_to_optimizer,
            geo,
        )?;
        self.volume.push(con);
        Ok(self.volume.last().map_or("", |c| c.name()))
    }

    /// Linear constraints making paired control points move equal and opposite.
    #[instrument(skip(self, spec))]
    pub fn add_lete_constraints(
        &mut self,
        spec: &LeTeSpec,
        name: Option<&str>,
    ) -> Result<&str, ConstraintError> {
        let geo = self.geometry.as_ref().ok_or(ConstraintError::MissingGeometry)?;
        let name = self.resolve_name(name, "lete_constraint", self.lete.len())?;
        let (a, b) = spec.index_sets(geo)?;
        let con = LeTeConstraint::new(name, &a, &b, geo)?;
        self.lete.push(con);
        Ok(self.lete.last().map_or("", |c| c.name()))
    }

    fn last_thickness_name(&self) -> &str {
        self.thickness.last().map_or("", |c| c.name())
    }

    // ─── Optimization-time fan-out ─────────────────────────────────────────

    /// Register every set created with `add_to_optimizer`; LE/TE sets are
    /// always added as linear constraints.
    pub fn add_constraints_to_optimizer(
        &self,
        problem: &mut dyn OptimizationProblem,
    ) -> Result<(), ConstraintError> {
        let geo = self.geometry.as_ref().ok_or(ConstraintError::MissingGeometry)?;
        for con in self.all(true) {
            con.register(problem, geo);
        }
        Ok(())
    }

    fn all(&self, include_lete: bool) -> Vec<&dyn DvConstraint> {
        let mut out: Vec<&dyn DvConstraint> = Vec::new();
        for con in &self.thickness {
            out.push(&**con);
        }
        for con in &self.volume {
            out.push(con);
        }
        if include_lete {
            for con in &self.lete {
                out.push(con);
            }
        }
        out
    }

    /// Current value of every set, keyed by name.
    #[instrument(skip(self))]
    pub fn evaluate_all(
        &self,
        include_lete: bool,
    ) -> Result<BTreeMap<String, Vec<f64>>, ConstraintError> {
        let geo = self.geometry.as_ref().ok_or(ConstraintError::MissingGeometry)?;
        let mut out = BTreeMap::new();
        for con in self.all(include_lete) {
            out.insert(con.name().to_string(), con.evaluate(geo)?);
        }
        Ok(out)
    }

    /// Design-variable sensitivity of every set, keyed by name.
    ///
    /// Sets are left out entirely when the parameterization has no design
    /// variables.
    #[instrument(skip(self))]
    pub fn evaluate_all_sensitivities(
        &self,
        include_lete: bool,
    ) -> Result<BTreeMap<String, Sensitivity>, ConstraintError> {
        let geo = self.geometry.as_ref().ok_or(ConstraintError::MissingGeometry)?;
        let mut out = BTreeMap::new();
        for con in self.all(include_lete) {
            if let Some(sens) = con.evaluate_sensitivity(geo)? {
                out.insert(con.name().to_string(), sens);
            }
        }
        Ok(out)
    }

    // ─── Output ────────────────────────────────────────────────────────────

    /// Write every set as a Tecplot zone to `out`.
    pub fn write_tecplot_to(&self, out: &mut dyn Write) -> Result<(), ConstraintError> {
        let geo = self.geometry.as_ref().ok_or(ConstraintError::MissingGeometry)?;
        write_header(out)?;
        for con in self.all(true) {
            con.write_tecplot(geo, out)?;
        }
        Ok(())
    }

    /// Write every set to the Tecplot file at `path`.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn write_tecplot(&self, path: impl AsRef<Path>) -> Result<(), ConstraintError> {
        let mut out = BufWriter::new(File::create(path.as_ref())?);
        self.write_tecplot_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Closest-point projection of arbitrary points onto the surface, with
    /// a warning summary for points farther than `50 * eps`.
    pub fn project_points(&self, points: &[Point3d], eps: f64) -> PointProjectionSummary {
        project_points(points, &self.soup, eps)
    }
}

fn single(v: Vec<f64>) -> f64 {
    v.first().copied().unwrap_or_default()
}
