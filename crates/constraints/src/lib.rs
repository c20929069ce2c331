//! Geometric design constraints (thickness, thickness-to-chord, volume and
//! leading/trailing-edge) with exact design-variable sensitivities.

pub mod config;
pub mod constraint;
pub mod error;
pub mod lete;
pub mod linear;
pub mod parameterization;
pub mod problem;
pub mod registry;
pub mod sparse;
mod tecplot;
pub mod thickness;
pub mod thickness_to_chord;
pub mod volume;

pub use config::{Bound, ConstraintOptions};
pub use constraint::{DvConstraint, Sensitivity};
pub use error::ConstraintError;
pub use lete::{LeTeConstraint, LeTeSpec};
pub use linear::LinearParameterization;
pub use parameterization::{BlockFace, GeometryParameterization, LocalIndex, LocalShapeGroup};
pub use problem::{ConstraintGroup, OptimizationProblem, ProblemDefinition};
pub use registry::DvConstraints;
pub use sparse::SparseJacobian;
pub use thickness::ThicknessConstraint;
pub use thickness_to_chord::ThicknessToChordConstraint;
pub use volume::VolumeConstraint;
