//! Bounds and per-constraint options.

use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;

/// A bound or scale given either once for every station or per station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Scalar(f64),
    Vector(Vec<f64>),
    Grid(Vec<Vec<f64>>),
}

impl From<f64> for Bound {
    fn from(v: f64) -> Self {
        Bound::Scalar(v)
    }
}

impl From<Vec<f64>> for Bound {
    fn from(v: Vec<f64>) -> Self {
        Bound::Vector(v)
    }
}

impl From<Vec<Vec<f64>>> for Bound {
    fn from(v: Vec<Vec<f64>>) -> Self {
        Bound::Grid(v)
    }
}

impl Bound {
    fn describe(&self) -> String {
        match self {
            Bound::Scalar(_) => "a scalar".to_string(),
            Bound::Vector(v) => format!("a vector of length {}", v.len()),
            Bound::Grid(g) => format!(
                "a grid of {} rows with lengths {:?}",
                g.len(),
                g.iter().map(Vec::len).collect::<Vec<_>>()
            ),
        }
    }

    /// One value per station of a 1-D constraint set.
    pub fn expand(&self, what: &'static str, n: usize) -> Result<Vec<f64>, ConstraintError> {
        match self {
            Bound::Scalar(v) => Ok(vec![*v; n]),
            Bound::Vector(v) if v.len() == n => Ok(v.clone()),
            other => Err(ConstraintError::BoundShape {
                what,
                expected: format!("a scalar or a vector of length {n}"),
                found: other.describe(),
            }),
        }
    }

    /// One value per station of a `rows x cols` grid, flattened row-major.
    pub fn expand_2d(
        &self,
        what: &'static str,
        rows: usize,
        cols: usize,
    ) -> Result<Vec<f64>, ConstraintError> {
        match self {
            Bound::Scalar(v) => Ok(vec![*v; rows * cols]),
            Bound::Grid(g) if g.len() == rows && g.iter().all(|r| r.len() == cols) => {
                Ok(g.iter().flatten().copied().collect())
            }
            other => Err(ConstraintError::BoundShape {
                what,
                expected: format!("a scalar or a {rows} x {cols} grid"),
                found: other.describe(),
            }),
        }
    }
}

/// Options shared by the thickness, thickness-to-chord and volume
/// constraint builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintOptions {
    pub lower: Bound,
    pub upper: Bound,
    /// Report values relative to the geometry at construction.
    pub scaled: bool,
    /// Optimizer scaling of the constraint.
    pub scale: Bound,
    /// Explicit name; a default `<kind>_N` name is generated when absent.
    pub name: Option<String>,
    /// Set to false for sets only used as intermediate quantities.
    pub add_to_optimizer: bool,
}

impl Default for ConstraintOptions {
    fn default() -> Self {
        Self {
            lower: Bound::Scalar(1.0),
            upper: Bound::Scalar(3.0),
            scaled: true,
            scale: Bound::Scalar(1.0),
            name: None,
            add_to_optimizer: true,
        }
    }
}

impl ConstraintOptions {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConstraintError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_bounds(mut self, lower: impl Into<Bound>, upper: impl Into<Bound>) -> Self {
        self.lower = lower.into();
        self.upper = upper.into();
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Physical values instead of ratios to the initial geometry.
    pub fn unscaled(mut self) -> Self {
        self.scaled = false;
        self
    }

    /// Keep the set out of the optimizer problem.
    pub fn intermediate(mut self) -> Self {
        self.add_to_optimizer = false;
        self
    }
}
