//! The interface to the optimizer problem definition.

use crate::sparse::SparseJacobian;

/// A block of constraints as handed to the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintGroup {
    pub name: String,
    pub count: usize,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub scale: Vec<f64>,
    /// Design-variable groups the constraint depends on.
    pub wrt: Vec<String>,
    /// Linear groups carry their constant Jacobian per design-variable group.
    pub linear: bool,
    pub jac: Vec<(String, SparseJacobian)>,
}

/// Receives constraint definitions.
pub trait OptimizationProblem {
    /// A single scalar constraint.
    fn add_con(&mut self, name: &str, lower: f64, upper: f64, scale: f64, wrt: &[String]);

    fn add_con_group(&mut self, group: ConstraintGroup);
}

/// An [`OptimizationProblem`] that records every definition in order.
#[derive(Debug, Clone, Default)]
pub struct ProblemDefinition {
    pub constraints: Vec<ConstraintGroup>,
}

impl ProblemDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ConstraintGroup> {
        self.constraints.iter().find(|c| c.name == name)
    }

    /// Total number of constraint rows.
    pub fn num_constraints(&self) -> usize {
        self.constraints.iter().map(|c| c.count).sum()
    }
}

impl OptimizationProblem for ProblemDefinition {
    fn add_con(&mut self, name: &str, lower: f64, upper: f64, scale: f64, wrt: &[String]) {
        self.constraints.push(ConstraintGroup {
            name: name.to_string(),
            count: 1,
            lower: vec![lower],
            upper: vec![upper],
            scale: vec![scale],
            wrt: wrt.to_vec(),
            linear: false,
            jac: Vec::new(),
        });
    }

    fn add_con_group(&mut self, group: ConstraintGroup) {
        self.constraints.push(group);
    }
}
