use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// A constant sparse Jacobian stored as coordinate triplets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseJacobian {
    pub rows: usize,
    pub cols: usize,
    pub entries: Vec<(usize, usize, f64)>,
}

impl SparseJacobian {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.rows && col < self.cols);
        self.entries.push((row, col, value));
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// `J * x`; duplicate triplets add up.
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.rows];
        for &(r, c, v) in &self.entries {
            out[r] += v * x[c];
        }
        out
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.rows, self.cols);
        for &(r, c, v) in &self.entries {
            m[(r, c)] += v;
        }
        m
    }
}
