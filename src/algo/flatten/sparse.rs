//! Sparse matrix and conjugate gradient solver.
//!
//! This module provides a lightweight sparse matrix implementation (CSR format)
//! and a conjugate gradient solver for the symmetric positive definite systems
//! produced by pin elimination.

use nalgebra::DVector;
use rayon::prelude::*;

use crate::error::{FlattenError, Result};

/// Compressed Sparse Row (CSR) matrix.
///
/// Stores a sparse matrix in CSR format for efficient matrix-vector multiplication.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    /// Number of rows.
    rows: usize,
    /// Number of columns.
    cols: usize,
    /// Row pointers: row_ptr[i] is the index in col_idx/values where row i starts.
    /// Length is rows + 1, with row_ptr[rows] = nnz.
    row_ptr: Vec<usize>,
    /// Column indices for each non-zero value.
    col_idx: Vec<usize>,
    /// Non-zero values.
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries at the same (row, col) are summed.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        triplets.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut counts = vec![0usize; rows];
        let mut prev: Option<(usize, usize)> = None;

        for (row, col, val) in triplets {
            debug_assert!(row < rows && col < cols, "triplet out of bounds");
            if prev == Some((row, col)) {
                // Same position: accumulate value
                let last = values.len() - 1;
                values[last] += val;
            } else {
                col_idx.push(col);
                values.push(val);
                counts[row] += 1;
                prev = Some((row, col));
            }
        }

        // Prefix-sum the per-row entry counts into row pointers
        let mut row_ptr = vec![0usize; rows + 1];
        for r in 0..rows {
            row_ptr[r + 1] = row_ptr[r] + counts[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of non-zero entries.
    #[inline]
    #[allow(dead_code)]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Dot product of row `i` with `x`.
    #[inline]
    fn row_dot(&self, i: usize, x: &DVector<f64>) -> f64 {
        let start = self.row_ptr[i];
        let end = self.row_ptr[i + 1];

        let mut sum = 0.0;
        for k in start..end {
            sum += self.values[k] * x[self.col_idx[k]];
        }
        sum
    }

    /// Multiply matrix by vector: y = A * x.
    ///
    /// Rows are independent, so the parallel path is deterministic: each
    /// output element is accumulated serially by exactly one task.
    pub fn mul_vec(&self, x: &DVector<f64>, parallel: bool) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");

        let y: Vec<f64> = if parallel {
            (0..self.rows)
                .into_par_iter()
                .map(|i| self.row_dot(i, x))
                .collect()
        } else {
            (0..self.rows).map(|i| self.row_dot(i, x)).collect()
        };

        DVector::from_vec(y)
    }
}

/// Solve A*x = b using the Conjugate Gradient method.
///
/// Requires A to be symmetric positive definite.
///
/// # Arguments
///
/// * `a` - The system matrix (must be symmetric positive definite)
/// * `b` - The right-hand side vector
/// * `x0` - Optional initial guess (zeros if None)
/// * `max_iter` - Maximum number of iterations
/// * `tolerance` - Convergence tolerance (relative residual norm)
/// * `parallel` - Whether matrix-vector products run row-parallel
///
/// # Returns
///
/// The solution vector x, or [`FlattenError::SingularSystem`] if convergence
/// fails within `max_iter` iterations.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    max_iter: usize,
    tolerance: f64,
    parallel: bool,
) -> Result<DVector<f64>> {
    let n = b.len();
    assert_eq!(a.nrows(), n, "Matrix-vector dimension mismatch");
    assert_eq!(a.ncols(), n, "Matrix must be square");

    // Initial guess
    let mut x = match x0 {
        Some(x0) => x0.clone(),
        None => DVector::zeros(n),
    };

    // r = b - A*x
    let mut r = b - a.mul_vec(&x, parallel);

    // Check if initial guess is already good enough
    let b_norm = b.norm();
    if b_norm < 1e-15 {
        return Ok(x);
    }

    let mut r_norm_sq = r.dot(&r);
    if r_norm_sq.sqrt() / b_norm < tolerance {
        return Ok(x);
    }

    // p = r
    let mut p = r.clone();

    for _iter in 0..max_iter {
        // Ap = A * p
        let ap = a.mul_vec(&p, parallel);

        // alpha = (r . r) / (p . Ap)
        let p_ap = p.dot(&ap);
        if p_ap.abs() < 1e-15 {
            // Matrix is singular or nearly so
            break;
        }
        let alpha = r_norm_sq / p_ap;

        // x = x + alpha * p
        x += alpha * &p;

        // r = r - alpha * Ap
        r -= alpha * &ap;

        // Check convergence
        let new_r_norm_sq = r.dot(&r);
        if new_r_norm_sq.sqrt() / b_norm < tolerance {
            return Ok(x);
        }

        // beta = (r_new . r_new) / (r_old . r_old)
        let beta = new_r_norm_sq / r_norm_sq;

        // p = r + beta * p
        p = &r + beta * &p;

        r_norm_sq = new_r_norm_sq;
    }

    Err(FlattenError::singular(format!(
        "conjugate gradient did not converge within {} iterations (relative residual {:.3e})",
        max_iter,
        r_norm_sq.sqrt() / b_norm
    )))
}
