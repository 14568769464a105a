//! Accumulation of sparse matrix entries, and conversion to the solver formats
use std::collections::BTreeMap;

use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Accumulates `(row, col, value)` entries of a sparse matrix, summing duplicates
///
/// Entries are kept in column major order, as expected by CSC based solvers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseAccumulator {
    nrows: usize,
    ncols: usize,
    entries: BTreeMap<(usize, usize), f64>,
}

impl SparseAccumulator {
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            entries: BTreeMap::new(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add `value` to the entry at (`row`, `col`)
    ///
    /// # Panics
    /// If the entry is out of the bounds of the matrix
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        assert!(
            row < self.nrows && col < self.ncols,
            "entry ({}, {}) out of a {}x{} matrix",
            row,
            col,
            self.nrows,
            self.ncols
        );
        if value != 0. {
            *self.entries.entry((col, row)).or_insert(0.) += value;
        }
    }

    /// Add `weight · rowᵀ·row` to the upper triangle of a square matrix
    ///
    /// `row` holds `(column, value)` pairs with distinct columns
    pub fn add_gram_upper(&mut self, row: &[(usize, f64)], weight: f64) {
        for &(i, a) in row {
            for &(j, b) in row {
                if i <= j {
                    self.add(i, j, weight * a * b);
                }
            }
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.entries.get(&(col, row)).copied().unwrap_or(0.)
    }

    /// Entries as `(row, col, value)`, in column major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.entries
            .iter()
            .map(|(&(col, row), &value)| (row, col, value))
    }

    /// Convert to the CSC matrix used by Clarabel
    pub fn to_clarabel(&self) -> clarabel::algebra::CscMatrix<f64> {
        let mut colptr = vec![0usize; self.ncols + 1];
        let mut rowval = Vec::with_capacity(self.nnz());
        let mut nzval = Vec::with_capacity(self.nnz());
        for (&(col, row), &value) in &self.entries {
            colptr[col + 1] += 1;
            rowval.push(row);
            nzval.push(value);
        }
        for col in 0..self.ncols {
            colptr[col + 1] += colptr[col];
        }
        clarabel::algebra::CscMatrix::new(self.nrows, self.ncols, colptr, rowval, nzval)
    }

    /// Convert to a CSR matrix, convenient for row wise access
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(self.nrows, self.ncols);
        for (row, col, value) in self.iter() {
            coo.push(row, col, value);
        }
        CsrMatrix::from(&coo)
    }
}

/// The non zero entries of a CSR row as `(column, value)` pairs
pub(crate) fn csr_row(matrix: &CsrMatrix<f64>, row: usize) -> Vec<(usize, f64)> {
    let row = matrix.row(row);
    row.col_indices()
        .iter()
        .copied()
        .zip(row.values().iter().copied())
        .collect()
}
