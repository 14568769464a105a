//! Provides linear constraints on the fluxes of an optimization problem
use nalgebra_sparse::CsrMatrix;

use crate::optimize::sparse::csr_row;

/// A block of linear constraints on the reaction fluxes
#[derive(Debug, Clone)]
pub enum Constraint {
    /// `matrix · v = equals`
    Equality {
        /// Name of the constraint block, for logging
        id: String,
        matrix: CsrMatrix<f64>,
        /// Right hand side, one value per row
        equals: Vec<f64>,
    },
    /// `lower_bound ≤ matrix · v ≤ upper_bound`
    Inequality {
        /// Name of the constraint block, for logging
        id: String,
        matrix: CsrMatrix<f64>,
        /// Lowest value of each row, may be `-∞`
        lower_bound: Vec<f64>,
        /// Highest value of each row, may be `+∞`
        upper_bound: Vec<f64>,
    },
}

impl Constraint {
    pub fn id(&self) -> &str {
        match self {
            Constraint::Equality { id, .. } | Constraint::Inequality { id, .. } => id,
        }
    }

    pub fn matrix(&self) -> &CsrMatrix<f64> {
        match self {
            Constraint::Equality { matrix, .. } | Constraint::Inequality { matrix, .. } => matrix,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.matrix().nrows()
    }

    /// Bounds of a row, equal for equalities
    pub fn row_bounds(&self, row: usize) -> (f64, f64) {
        match self {
            Constraint::Equality { equals, .. } => (equals[row], equals[row]),
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => (lower_bound[row], upper_bound[row]),
        }
    }

    /// The `(column, coefficient)` pairs of a row
    pub fn row(&self, row: usize) -> Vec<(usize, f64)> {
        csr_row(self.matrix(), row)
    }

    /// Check that the right hand sides match the matrix and that the bounds are ordered
    pub(crate) fn check(&self, num_variables: usize) -> Result<(), String> {
        if self.matrix().ncols() != num_variables {
            return Err(format!(
                "constraint {} has {} columns, expected {}",
                self.id(),
                self.matrix().ncols(),
                num_variables
            ));
        }
        let rhs_lengths = match self {
            Constraint::Equality { equals, .. } => vec![equals.len()],
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => vec![lower_bound.len(), upper_bound.len()],
        };
        if rhs_lengths.iter().any(|l| *l != self.num_rows()) {
            return Err(format!(
                "constraint {} has {} rows but right hand sides of lengths {:?}",
                self.id(),
                self.num_rows(),
                rhs_lengths
            ));
        }
        for row in 0..self.num_rows() {
            let (lower, upper) = self.row_bounds(row);
            if lower.is_nan() || upper.is_nan() || lower > upper {
                return Err(format!(
                    "row {} of constraint {} has bounds [{}, {}]",
                    row,
                    self.id(),
                    lower,
                    upper
                ));
            }
        }
        Ok(())
    }
}
