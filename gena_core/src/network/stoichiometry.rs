//! Construction of the stoichiometric matrices of a network
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::network::network::Network;

/// A stoichiometric matrix (compounds × reactions) with its row and column ids
#[derive(Clone, Debug)]
pub struct StoichiometricMatrix {
    /// Compound ids, in row order
    pub row_ids: Vec<String>,
    /// Reaction ids, in column order
    pub column_ids: Vec<String>,
    /// Signed stoichiometric coefficients
    pub matrix: CscMatrix<f64>,
}

impl StoichiometricMatrix {
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    /// Coefficient at (`row`, `col`), zero for structural zeros and out of bounds indices
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix
            .get_entry(row, col)
            .map(|entry| entry.into_value())
            .unwrap_or(0.)
    }

    /// Coefficient of a compound in a reaction, by ids
    pub fn get_by_id(&self, compound_id: &str, reaction_id: &str) -> Option<f64> {
        let row = self.row_ids.iter().position(|id| id == compound_id)?;
        let col = self.column_ids.iter().position(|id| id == reaction_id)?;
        Some(self.get(row, col))
    }

    /// Compute `S · v`, None when the length of `v` doesn't match the number of columns
    pub fn mul_vector(&self, v: &DVector<f64>) -> Option<DVector<f64>> {
        if v.len() != self.ncols() {
            return None;
        }
        let mut out = DVector::zeros(self.nrows());
        for (row, col, coef) in self.matrix.triplet_iter() {
            out[row] += coef * v[col];
        }
        Some(out)
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.nrows(), self.ncols());
        for (row, col, coef) in self.matrix.triplet_iter() {
            dense[(row, col)] += *coef;
        }
        dense
    }
}

/// Which compound rows a stoichiometric matrix holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoichiometryRows {
    /// Every compound
    Full,
    /// Compounds of steady (intracellular) compartments
    Steady,
    /// Compounds of extracellular, biomass and sink compartments
    NonSteady,
}

/// Builds stoichiometric matrices from a network
///
/// Rows follow the insertion order of the compounds and columns the insertion order
/// of the reactions.
pub struct StoichiometryBuilder<'a> {
    network: &'a Network,
    exclude_cofactors: bool,
}

impl<'a> StoichiometryBuilder<'a> {
    pub fn new(network: &'a Network) -> Self {
        Self {
            network,
            exclude_cofactors: false,
        }
    }

    /// Leave out the rows of cofactor compounds
    pub fn exclude_cofactors(mut self, exclude: bool) -> Self {
        self.exclude_cofactors = exclude;
        self
    }

    pub fn build_full(&self) -> StoichiometricMatrix {
        self.build(StoichiometryRows::Full)
    }

    pub fn build_steady(&self) -> StoichiometricMatrix {
        self.build(StoichiometryRows::Steady)
    }

    pub fn build_nonsteady(&self) -> StoichiometricMatrix {
        self.build(StoichiometryRows::NonSteady)
    }

    pub fn build(&self, rows: StoichiometryRows) -> StoichiometricMatrix {
        let row_ids: Vec<String> = self
            .network
            .compounds()
            .values()
            .filter(|compound| !(self.exclude_cofactors && compound.is_cofactor()))
            .filter(|compound| {
                let steady = self.network.is_steady_compound(&compound.id);
                match rows {
                    StoichiometryRows::Full => true,
                    StoichiometryRows::Steady => steady,
                    StoichiometryRows::NonSteady => !steady,
                }
            })
            .map(|compound| compound.id.clone())
            .collect();
        let row_index: indexmap::IndexMap<&str, usize> = row_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let column_ids = self.network.reaction_ids();

        let mut coo = CooMatrix::new(row_ids.len(), column_ids.len());
        for (col, rxn) in self.network.reactions().values().enumerate() {
            for (compound_id, coef) in &rxn.metabolites {
                if let Some(&row) = row_index.get(compound_id.as_str()) {
                    coo.push(row, col, *coef);
                }
            }
        }

        StoichiometricMatrix {
            row_ids,
            column_ids,
            matrix: CscMatrix::from(&coo),
        }
    }
}
