//! Translation of a context into the observation matrices of a network
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::configuration::{default_lower_bound, default_upper_bound};
use crate::context::measure::{check_ordering, Measure};
use crate::context::{Context, ContextError};
use crate::network::network::Network;
use crate::network::stoichiometry::StoichiometricMatrix;
use crate::optimize::sparse::SparseAccumulator;

/// Resolved values of a measure, in a single simulation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObservationBounds {
    pub target: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence_score: f64,
}

/// Observation matrices of a single simulation
///
/// Row `i` describes measure `i`: `C` holds its reaction flux coefficients, `R` its
/// compound pool variation coefficients and `b[i]` its resolved values. Missing
/// values are already replaced with their defaults.
#[derive(Clone, Debug)]
pub struct ObservationMatrix {
    /// Measure ids, in row order
    pub measure_ids: Vec<String>,
    /// Reaction ids, in column order of `c`
    pub reaction_ids: Vec<String>,
    /// Compound ids, in column order of `r`
    pub compound_ids: Vec<String>,
    /// Measures × reactions
    pub c: SparseAccumulator,
    /// Measures × compounds
    pub r: SparseAccumulator,
    pub b: Vec<ObservationBounds>,
}

impl ObservationMatrix {
    pub fn num_measures(&self) -> usize {
        self.measure_ids.len()
    }

    /// Rows of `C + R·S_full`, as `(reaction column, coefficient)` pairs
    ///
    /// Pool variation terms are expressed in reaction space through the full
    /// stoichiometric matrix, whose rows must follow `compound_ids`.
    pub fn effective_rows(&self, s_full: &StoichiometricMatrix) -> Vec<Vec<(usize, f64)>> {
        let mut stoichiometry_rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); s_full.nrows()];
        for (row, col, coef) in s_full.matrix.triplet_iter() {
            stoichiometry_rows[row].push((col, *coef));
        }

        let mut c_eff = self.c.clone();
        for (measure, compound, coef) in self.r.iter() {
            for &(reaction, s) in &stoichiometry_rows[compound] {
                c_eff.add(measure, reaction, coef * s);
            }
        }
        let mut rows = vec![Vec::new(); self.num_measures()];
        for (measure, reaction, coef) in c_eff.iter() {
            rows[measure].push((reaction, coef));
        }
        for row in rows.iter_mut() {
            row.sort_by_key(|(col, _)| *col);
        }
        rows
    }
}

/// Builds the observation matrices of contexts, in the id space of a network
pub struct ObservationMatrixBuilder<'a> {
    network: &'a Network,
    reaction_index: IndexMap<&'a str, usize>,
    compound_index: IndexMap<&'a str, usize>,
}

impl<'a> ObservationMatrixBuilder<'a> {
    pub fn new(network: &'a Network) -> Self {
        let reaction_index = network
            .reactions()
            .keys()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let compound_index = network
            .compounds()
            .keys()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        Self {
            network,
            reaction_index,
            compound_index,
        }
    }

    /// Build the observation matrices of a single simulation context
    pub fn build(&self, context: &Context) -> Result<ObservationMatrix, ObservationError> {
        if !context.is_single_simulation() {
            return Err(ObservationError::MultipleSimulations(
                context.num_simulations()?,
            ));
        }
        let num_measures = context.len();
        let mut observation = ObservationMatrix {
            measure_ids: context.measures().keys().cloned().collect(),
            reaction_ids: self.network.reaction_ids(),
            compound_ids: self.network.compound_ids(),
            c: SparseAccumulator::new(num_measures, self.reaction_index.len()),
            r: SparseAccumulator::new(num_measures, self.compound_index.len()),
            b: Vec::with_capacity(num_measures),
        };
        for (row, measure) in context.measures().values().enumerate() {
            let bounds = self.add_measure(&mut observation, row, measure)?;
            observation.b.push(bounds);
        }
        debug!(
            component = "observation",
            operation = "build",
            status = "success",
            measures = num_measures,
            reaction_terms = observation.c.nnz(),
            compound_terms = observation.r.nnz(),
            "Built observation matrices"
        );
        Ok(observation)
    }

    /// Build the observation matrices of every simulation of a context
    pub fn build_all(&self, context: &Context) -> Result<Vec<ObservationMatrix>, ObservationError> {
        let num_simulations = context.num_simulations()?;
        (0..num_simulations)
            .map(|i| self.build(&context.sub_context(i)?))
            .collect()
    }

    fn add_measure(
        &self,
        observation: &mut ObservationMatrix,
        row: usize,
        measure: &Measure,
    ) -> Result<ObservationBounds, ObservationError> {
        let mut reaction_terms: IndexMap<usize, f64> = IndexMap::new();
        let mut compound_terms: IndexMap<usize, f64> = IndexMap::new();
        for variable in &measure.variables {
            let reference = variable.reference_id.as_str();
            // Reactions shadow compounds sharing their id
            if let Some(&col) = self.reaction_index.get(reference) {
                *reaction_terms.entry(col).or_insert(0.) += variable.coefficient;
            } else if let Some(&col) = self.compound_index.get(reference) {
                *compound_terms.entry(col).or_insert(0.) += variable.coefficient;
            } else {
                return Err(ObservationError::UnresolvedReference {
                    measure: measure.id.clone(),
                    reference: variable.reference_id.clone(),
                });
            }
        }

        let (mut default_lower, mut default_upper) = (0., 0.);
        for (&col, &coef) in &reaction_terms {
            observation.c.add(row, col, coef);
            if let Some((_, rxn)) = self.network.reactions().get_index(col) {
                default_lower += (coef * rxn.lower_bound).min(coef * rxn.upper_bound);
                default_upper += (coef * rxn.lower_bound).max(coef * rxn.upper_bound);
            }
        }
        for (&col, &coef) in &compound_terms {
            observation.r.add(row, col, coef);
            let (lower, upper) = (default_lower_bound(), default_upper_bound());
            default_lower += (coef * lower).min(coef * upper);
            default_upper += (coef * lower).max(coef * upper);
        }

        let target = measure.target[0];
        let lower_bound = or_default(measure.lower_bound[0], default_lower);
        let upper_bound = or_default(measure.upper_bound[0], default_upper);
        // A missing target is not checked against the bounds
        check_ordering(&measure.id, target, lower_bound, upper_bound)?;

        let confidence_score = if target.is_nan() {
            0.
        } else {
            or_default(measure.confidence_score[0], 0.)
        };
        Ok(ObservationBounds {
            target: or_default(target, 0.),
            lower_bound,
            upper_bound,
            confidence_score,
        })
    }
}

fn or_default(value: f64, default: f64) -> f64 {
    if value.is_nan() {
        default
    } else {
        value
    }
}

/// Errors associated with building observation matrices
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObservationError {
    /// A measure variable references neither a reaction nor a compound
    #[error("Measure {measure} references {reference}, which is neither a reaction nor a compound")]
    UnresolvedReference { measure: String, reference: String },
    #[error(transparent)]
    Context(#[from] ContextError),
    /// `build` was given a context describing several simulations
    #[error("Expected a single simulation context, got {0} simulations")]
    MultipleSimulations(usize),
}
