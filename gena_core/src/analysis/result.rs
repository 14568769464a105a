//! Tables produced by flux balance and flux variability analyses
use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

use crate::network::reaction::FluxSimulation;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::SolverOutcome;
use crate::optimize::OptimizationStatus;
use crate::utils::stats::{ks_p_value, ks_statistic};

/// Quantile of the normal fit of the residuals used for the zero flux threshold
const ZERO_FLUX_QUANTILE: f64 = 0.995;

/// Flux of a reaction in one simulation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluxRow {
    pub simulation: usize,
    pub reaction_id: String,
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Mass balance residual of a steady compound in one simulation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SvRow {
    pub simulation: usize,
    pub compound_id: String,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverStatusRow {
    pub simulation: usize,
    pub success: bool,
    pub status: OptimizationStatus,
    pub message: String,
    pub objective_value: Option<f64>,
}

/// Mean and standard deviation of a flux over the successful simulations
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluxStatistics {
    pub mean: f64,
    pub std: f64,
    /// Number of simulations the statistics are computed on
    pub count: usize,
}

/// Approximate threshold under which a flux can't be told apart from numerical noise
///
/// Estimated from a normal fit of the mass balance residuals, this is a heuristic
/// rather than an exact bound.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZeroFluxThreshold {
    pub threshold: f64,
    /// p-value of the Kolmogorov-Smirnov test of the normal fit
    pub p_value: f64,
}

/// Result of an FBA task, rows of every simulation in simulation order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FbaResult {
    pub fluxes: Vec<FluxRow>,
    pub sv: Vec<SvRow>,
    pub solver_status: Vec<SolverStatusRow>,
}

/// FVA results share the layout of FBA results, the bounds holding the flux ranges
pub type FvaResult = FbaResult;

impl FbaResult {
    /// Tables of a single simulation, the bounds of each flux are its value
    ///
    /// Values of a failed solve are NaN, the last solver iterate is not a solution.
    pub fn from_outcome(simulation: usize, problem: &Problem, outcome: &SolverOutcome) -> Self {
        let solved = |value: &f64| if outcome.success { *value } else { f64::NAN };
        let fluxes = problem
            .reaction_ids
            .iter()
            .zip(&outcome.x)
            .map(|(id, value)| FluxRow {
                simulation,
                reaction_id: id.clone(),
                value: solved(value),
                lower_bound: solved(value),
                upper_bound: solved(value),
            })
            .collect();
        let sv = problem
            .steady_compound_ids
            .iter()
            .zip(&outcome.sv)
            .map(|(id, value)| SvRow {
                simulation,
                compound_id: id.clone(),
                value: solved(value),
            })
            .collect();
        Self {
            fluxes,
            sv,
            solver_status: vec![SolverStatusRow {
                simulation,
                success: outcome.success,
                status: outcome.status,
                message: outcome.message.clone(),
                objective_value: outcome.objective_value,
            }],
        }
    }

    /// Concatenate per simulation results, ordering rows by simulation
    pub fn merge(results: Vec<FbaResult>) -> FbaResult {
        let mut merged = FbaResult::default();
        for result in results {
            merged.fluxes.extend(result.fluxes);
            merged.sv.extend(result.sv);
            merged.solver_status.extend(result.solver_status);
        }
        // Stable sorts keep the reaction and compound order within a simulation
        merged.fluxes.sort_by_key(|row| row.simulation);
        merged.sv.sort_by_key(|row| row.simulation);
        merged.solver_status.sort_by_key(|row| row.simulation);
        merged
    }

    /// Set the bounds of every flux to `value ± std`, the deviation of the reaction
    /// over the successful simulations
    ///
    /// Results with fewer than two successful simulations are left unchanged.
    pub fn with_deviation_bounds(mut self) -> Self {
        let statistics = self.flux_statistics();
        if statistics.values().all(|s| s.count < 2) {
            return self;
        }
        for row in self.fluxes.iter_mut() {
            if let Some(stats) = statistics.get(&row.reaction_id) {
                if stats.count >= 2 {
                    row.lower_bound = row.value - stats.std;
                    row.upper_bound = row.value + stats.std;
                }
            }
        }
        self
    }

    pub fn num_simulations(&self) -> usize {
        self.solver_status.len()
    }

    /// Indices of the simulations whose solver converged
    pub fn successful_simulations(&self) -> Vec<usize> {
        self.solver_status
            .iter()
            .filter(|s| s.success)
            .map(|s| s.simulation)
            .collect()
    }

    pub fn is_successful(&self, simulation: usize) -> bool {
        self.solver_status
            .iter()
            .any(|s| s.simulation == simulation && s.success)
    }

    /// Flux rows of a simulation
    pub fn simulation_fluxes(&self, simulation: usize) -> impl Iterator<Item = &FluxRow> {
        self.fluxes
            .iter()
            .filter(move |row| row.simulation == simulation)
    }

    pub fn flux(&self, simulation: usize, reaction_id: &str) -> Option<&FluxRow> {
        self.simulation_fluxes(simulation)
            .find(|row| row.reaction_id == reaction_id)
    }

    /// Total absolute flux `Σ|v|` of a simulation, None for unknown or failed simulations
    pub fn total_abs_flux(&self, simulation: usize) -> Option<f64> {
        if !self.is_successful(simulation) {
            return None;
        }
        let mut rows = self.simulation_fluxes(simulation).peekable();
        rows.peek()?;
        Some(rows.map(|row| row.value.abs()).sum())
    }

    /// Solver success table, one row per simulation
    pub fn solver_success_table(&self) -> Vec<(usize, bool, String)> {
        self.solver_status
            .iter()
            .map(|s| (s.simulation, s.success, s.message.clone()))
            .collect()
    }

    fn successful_set(&self) -> HashSet<usize> {
        self.solver_status
            .iter()
            .filter(|s| s.success)
            .map(|s| s.simulation)
            .collect()
    }

    /// Per reaction statistics over the successful simulations
    pub fn flux_statistics(&self) -> IndexMap<String, FluxStatistics> {
        let successful = self.successful_set();
        let mut values: IndexMap<String, Vec<f64>> = IndexMap::new();
        for row in self
            .fluxes
            .iter()
            .filter(|row| successful.contains(&row.simulation))
        {
            values
                .entry(row.reaction_id.clone())
                .or_default()
                .push(row.value);
        }
        values
            .into_iter()
            .map(|(id, values)| {
                let count = values.len();
                let std = if count < 2 { 0. } else { values.iter().std_dev() };
                let mean = values.iter().mean();
                (id, FluxStatistics { mean, std, count })
            })
            .collect()
    }

    /// Estimate the zero flux threshold from the residuals of the successful simulations
    pub fn compute_zero_flux_threshold(&self) -> ZeroFluxThreshold {
        let successful = self.successful_set();
        let residuals: Vec<f64> = self
            .sv
            .iter()
            .filter(|row| successful.contains(&row.simulation) && row.value.is_finite())
            .map(|row| row.value)
            .collect();
        if residuals.is_empty() {
            return ZeroFluxThreshold {
                threshold: 0.,
                p_value: 1.,
            };
        }
        let mu = residuals.iter().mean();
        let degenerate = ZeroFluxThreshold {
            threshold: mu.abs(),
            p_value: 1.,
        };
        if residuals.len() < 2 {
            return degenerate;
        }
        let sigma = residuals.iter().std_dev();
        if sigma == 0. || !sigma.is_finite() {
            return degenerate;
        }
        let (Ok(fit), Ok(standard)) = (Normal::new(mu, sigma), Normal::new(0., 1.)) else {
            return degenerate;
        };
        let d = ks_statistic(&residuals, &fit);
        ZeroFluxThreshold {
            threshold: mu.abs() + standard.inverse_cdf(ZERO_FLUX_QUANTILE) * sigma,
            p_value: ks_p_value(d, residuals.len()),
        }
    }

    /// Flux values of the successful simulations, keyed by reaction id
    pub fn simulation_annotations(&self) -> IndexMap<String, Vec<FluxSimulation>> {
        let successful = self.successful_set();
        let mut annotations: IndexMap<String, Vec<FluxSimulation>> = IndexMap::new();
        for row in self
            .fluxes
            .iter()
            .filter(|row| successful.contains(&row.simulation))
        {
            annotations
                .entry(row.reaction_id.clone())
                .or_default()
                .push(FluxSimulation {
                    simulation: row.simulation,
                    value: row.value,
                    lower_bound: row.lower_bound,
                    upper_bound: row.upper_bound,
                });
        }
        annotations
    }
}
