//! Options of flux balance and flux variability tasks
use std::fs;
use std::path::Path;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::configuration::configuration;
use crate::optimize::objective::{FluxObjective, ObjectiveSense};
use crate::optimize::solvers::{SolverConfig, SolverKind};

/// Options of an FBA or FVA task
///
/// Fields missing from a JSON document take their default value, defaults of
/// `solver` and `processes` come from the global configuration.
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct FbaOptions {
    /// Solver used for every simulation
    pub solver: SolverKind,
    /// Reactions whose flux is maximized, as `reaction_id` or `reaction_id:weight`
    pub fluxes_to_maximize: Vec<String>,
    /// Reactions whose flux is minimized, as `reaction_id` or `reaction_id:weight`
    pub fluxes_to_minimize: Vec<String>,
    /// Optimize the flux of the biomass reaction, ignoring the flux lists
    pub biomass_optimization: Option<ObjectiveSense>,
    /// Replace the mass balance equality with a penalty on `‖S·v‖²`
    pub relax_qssa: bool,
    /// Weight of the mass balance penalty
    pub qssa_relaxation_strength: f64,
    /// Weight of the `Σ v²` penalty
    pub parsimony_strength: f64,
    /// Number of simulations to run, defaults to the length of the context vectors
    pub number_of_simulations: Option<usize>,
    /// Leave cofactors out of the mass balance
    pub ignore_cofactors: bool,
    /// Time limit of each solve, in seconds
    pub time_limit: Option<f64>,
    /// Number of simulations run concurrently
    pub processes: u32,
    /// Relative tolerance on the optimal objective value during FVA
    pub fva_tolerance: f64,
}

impl Default for FbaOptions {
    fn default() -> Self {
        let configuration = configuration();
        Self {
            solver: configuration.solver,
            fluxes_to_maximize: Vec::new(),
            fluxes_to_minimize: Vec::new(),
            biomass_optimization: None,
            relax_qssa: false,
            qssa_relaxation_strength: 1.0,
            parsimony_strength: 0.0,
            number_of_simulations: None,
            ignore_cofactors: false,
            time_limit: None,
            processes: configuration.processes,
            fva_tolerance: 1e-6,
        }
    }
}

impl FbaOptions {
    /// Check the options before any simulation runs
    pub fn validate(&self) -> Result<(), OptionsError> {
        if !self.solver.is_available() {
            return Err(OptionsError::Invalid(format!(
                "solver {} is not available in this build",
                self.solver
            )));
        }
        for (name, value) in [
            ("qssa_relaxation_strength", self.qssa_relaxation_strength),
            ("parsimony_strength", self.parsimony_strength),
            ("fva_tolerance", self.fva_tolerance),
        ] {
            if !value.is_finite() || value < 0. {
                return Err(OptionsError::Invalid(format!(
                    "{} must be a non negative number, got {}",
                    name, value
                )));
            }
        }
        if self.relax_qssa && self.qssa_relaxation_strength == 0. {
            return Err(OptionsError::Invalid(
                "qssa_relaxation_strength must be positive when relax_qssa is set".to_string(),
            ));
        }
        if let Some(time_limit) = self.time_limit {
            if !(time_limit > 0.) {
                return Err(OptionsError::Invalid(format!(
                    "time_limit must be positive, got {}",
                    time_limit
                )));
            }
        }
        if self.number_of_simulations == Some(0) {
            return Err(OptionsError::Invalid(
                "number_of_simulations must be at least 1".to_string(),
            ));
        }
        for entry in self.fluxes_to_maximize.iter().chain(&self.fluxes_to_minimize) {
            FluxObjective::parse(entry).map_err(|err| OptionsError::Invalid(err.to_string()))?;
        }
        Ok(())
    }

    /// Settings forwarded to the solver backends
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig::default().with_time_limit(self.time_limit)
    }

    pub fn from_json_str(data: &str) -> Result<Self, OptionsError> {
        serde_json::from_str(data).map_err(|err| OptionsError::Parse(err.to_string()))
    }

    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, OptionsError> {
        let data = fs::read_to_string(path).map_err(|err| OptionsError::Io(err.to_string()))?;
        Self::from_json_str(&data)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    #[error("Invalid options: {0}")]
    Invalid(String),
    #[error("Unable to parse options: {0}")]
    Parse(String),
    #[error("Unable to read options: {0}")]
    Io(String),
}
