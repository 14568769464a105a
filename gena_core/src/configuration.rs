//! Global defaults shared by networks, contexts and the optimization core
use std::sync::{LazyLock, RwLock};

use crate::optimize::solvers::SolverKind;

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

#[derive(Clone, Debug)]
pub struct Configuration {
    /// Default lower flux bound of reactions and measures
    pub lower_bound: f64,
    /// Default upper flux bound of reactions and measures
    pub upper_bound: f64,
    /// Numerical tolerance used when comparing fluxes
    pub tolerance: f64,
    /// Solver used when a task does not name one
    pub solver: SolverKind,
    /// Number of worker threads used to run simulations
    pub processes: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
            solver: SolverKind::Quad,
            processes: 1,
        }
    }
}

/// Snapshot of the current global configuration.
///
/// A poisoned lock still holds valid defaults, so the inner value is used.
pub fn configuration() -> Configuration {
    match CONFIGURATION.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

pub(crate) fn default_lower_bound() -> f64 {
    configuration().lower_bound
}

pub(crate) fn default_upper_bound() -> f64 {
    configuration().upper_bound
}
