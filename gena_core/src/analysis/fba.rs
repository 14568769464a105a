//! Flux balance analysis of a single simulation
use crate::analysis::options::FbaOptions;
use crate::analysis::result::FbaResult;
use crate::analysis::runner::{SimulationError, SimulationTask};
use crate::context::Context;
use crate::network::network::Network;
use crate::optimize::problem::{Problem, ProblemAssembler};
use crate::optimize::solvers::{dispatch, SolverOutcome};

/// Finds one flux distribution optimizing the objective of the options
pub struct FluxBalanceAnalysis<'a> {
    network: &'a Network,
    options: &'a FbaOptions,
}

impl<'a> FluxBalanceAnalysis<'a> {
    pub fn new(network: &'a Network, options: &'a FbaOptions) -> Self {
        Self { network, options }
    }

    /// Assemble and solve the problem of a single simulation context
    pub fn solve(&self, context: &Context) -> Result<(Problem, SolverOutcome), SimulationError> {
        let problem = ProblemAssembler::new(self.network, self.options).assemble_context(context)?;
        let outcome = dispatch(&problem, &self.options.solver_config())?;
        Ok((problem, outcome))
    }
}

impl SimulationTask for FluxBalanceAnalysis<'_> {
    fn name(&self) -> &'static str {
        "fba"
    }

    fn run_simulation(
        &self,
        simulation: usize,
        context: &Context,
    ) -> Result<FbaResult, SimulationError> {
        let (problem, outcome) = self.solve(context)?;
        Ok(FbaResult::from_outcome(simulation, &problem, &outcome))
    }

    fn finalize(&self, merged: FbaResult) -> FbaResult {
        merged.with_deviation_bounds()
    }
}
