//! Flux variability analysis of a single simulation
use tracing::debug;

use crate::analysis::fba::FluxBalanceAnalysis;
use crate::analysis::options::FbaOptions;
use crate::analysis::result::FvaResult;
use crate::analysis::runner::{SimulationError, SimulationTask};
use crate::context::Context;
use crate::network::network::Network;
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{ObjectiveSense, ProblemObjective};
use crate::optimize::problem::{Problem, ProblemAssembler, QssaMode};
use crate::optimize::solvers::{dispatch, SolverConfig, SolverKind, SolverOutcome};
use crate::optimize::sparse::SparseAccumulator;

/// Finds the range of each flux over the optimal solutions
///
/// The problem is first solved as in FBA. The linear flux objective is then fixed
/// at its optimum, within a relative tolerance, and each flux is minimized and
/// maximized under the same constraints. Under a relaxed mass balance the
/// residuals are kept in a band around the FBA residuals.
pub struct FluxVariabilityAnalysis<'a> {
    network: &'a Network,
    options: &'a FbaOptions,
}

impl<'a> FluxVariabilityAnalysis<'a> {
    pub fn new(network: &'a Network, options: &'a FbaOptions) -> Self {
        Self { network, options }
    }

    /// The linear problem sharing the constraints of the FBA problem and its optimum
    pub fn feasibility_problem(
        &self,
        problem: &Problem,
        outcome: &SolverOutcome,
    ) -> Result<Problem, SimulationError> {
        let n = problem.num_variables();
        let tolerance = self.options.fva_tolerance;
        let mut feasibility = problem.clone();
        feasibility.set_objective(ProblemObjective::zero(n));
        if feasibility.solver.is_quadratic() {
            feasibility.solver = SolverKind::InteriorPoint;
        }

        let flux_objective =
            ProblemAssembler::new(self.network, self.options).flux_objective()?;
        if flux_objective.has_linear_terms() {
            let optimum: f64 = flux_objective
                .linear
                .iter()
                .zip(&outcome.x)
                .map(|(q, v)| q * v)
                .sum();
            let mut matrix = SparseAccumulator::new(1, n);
            for (col, q) in flux_objective.linear.iter().enumerate() {
                matrix.add(0, col, *q);
            }
            feasibility.add_constraint(Constraint::Inequality {
                id: "optimality".to_string(),
                matrix: matrix.to_csr(),
                lower_bound: vec![f64::NEG_INFINITY],
                upper_bound: vec![optimum + tolerance * optimum.abs().max(1.)],
            })?;
        }

        if let QssaMode::Relaxed { .. } = problem.qssa {
            if problem.s_steady.nrows() > 0 {
                let band = |sv: f64| sv.abs() * tolerance + tolerance;
                feasibility.add_constraint(Constraint::Inequality {
                    id: "qssa_band".to_string(),
                    matrix: problem.s_steady.clone(),
                    lower_bound: outcome.sv.iter().map(|sv| sv - band(*sv)).collect(),
                    upper_bound: outcome.sv.iter().map(|sv| sv + band(*sv)).collect(),
                })?;
            }
        }
        Ok(feasibility)
    }

    /// Extreme value of a flux over the feasibility problem, NaN when the solve fails
    fn extreme(
        &self,
        feasibility: &mut Problem,
        index: usize,
        sense: ObjectiveSense,
        config: &SolverConfig,
    ) -> Result<f64, SimulationError> {
        let mut objective = ProblemObjective::zero(feasibility.num_variables());
        objective.add_linear(index, 1., sense);
        objective.sense = sense;
        feasibility.set_objective(objective);
        let outcome = dispatch(feasibility, config)?;
        Ok(if outcome.success {
            outcome.x[index]
        } else {
            f64::NAN
        })
    }
}

impl SimulationTask for FluxVariabilityAnalysis<'_> {
    fn name(&self) -> &'static str {
        "fva"
    }

    fn run_simulation(
        &self,
        simulation: usize,
        context: &Context,
    ) -> Result<FvaResult, SimulationError> {
        let (problem, outcome) = FluxBalanceAnalysis::new(self.network, self.options).solve(context)?;
        let mut result = FvaResult::from_outcome(simulation, &problem, &outcome);
        // A failed FBA already carries NaN ranges
        if !outcome.success {
            return Ok(result);
        }

        let mut feasibility = self.feasibility_problem(&problem, &outcome)?;
        let config = self.options.solver_config();
        for (index, row) in result.fluxes.iter_mut().enumerate() {
            row.lower_bound = self.extreme(&mut feasibility, index, ObjectiveSense::Minimize, &config)?;
            row.upper_bound = self.extreme(&mut feasibility, index, ObjectiveSense::Maximize, &config)?;
        }
        debug!(
            component = "fva",
            operation = "ranges",
            status = "success",
            simulation,
            reactions = result.fluxes.len(),
            "Computed flux ranges"
        );
        Ok(result)
    }
}
