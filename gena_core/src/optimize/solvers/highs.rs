//! Implements a solver interface for HiGHS, for linear problems
use ::highs::{Col, HighsModelStatus, RowProblem, Sense};
use tracing::debug;

use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverConfig, SolverError, SolverKind, SolverOutcome};
use crate::optimize::OptimizationStatus;

/// HiGHS with the method selected by a solver kind
#[derive(Clone, Copy, Debug)]
pub struct HighsSolver {
    kind: SolverKind,
}

impl HighsSolver {
    pub fn new(kind: SolverKind) -> Self {
        Self { kind }
    }

    fn method(&self) -> &'static str {
        match self.kind {
            SolverKind::HighsDs => "simplex",
            SolverKind::HighsIpm => "ipm",
            _ => "choose",
        }
    }
}

impl Solver for HighsSolver {
    fn solve(
        &self,
        problem: &Problem,
        config: &SolverConfig,
    ) -> Result<SolverOutcome, SolverError> {
        if problem.is_quadratic() {
            return Err(SolverError::UnsupportedProblem {
                solver: self.kind,
                reason: "HiGHS only solves linear problems here".to_string(),
            });
        }
        let mut row_problem = RowProblem::default();
        let columns: Vec<Col> = problem
            .objective
            .linear
            .iter()
            .zip(problem.lower_bounds.iter().zip(&problem.upper_bounds))
            .map(|(q, (lb, ub))| row_problem.add_column(*q, *lb..=*ub))
            .collect();
        let mut num_rows = 0;
        for constraint in &problem.constraints {
            for i in 0..constraint.num_rows() {
                let (lower, upper) = constraint.row_bounds(i);
                let factors: Vec<(Col, f64)> = constraint
                    .row(i)
                    .into_iter()
                    .map(|(col, coef)| (columns[col], coef))
                    .collect();
                row_problem.add_row(lower..=upper, &factors);
                num_rows += 1;
            }
        }

        let mut model = row_problem.optimise(Sense::Minimise);
        if !config.verbose {
            model.make_quiet();
        }
        model.set_option("solver", self.method());
        if self.kind == SolverKind::HighsDs {
            // Dual simplex
            model.set_option("simplex_strategy", 1);
        }
        if let Some(time_limit) = config.time_limit {
            model.set_option("time_limit", time_limit);
        }
        debug!(
            component = "solver",
            operation = "highs_setup",
            status = "success",
            method = self.method(),
            variables = columns.len(),
            rows = num_rows,
            "Built HiGHS model"
        );

        let solved = model
            .try_solve()
            .map_err(|status| SolverError::Backend(format!("HiGHS failed with {:?}", status)))?;
        let model_status = solved.status();
        let x = if model_status == HighsModelStatus::Optimal {
            solved.get_solution().columns().to_vec()
        } else {
            Vec::new()
        };
        Ok(SolverOutcome::from_solution(
            problem,
            convert_status(model_status),
            x,
            format!("{:?}", model_status),
        ))
    }
}

fn convert_status(status: HighsModelStatus) -> OptimizationStatus {
    match status {
        HighsModelStatus::Optimal => OptimizationStatus::Optimal,
        HighsModelStatus::Infeasible => OptimizationStatus::Infeasible,
        HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
            OptimizationStatus::Unbounded
        }
        HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
            OptimizationStatus::SolverHalted
        }
        HighsModelStatus::NotSet => OptimizationStatus::Unoptimized,
        _ => OptimizationStatus::NumericalError,
    }
}
