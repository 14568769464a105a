//! Implements a solver interface for Clarabel
//!
//! Clarabel solves `min ½·xᵀ·P·x + qᵀ·x` subject to `A·x + s = b`, `s ∈ K`. Equality
//! rows go to the zero cone, every finite side of a range row (variable bounds
//! included) becomes a row of the nonnegative cone.
use ::clarabel::algebra::CscMatrix;
use ::clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use tracing::debug;

use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverConfig, SolverError, SolverOutcome};
use crate::optimize::sparse::SparseAccumulator;
use crate::optimize::OptimizationStatus;

/// Interior point conic solver, used for the `interior-point` and `quad` solvers
#[derive(Clone, Copy, Debug, Default)]
pub struct ClarabelSolver;

/// Rows of `A·x + s = b`, split by cone
#[derive(Default)]
struct ConeRows {
    zero: Vec<(Vec<(usize, f64)>, f64)>,
    nonnegative: Vec<(Vec<(usize, f64)>, f64)>,
}

impl ConeRows {
    /// Add `lower ≤ row·x ≤ upper`
    fn add_range(&mut self, row: Vec<(usize, f64)>, lower: f64, upper: f64) {
        if lower == upper {
            self.zero.push((row, upper));
            return;
        }
        if upper.is_finite() {
            self.nonnegative.push((row.clone(), upper));
        }
        if lower.is_finite() {
            let negated = row.into_iter().map(|(col, coef)| (col, -coef)).collect();
            self.nonnegative.push((negated, -lower));
        }
    }

    fn num_rows(&self) -> usize {
        self.zero.len() + self.nonnegative.len()
    }

    fn into_problem_data(
        self,
        num_variables: usize,
    ) -> (CscMatrix<f64>, Vec<f64>, Vec<SupportedConeT<f64>>) {
        let mut a = SparseAccumulator::new(self.num_rows(), num_variables);
        let mut b = Vec::with_capacity(self.num_rows());
        let mut cones = Vec::new();
        if !self.zero.is_empty() {
            cones.push(SupportedConeT::ZeroConeT(self.zero.len()));
        }
        if !self.nonnegative.is_empty() {
            cones.push(SupportedConeT::NonnegativeConeT(self.nonnegative.len()));
        }
        for (i, (row, rhs)) in self.zero.into_iter().chain(self.nonnegative).enumerate() {
            for (col, coef) in row {
                a.add(i, col, coef);
            }
            b.push(rhs);
        }
        (a.to_clarabel(), b, cones)
    }
}

impl Solver for ClarabelSolver {
    fn solve(
        &self,
        problem: &Problem,
        config: &SolverConfig,
    ) -> Result<SolverOutcome, SolverError> {
        let n = problem.num_variables();
        let mut rows = ConeRows::default();
        for constraint in &problem.constraints {
            for i in 0..constraint.num_rows() {
                let (lower, upper) = constraint.row_bounds(i);
                rows.add_range(constraint.row(i), lower, upper);
            }
        }
        for j in 0..n {
            rows.add_range(
                vec![(j, 1.)],
                problem.lower_bounds[j],
                problem.upper_bounds[j],
            );
        }
        let num_rows = rows.num_rows();
        let (a, b, cones) = rows.into_problem_data(n);
        let p = problem.objective.quadratic.to_clarabel();
        let q = problem.objective.linear.clone();

        let mut settings = DefaultSettingsBuilder::default();
        settings.verbose(config.verbose);
        if let Some(time_limit) = config.time_limit {
            settings.time_limit(time_limit);
        }
        let settings = settings
            .build()
            .map_err(|err| SolverError::Backend(err.to_string()))?;

        debug!(
            component = "solver",
            operation = "clarabel_setup",
            status = "success",
            variables = n,
            rows = num_rows,
            p_nnz = problem.objective.quadratic.nnz(),
            a_nnz = a.nzval.len(),
            "Built Clarabel problem data"
        );

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();
        let status = convert_status(&solver.solution.status);
        let message = format!("{:?}", solver.solution.status);
        debug!(
            component = "solver",
            operation = "clarabel_solve",
            status = %message,
            iterations = solver.solution.iterations,
            solve_time = solver.solution.solve_time,
            "Clarabel finished"
        );
        Ok(SolverOutcome::from_solution(
            problem,
            status,
            solver.solution.x.clone(),
            message,
        ))
    }
}

fn convert_status(status: &SolverStatus) -> OptimizationStatus {
    match status {
        SolverStatus::Solved => OptimizationStatus::Optimal,
        SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            OptimizationStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            OptimizationStatus::Unbounded
        }
        SolverStatus::MaxIterations | SolverStatus::MaxTime | SolverStatus::InsufficientProgress => {
            OptimizationStatus::SolverHalted
        }
        SolverStatus::Unsolved => OptimizationStatus::Unoptimized,
        _ => OptimizationStatus::NumericalError,
    }
}
