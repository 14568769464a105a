//! Solver selection and the interfaces shared by the solver backends
pub mod clarabel;
#[cfg(feature = "highs")]
pub mod highs;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::OptimizationStatus;

/// Solver requested for a task
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverKind {
    /// HiGHS dual simplex
    #[serde(rename = "highs-ds")]
    HighsDs,
    /// HiGHS interior point
    #[serde(rename = "highs-ipm")]
    HighsIpm,
    /// HiGHS, choosing the method itself
    #[serde(rename = "highs")]
    Highs,
    /// Interior point linear programming
    #[serde(rename = "interior-point")]
    InteriorPoint,
    /// Quadratic programming
    #[serde(rename = "quad")]
    Quad,
}

impl SolverKind {
    /// Whether the solver accepts quadratic objectives
    pub fn is_quadratic(&self) -> bool {
        matches!(self, SolverKind::Quad)
    }

    pub fn is_highs(&self) -> bool {
        matches!(
            self,
            SolverKind::HighsDs | SolverKind::HighsIpm | SolverKind::Highs
        )
    }

    /// Whether a backend for this solver was compiled in
    pub fn is_available(&self) -> bool {
        if self.is_highs() {
            cfg!(feature = "highs")
        } else {
            true
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SolverKind::HighsDs => "highs-ds",
            SolverKind::HighsIpm => "highs-ipm",
            SolverKind::Highs => "highs",
            SolverKind::InteriorPoint => "interior-point",
            SolverKind::Quad => "quad",
        }
    }
}

impl FromStr for SolverKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "highs-ds" => Ok(SolverKind::HighsDs),
            "highs-ipm" => Ok(SolverKind::HighsIpm),
            "highs" => Ok(SolverKind::Highs),
            "interior-point" => Ok(SolverKind::InteriorPoint),
            "quad" => Ok(SolverKind::Quad),
            _ => Err(SolverError::UnknownSolver(s.to_string())),
        }
    }
}

impl Display for SolverKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Options forwarded to the backends
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Time limit of a single solve, in seconds
    pub time_limit: Option<f64>,
    /// Let the backend print its own log
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: None,
            verbose: false,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit(mut self, seconds: Option<f64>) -> Self {
        self.time_limit = seconds;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Result of a single solve
///
/// A solve that did not converge is reported with `success = false`, it is not an
/// error.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverOutcome {
    pub status: OptimizationStatus,
    /// Reaction fluxes, NaN when the backend returned no point
    pub x: Vec<f64>,
    /// Steady state residuals `S_steady·x`
    pub sv: Vec<f64>,
    pub success: bool,
    pub message: String,
    /// Objective value in the sense requested by the caller
    pub objective_value: Option<f64>,
}

impl SolverOutcome {
    /// Interpret a point returned by a backend
    pub fn from_solution(
        problem: &Problem,
        status: OptimizationStatus,
        mut x: Vec<f64>,
        message: String,
    ) -> Self {
        if x.len() != problem.num_variables() {
            x = vec![f64::NAN; problem.num_variables()];
        }
        let success = matches!(
            status,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        ) && x.iter().all(|v| v.is_finite());
        let sv = problem.sv(&x);
        let objective_value = if success {
            Some(problem.objective.report(problem.objective.evaluate(&x)))
        } else {
            None
        };
        Self {
            status,
            x,
            sv,
            success,
            message,
            objective_value,
        }
    }
}

/// A solver backend
pub trait Solver {
    /// Solve the problem, which has already been validated
    fn solve(&self, problem: &Problem, config: &SolverConfig)
        -> Result<SolverOutcome, SolverError>;
}

/// Solve a problem with the backend of its solver kind
pub fn dispatch(problem: &Problem, config: &SolverConfig) -> Result<SolverOutcome, SolverError> {
    problem.validate()?;
    if problem.is_quadratic() && !problem.solver.is_quadratic() {
        return Err(SolverError::UnsupportedProblem {
            solver: problem.solver,
            reason: "the objective is quadratic".to_string(),
        });
    }
    debug!(
        component = "solver",
        operation = "dispatch",
        status = "start",
        solver = %problem.solver,
        variables = problem.num_variables(),
        constraint_blocks = problem.constraints.len(),
        quadratic = problem.is_quadratic(),
        "Dispatching problem"
    );
    let outcome = match problem.solver {
        SolverKind::InteriorPoint | SolverKind::Quad => {
            clarabel::ClarabelSolver.solve(problem, config)?
        }
        kind => solve_highs(kind, problem, config)?,
    };
    if outcome.success {
        debug!(
            component = "solver",
            operation = "solve",
            status = "success",
            solver = %problem.solver,
            objective = outcome.objective_value.unwrap_or(f64::NAN),
            "Solved problem"
        );
    } else {
        warn!(
            component = "solver",
            operation = "solve",
            status = "failed",
            solver = %problem.solver,
            optimization_status = ?outcome.status,
            message = %outcome.message,
            "Solver did not converge"
        );
    }
    Ok(outcome)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "highs")] {
        fn solve_highs(
            kind: SolverKind,
            problem: &Problem,
            config: &SolverConfig,
        ) -> Result<SolverOutcome, SolverError> {
            highs::HighsSolver::new(kind).solve(problem, config)
        }
    } else {
        fn solve_highs(
            kind: SolverKind,
            _problem: &Problem,
            _config: &SolverConfig,
        ) -> Result<SolverOutcome, SolverError> {
            Err(SolverError::Unavailable(kind))
        }
    }
}

/// Errors raised when a problem can't be handed to a solver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Unknown solver {0}, expected one of highs-ds, highs-ipm, highs, interior-point, quad")]
    UnknownSolver(String),
    /// The backend of the solver was not compiled in
    #[error("Solver {0} is not available, enable the highs feature")]
    Unavailable(SolverKind),
    #[error("Solver {solver} can't solve this problem: {reason}")]
    UnsupportedProblem { solver: SolverKind, reason: String },
    /// The backend rejected the problem or its settings
    #[error("Solver backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Problem(#[from] ProblemError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_solver_kind() {
        for (name, kind) in [
            ("highs-ds", SolverKind::HighsDs),
            ("highs-ipm", SolverKind::HighsIpm),
            ("highs", SolverKind::Highs),
            ("interior-point", SolverKind::InteriorPoint),
            ("quad", SolverKind::Quad),
        ] {
            assert_eq!(name.parse::<SolverKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), name);
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(name.to_string())
            );
        }
        assert!("simplex".parse::<SolverKind>().is_err());
    }

    #[test]
    fn availability() {
        assert!(SolverKind::Quad.is_available());
        assert!(SolverKind::InteriorPoint.is_available());
        assert_eq!(SolverKind::Highs.is_available(), cfg!(feature = "highs"));
        assert!(SolverKind::Quad.is_quadratic());
        assert!(!SolverKind::HighsDs.is_quadratic());
    }
}
