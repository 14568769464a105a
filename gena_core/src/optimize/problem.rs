//! Provides the flux optimization problem, and its assembly from a network and observations
use indexmap::IndexMap;
use nalgebra_sparse::CsrMatrix;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::options::FbaOptions;
use crate::context::Context;
use crate::network::network::{Network, NetworkError};
use crate::network::stoichiometry::StoichiometryBuilder;
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{FluxObjective, ObjectiveError, ObjectiveSense, ProblemObjective};
use crate::optimize::observation::{ObservationError, ObservationMatrix, ObservationMatrixBuilder};
use crate::optimize::solvers::SolverKind;
use crate::optimize::sparse::{csr_row, SparseAccumulator};

/// How the quasi steady state assumption is enforced
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum QssaMode {
    /// `S_steady·v = 0` as a hard constraint
    Strict,
    /// `strength·‖S_steady·v‖²` added to the objective
    Relaxed { strength: f64 },
}

/// Types of optimization problems
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ProblemType {
    /// Problem with linear objectives and constraints, and continuous variables
    LinearContinuous,
    /// Problem with quadratic objective, linear constraints, and continuous variables
    QuadraticContinuous,
}

/// A flux optimization problem over the reactions of a network
///
/// Variables are the reaction fluxes, in the order of `reaction_ids`.
#[derive(Debug, Clone)]
pub struct Problem {
    pub reaction_ids: Vec<String>,
    /// Compounds of the steady state mass balance, in row order of `s_steady`
    pub steady_compound_ids: Vec<String>,
    /// Steady compounds × reactions
    pub s_steady: CsrMatrix<f64>,
    pub constraints: Vec<Constraint>,
    pub lower_bounds: Vec<f64>,
    pub upper_bounds: Vec<f64>,
    pub objective: ProblemObjective,
    pub qssa: QssaMode,
    pub problem_type: ProblemType,
    pub solver: SolverKind,
}

impl Problem {
    pub fn num_variables(&self) -> usize {
        self.reaction_ids.len()
    }

    pub fn is_quadratic(&self) -> bool {
        self.problem_type == ProblemType::QuadraticContinuous
    }

    /// Steady state residuals `S_steady·x`
    pub fn sv(&self, x: &[f64]) -> Vec<f64> {
        (0..self.s_steady.nrows())
            .map(|row| {
                csr_row(&self.s_steady, row)
                    .iter()
                    .map(|(col, coef)| coef * x.get(*col).copied().unwrap_or(f64::NAN))
                    .sum()
            })
            .collect()
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        constraint
            .check(self.num_variables())
            .map_err(ProblemError::MalformedProblem)?;
        self.constraints.push(constraint);
        Ok(())
    }

    /// Replace the objective, updating the problem type
    pub fn set_objective(&mut self, objective: ProblemObjective) {
        self.problem_type = if objective.is_quadratic() {
            ProblemType::QuadraticContinuous
        } else {
            ProblemType::LinearContinuous
        };
        self.objective = objective;
    }

    pub fn reaction_index(&self, reaction_id: &str) -> Option<usize> {
        self.reaction_ids.iter().position(|id| id == reaction_id)
    }

    // region Validation Functions
    /// Check the dimensions and bounds of every part of the problem
    pub fn validate(&self) -> Result<(), ProblemError> {
        let n = self.num_variables();
        let malformed = |reason: String| Err(ProblemError::MalformedProblem(reason));
        if self.lower_bounds.len() != n || self.upper_bounds.len() != n {
            return malformed(format!(
                "{} variables but {} lower and {} upper bounds",
                n,
                self.lower_bounds.len(),
                self.upper_bounds.len()
            ));
        }
        for (i, (lb, ub)) in self.lower_bounds.iter().zip(&self.upper_bounds).enumerate() {
            if lb.is_nan() || ub.is_nan() || lb > ub {
                return malformed(format!(
                    "reaction {} has bounds [{}, {}]",
                    self.reaction_ids[i], lb, ub
                ));
            }
        }
        if self.s_steady.ncols() != n || self.s_steady.nrows() != self.steady_compound_ids.len() {
            return malformed(format!(
                "steady stoichiometric matrix is {}x{}, expected {}x{}",
                self.s_steady.nrows(),
                self.s_steady.ncols(),
                self.steady_compound_ids.len(),
                n
            ));
        }
        if self.objective.num_variables() != n
            || self.objective.quadratic.nrows() != n
            || self.objective.quadratic.ncols() != n
        {
            return malformed(format!(
                "objective has {} linear terms and a {}x{} quadratic part for {} variables",
                self.objective.num_variables(),
                self.objective.quadratic.nrows(),
                self.objective.quadratic.ncols(),
                n
            ));
        }
        if self.objective.quadratic.iter().any(|(row, col, _)| row > col) {
            return malformed("quadratic part is not upper triangular".to_string());
        }
        if self.objective.linear.iter().any(|q| !q.is_finite()) {
            return malformed("objective has non finite coefficients".to_string());
        }
        if self.objective.is_quadratic() != self.is_quadratic() {
            return malformed(format!(
                "objective doesn't match the problem type {:?}",
                self.problem_type
            ));
        }
        for constraint in &self.constraints {
            constraint.check(n).map_err(ProblemError::MalformedProblem)?;
        }
        Ok(())
    }
    // endregion Validation Functions
}

/// Assembles the optimization problem of a network under observations
pub struct ProblemAssembler<'a> {
    network: &'a Network,
    options: &'a FbaOptions,
}

impl<'a> ProblemAssembler<'a> {
    pub fn new(network: &'a Network, options: &'a FbaOptions) -> Self {
        Self { network, options }
    }

    /// Assemble the problem of a single simulation context
    pub fn assemble_context(&self, context: &Context) -> Result<Problem, ProblemError> {
        let observation = ObservationMatrixBuilder::new(self.network).build(context)?;
        self.assemble(&observation)
    }

    /// Assemble the problem constrained by the observation matrices
    pub fn assemble(&self, observation: &ObservationMatrix) -> Result<Problem, ProblemError> {
        let reaction_ids = self.network.reaction_ids();
        if observation.reaction_ids != reaction_ids {
            return Err(ProblemError::MalformedProblem(
                "observation columns don't match the network reactions".to_string(),
            ));
        }
        let n = reaction_ids.len();
        let solver = self.solver();

        let stoichiometry =
            StoichiometryBuilder::new(self.network).exclude_cofactors(self.options.ignore_cofactors);
        let s_steady = stoichiometry.build_steady();
        let s_full = StoichiometryBuilder::new(self.network).build_full();
        let s_steady_csr = CsrMatrix::from(&s_steady.matrix);

        let (lower_bounds, upper_bounds): (Vec<f64>, Vec<f64>) = self
            .network
            .reactions()
            .values()
            .map(|rxn| (rxn.lower_bound, rxn.upper_bound))
            .unzip();

        let mut objective = self.flux_objective()?;

        let qssa = if self.options.relax_qssa {
            QssaMode::Relaxed {
                strength: self.options.qssa_relaxation_strength,
            }
        } else {
            QssaMode::Strict
        };
        let mut problem = Problem {
            reaction_ids,
            steady_compound_ids: s_steady.row_ids.clone(),
            s_steady: s_steady_csr,
            constraints: Vec::new(),
            lower_bounds,
            upper_bounds,
            objective: ProblemObjective::zero(n),
            qssa,
            problem_type: ProblemType::LinearContinuous,
            solver,
        };

        match qssa {
            QssaMode::Strict if problem.s_steady.nrows() > 0 => {
                let mass_balance = Constraint::Equality {
                    id: "qssa".to_string(),
                    matrix: problem.s_steady.clone(),
                    equals: vec![0.; problem.s_steady.nrows()],
                };
                problem.add_constraint(mass_balance)?;
            }
            QssaMode::Strict => {}
            QssaMode::Relaxed { strength } => {
                for row in 0..problem.s_steady.nrows() {
                    objective.add_squared_residual(&csr_row(&problem.s_steady, row), 0., strength);
                }
            }
        }
        objective.add_l2_penalty(self.options.parsimony_strength);

        if observation.num_measures() > 0 {
            let rows = observation.effective_rows(&s_full);
            let mut matrix = SparseAccumulator::new(rows.len(), n);
            for (i, row) in rows.iter().enumerate() {
                for &(col, coef) in row {
                    matrix.add(i, col, coef);
                }
                let bounds = &observation.b[i];
                if solver.is_quadratic() {
                    objective.add_squared_residual(row, bounds.target, bounds.confidence_score);
                }
            }
            problem.add_constraint(Constraint::Inequality {
                id: "measures".to_string(),
                matrix: matrix.to_csr(),
                lower_bound: observation.b.iter().map(|b| b.lower_bound).collect(),
                upper_bound: observation.b.iter().map(|b| b.upper_bound).collect(),
            })?;
        }

        problem.set_objective(objective);
        problem.validate()?;
        debug!(
            component = "problem",
            operation = "assemble",
            status = "success",
            solver = %problem.solver,
            variables = n,
            steady_compounds = problem.steady_compound_ids.len(),
            measures = observation.num_measures(),
            quadratic = problem.is_quadratic(),
            "Assembled problem"
        );
        Ok(problem)
    }

    /// The linear objective on the reaction fluxes, without measure or penalty terms
    pub fn flux_objective(&self) -> Result<ProblemObjective, ProblemError> {
        let mut objective = ProblemObjective::zero(self.network.reactions().len());
        self.add_linear_objective(&mut objective)?;
        Ok(objective)
    }

    /// The solver able to handle the requested objective terms
    fn solver(&self) -> SolverKind {
        let requested = self.options.solver;
        let needs_quadratic = self.options.relax_qssa || self.options.parsimony_strength > 0.;
        if needs_quadratic && !requested.is_quadratic() {
            warn!(
                component = "problem",
                operation = "select_solver",
                requested = %requested,
                selected = %SolverKind::Quad,
                "Quadratic objective terms require the quad solver"
            );
            SolverKind::Quad
        } else {
            requested
        }
    }

    fn add_linear_objective(&self, objective: &mut ProblemObjective) -> Result<(), ProblemError> {
        let index: IndexMap<&str, usize> = self
            .network
            .reactions()
            .keys()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        if let Some(sense) = self.options.biomass_optimization {
            let biomass = self.network.biomass_reaction()?;
            if let Some(&col) = index.get(biomass.id.as_str()) {
                objective.add_linear(col, 1., sense);
            }
            objective.sense = sense;
            return Ok(());
        }

        let mut entries = Vec::new();
        for entry in &self.options.fluxes_to_maximize {
            entries.push((FluxObjective::parse(entry)?, ObjectiveSense::Maximize));
        }
        for entry in &self.options.fluxes_to_minimize {
            entries.push((FluxObjective::parse(entry)?, ObjectiveSense::Minimize));
        }
        for (flux, sense) in &entries {
            let col = index
                .get(flux.reaction_id.as_str())
                .ok_or_else(|| ProblemError::UnresolvedReference(flux.reaction_id.clone()))?;
            objective.add_linear(*col, flux.weight, *sense);
        }
        objective.sense = if !entries.is_empty()
            && entries.iter().all(|(_, s)| *s == ObjectiveSense::Maximize)
        {
            ObjectiveSense::Maximize
        } else {
            ObjectiveSense::Minimize
        };
        Ok(())
    }
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Dimensions or bounds of the problem are inconsistent
    #[error("Malformed problem: {0}")]
    MalformedProblem(String),
    /// An objective references a reaction which is not in the network
    #[error("Objective references {0}, which is not a reaction of the network")]
    UnresolvedReference(String),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Objective(#[from] ObjectiveError),
    #[error(transparent)]
    Observation(#[from] ObservationError),
}
