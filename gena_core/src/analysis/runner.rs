//! Runs an analysis over every simulation of a twin's context
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::fba::FluxBalanceAnalysis;
use crate::analysis::fva::FluxVariabilityAnalysis;
use crate::analysis::options::{FbaOptions, OptionsError};
use crate::analysis::result::FbaResult;
use crate::context::{Context, ContextError};
use crate::optimize::observation::ObservationError;
use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::SolverError;
use crate::twin::{Twin, TwinAnnotator};

/// An analysis run independently on each simulation
pub trait SimulationTask: Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Run the analysis on the single simulation context of `simulation`
    fn run_simulation(
        &self,
        simulation: usize,
        context: &Context,
    ) -> Result<FbaResult, SimulationError>;

    /// Post process the merged results of every simulation
    fn finalize(&self, merged: FbaResult) -> FbaResult {
        merged
    }
}

/// Steps of a run, in order
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunnerState {
    Init,
    ValidateContextLengths,
    BuildSubcontext,
    RunSolve,
    Collect,
    MergeResults,
    AnnotateTwin,
    Done,
}

/// Merged results of a run, and the twin annotated with them
#[derive(Clone, Debug)]
pub struct SimulationRun {
    pub result: FbaResult,
    pub twin: Twin,
}

type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Drives an analysis over the simulations of a twin
///
/// Simulations run one after the other, or on a thread pool when
/// `options.processes > 1`. Results are merged in simulation order either way.
pub struct SimulationRunner<'a> {
    twin: &'a Twin,
    options: &'a FbaOptions,
    progress: Option<ProgressCallback>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> SimulationRunner<'a> {
    pub fn new(twin: &'a Twin, options: &'a FbaOptions) -> Self {
        Self {
            twin,
            options,
            progress: None,
            cancel: None,
        }
    }

    /// Called with the fraction of completed simulations after each simulation
    pub fn with_progress(mut self, callback: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Stop before the next simulation once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn run_fba(&self) -> Result<SimulationRun, SimulationError> {
        self.run(&FluxBalanceAnalysis::new(self.twin.network(), self.options))
    }

    pub fn run_fva(&self) -> Result<SimulationRun, SimulationError> {
        self.run(&FluxVariabilityAnalysis::new(self.twin.network(), self.options))
    }

    /// Number of simulations to run
    ///
    /// Vector measures must hold at least that many values, scalar measures are
    /// shared by every simulation.
    pub fn num_simulations(&self, context: &Context) -> Result<usize, SimulationError> {
        let vector_length = context.vector_length()?;
        let requested = self
            .options
            .number_of_simulations
            .unwrap_or(vector_length.unwrap_or(1));
        match vector_length {
            Some(available) if available < requested => {
                Err(SimulationError::SimulationCountMismatch {
                    requested,
                    available,
                })
            }
            _ => Ok(requested),
        }
    }

    pub fn run(&self, task: &dyn SimulationTask) -> Result<SimulationRun, SimulationError> {
        self.transition(RunnerState::Init, task);
        self.options.validate()?;
        let context = self.twin.context_or_empty();

        self.transition(RunnerState::ValidateContextLengths, task);
        let num_simulations = self.num_simulations(&context)?;
        info!(
            component = "runner",
            operation = task.name(),
            simulations = num_simulations,
            processes = self.options.processes,
            "Starting simulations"
        );

        let completed = Mutex::new(0usize);
        let run_one = |simulation: usize| -> Result<FbaResult, SimulationError> {
            if self
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::SeqCst))
            {
                return Err(SimulationError::Cancelled { simulation });
            }
            self.transition(RunnerState::BuildSubcontext, task);
            let sub_context = context.sub_context(simulation)?;
            self.transition(RunnerState::RunSolve, task);
            let result = task.run_simulation(simulation, &sub_context)?;
            self.transition(RunnerState::Collect, task);
            info!(
                component = "runner",
                operation = task.name(),
                simulation,
                success = result.is_successful(simulation),
                "Simulation finished"
            );
            self.report_progress(&completed, num_simulations);
            Ok(result)
        };

        let results: Vec<FbaResult> = if self.options.processes > 1 && num_simulations > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.processes as usize)
                .build()
                .map_err(|err| SimulationError::ThreadPool(err.to_string()))?;
            pool.install(|| {
                (0..num_simulations)
                    .into_par_iter()
                    .map(run_one)
                    .collect::<Result<Vec<_>, _>>()
            })?
        } else {
            (0..num_simulations)
                .map(run_one)
                .collect::<Result<Vec<_>, _>>()?
        };

        self.transition(RunnerState::MergeResults, task);
        let result = task.finalize(FbaResult::merge(results));
        info!(
            component = "runner",
            operation = task.name(),
            simulations = result.num_simulations(),
            successful = result.successful_simulations().len(),
            "Merged simulation results"
        );

        self.transition(RunnerState::AnnotateTwin, task);
        let twin = TwinAnnotator::annotate(self.twin, &result);
        self.transition(RunnerState::Done, task);
        Ok(SimulationRun { result, twin })
    }

    fn report_progress(&self, completed: &Mutex<usize>, total: usize) {
        let mut count = match completed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *count += 1;
        // Reported under the lock so the values seen by the callback increase
        if let Some(callback) = &self.progress {
            callback(*count as f64 / total as f64);
        }
    }

    fn transition(&self, state: RunnerState, task: &dyn SimulationTask) {
        debug!(
            component = "runner",
            operation = task.name(),
            state = ?state,
            "Runner state"
        );
    }
}

/// Errors aborting a run
///
/// Solver non convergence is not one of them, it is recorded in the results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Observation(#[from] ObservationError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Options(#[from] OptionsError),
    /// The context holds fewer simulations than requested
    #[error("{requested} simulations requested but the context only holds {available}")]
    SimulationCountMismatch { requested: usize, available: usize },
    #[error("Run cancelled before simulation {simulation}")]
    Cancelled { simulation: usize },
    #[error("Unable to start the simulation thread pool: {0}")]
    ThreadPool(String),
}
