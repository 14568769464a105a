use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gena_core::analysis::options::FbaOptions;
use gena_core::analysis::runner::{SimulationError, SimulationRun, SimulationRunner};
use gena_core::context::Context;
use gena_core::network::network::Network;
use gena_core::optimize::solvers::SolverKind;
use gena_core::twin::Twin;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Flux analysis of metabolic networks constrained by experimental measures"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run flux balance analysis on every simulation of the context
    Fba(AnalysisArgs),
    /// Run flux variability analysis on every simulation of the context
    Fva(AnalysisArgs),
}

#[derive(Parser, Debug)]
struct AnalysisArgs {
    /// Network JSON file
    #[arg(long)]
    network: PathBuf,

    /// Context JSON file holding the measures
    #[arg(long)]
    context: Option<PathBuf>,

    /// Task options JSON file
    #[arg(long)]
    options: Option<PathBuf>,

    /// Solver overriding the one of the options
    #[arg(long)]
    solver: Option<String>,

    /// Worker threads overriding the ones of the options
    #[arg(long)]
    processes: Option<u32>,

    /// Result JSON output path, stdout when missing
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write the network annotated with the simulated fluxes to this path
    #[arg(long)]
    annotated_network: Option<PathBuf>,
}

fn main() {
    if let Err(err) = init_logging() {
        eprintln!("{err}");
        std::process::exit(1);
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr, filtered by `GENA_LOG` (`warn` when unset)
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let filter = match env::var("GENA_LOG") {
        Ok(level) => EnvFilter::try_new(level)?,
        Err(_) => EnvFilter::default().add_directive(LevelFilter::WARN.into()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| format!("Failed to initialize logging: {err}"))?;
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Fba(args) => analysis_command(args, |runner| runner.run_fba()),
        Command::Fva(args) => analysis_command(args, |runner| runner.run_fva()),
    }
}

fn analysis_command<F>(args: AnalysisArgs, run: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&SimulationRunner) -> Result<SimulationRun, SimulationError>,
{
    let network = Network::read_json(&args.network)?;
    let context = args.context.as_ref().map(Context::read_json).transpose()?;
    let mut options = match &args.options {
        Some(path) => FbaOptions::read_json(path)?,
        None => FbaOptions::default(),
    };
    if let Some(solver) = &args.solver {
        options.solver = solver.parse::<SolverKind>()?;
    }
    if let Some(processes) = args.processes {
        options.processes = processes;
    }

    let twin = Twin::new(network, context)?;
    let runner = SimulationRunner::new(&twin, &options);
    let SimulationRun { result, twin } = run(&runner)?;
    info!(
        component = "cli",
        operation = "run",
        simulations = result.num_simulations(),
        successful = result.successful_simulations().len(),
        "Analysis finished"
    );

    let output = serde_json::to_string_pretty(&result)?;
    match &args.output {
        Some(path) => fs::write(path, output)?,
        None => writeln!(io::stdout(), "{output}")?,
    }
    if let Some(path) = &args.annotated_network {
        twin.network().write_json(path)?;
    }
    Ok(())
}
