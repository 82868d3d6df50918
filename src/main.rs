//! Taxi Route Solver - Command Line Interface
//!
//! Plans a single-taxi pickup and delivery route for a static set of passengers.

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use taxi_route_solver::config::{InitialKind, SolverConfig};
use taxi_route_solver::error::SolverResult;
use taxi_route_solver::instance::TaxiInstance;
use taxi_route_solver::runner::{self, Algorithm};

use std::fs::File;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "taxi-route-solver")]
#[command(version = "1.0")]
#[command(about = "Single-taxi pickup and delivery route planner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance
    Solve {
        /// Instance file (.json or keyword text format)
        #[arg(short, long)]
        instance: PathBuf,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "simulated-annealing")]
        algorithm: Algorithm,

        /// Random seed, overrides the configuration file
        #[arg(short, long)]
        seed: Option<u64>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Starting solution of the local search methods
        #[arg(long, value_enum)]
        initial: Option<InitialKind>,

        /// Output solution to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the accepted solutions as CSV
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Generate a random instance
    Generate {
        /// Number of passengers
        #[arg(short, long, default_value = "10")]
        passengers: usize,

        /// Random seed
        #[arg(short, long, default_value = "5")]
        seed: u64,

        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Solve { instance, algorithm, seed, config, initial, output, trace, verbose } => {
            solve_instance(&instance, algorithm, seed, config, initial, output, trace, verbose)
        }

        Commands::Generate { passengers, seed, output } => generate_instance(passengers, seed, &output),

        Commands::Analyze { instance } => analyze_instance(&instance),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_instance(
    path: &PathBuf,
    algorithm: Algorithm,
    seed: Option<u64>,
    config_path: Option<PathBuf>,
    initial: Option<InitialKind>,
    output: Option<PathBuf>,
    trace_path: Option<PathBuf>,
    verbose: bool,
) -> SolverResult<()> {
    println!("Loading instance from {:?}...", path);
    let instance = TaxiInstance::from_file(path)?;

    let mut config = match config_path {
        Some(p) => SolverConfig::from_file(p)?,
        None => SolverConfig::default(),
    };
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if let Some(initial) = initial {
        config.initial = initial;
    }

    if verbose {
        println!("{}", instance.statistics());
    }

    println!("Solving with {} (seed {})...", algorithm, config.seed);
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let outcome = runner::solve(algorithm, &instance, &config, &mut rng, trace_path.is_some())?;
    let solution = &outcome.solution;

    println!("\n========== Results ==========");
    println!("Algorithm: {}", solution.algorithm);
    if let Some(initial) = outcome.initial_length {
        println!("Initial length: {:.2}", initial);
    }
    println!("Length: {:.2}", solution.length());
    println!("Time: {:.4}s", solution.computation_time);
    if let Some(iter) = solution.iterations {
        println!("Iterations: {}", iter);
    }

    if verbose {
        println!("\n{}", solution);
    }

    if let Some(out_path) = output {
        let file = File::create(&out_path)?;
        serde_json::to_writer_pretty(file, solution)?;
        println!("\nSolution saved to {:?}", out_path);
    }

    if let Some(trace_path) = trace_path {
        outcome.trace.export_csv(File::create(&trace_path)?)?;
        println!("Trace ({} steps) saved to {:?}", outcome.trace.steps().len(), trace_path);
    }

    Ok(())
}

fn generate_instance(passengers: usize, seed: u64, output: &PathBuf) -> SolverResult<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let instance = TaxiInstance::random(passengers, &mut rng);
    instance.to_json_file(output)?;
    println!("Instance with {} passengers saved to {:?}", passengers, output);
    Ok(())
}

fn analyze_instance(path: &PathBuf) -> SolverResult<()> {
    let instance = TaxiInstance::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    if !instance.passengers.is_empty() {
        println!("Passengers:");
        for passenger in &instance.passengers {
            println!("  {}  (trip {:.2})", passenger, passenger.trip_length());
        }
    }

    Ok(())
}
