//! Algorithm selection.
//!
//! [`solve`] is the single entry point the binary uses: it builds the starting
//! solution, runs the chosen strategy and checks the result against the instance.

use crate::config::{InitialKind, SolverConfig};
use crate::error::SolverResult;
use crate::exact::{BranchAndBoundSolver, BruteForceSolver};
use crate::heuristics::construction::{ConstructionHeuristic, GreedyConstruction, RandomConstruction};
use crate::heuristics::genetic::GeneticAlgorithm;
use crate::heuristics::local_search::{
    BeamSearch, HillClimbing, LocalSearch, MultiRestartLocalSearch, RandomDescent, SimulatedAnnealing,
};
use crate::instance::TaxiInstance;
use crate::solution::{Solution, Trace};
use rand::RngCore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Random feasible construction
    Random,
    /// Greedy nearest-station construction
    Greedy,
    /// First-improvement random descent
    LocalSearch,
    /// Steepest descent
    HillClimbing,
    /// Simulated annealing
    SimulatedAnnealing,
    /// Beam local search
    BeamSearch,
    /// Multi-restart random descent
    MultiRestart,
    /// Genetic algorithm
    Genetic,
    /// Exhaustive enumeration (small instances)
    BruteForce,
    /// Branch and bound seeded with the greedy route
    BranchAndBound,
}

impl Algorithm {
    pub const ALL: [Algorithm; 10] = [
        Algorithm::Random,
        Algorithm::Greedy,
        Algorithm::LocalSearch,
        Algorithm::HillClimbing,
        Algorithm::SimulatedAnnealing,
        Algorithm::BeamSearch,
        Algorithm::MultiRestart,
        Algorithm::Genetic,
        Algorithm::BruteForce,
        Algorithm::BranchAndBound,
    ];
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Algorithm::Random => "Random",
            Algorithm::Greedy => "Greedy",
            Algorithm::LocalSearch => "LocalSearch",
            Algorithm::HillClimbing => "HillClimbing",
            Algorithm::SimulatedAnnealing => "SimulatedAnnealing",
            Algorithm::BeamSearch => "BeamSearch",
            Algorithm::MultiRestart => "MultiRestart",
            Algorithm::Genetic => "Genetic",
            Algorithm::BruteForce => "BruteForce",
            Algorithm::BranchAndBound => "BranchAndBound",
        };
        f.write_str(name)
    }
}

/// Result of one run
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub solution: Solution,
    /// Accepted solutions of the improvement strategies, empty otherwise
    pub trace: Trace,
    /// Length of the starting solution, for strategies that use one
    pub initial_length: Option<f64>,
}

fn initial_solution(instance: &TaxiInstance, kind: InitialKind, rng: &mut dyn RngCore) -> Solution {
    match kind {
        InitialKind::Greedy => GreedyConstruction::new().construct(instance, rng),
        InitialKind::Random => RandomConstruction::new().construct(instance, rng),
    }
}

fn improve(
    strategy: &dyn LocalSearch,
    instance: &TaxiInstance,
    config: &SolverConfig,
    rng: &mut dyn RngCore,
    trace: &mut Trace,
    initial_length: &mut Option<f64>,
) -> Solution {
    let initial = initial_solution(instance, config.initial, rng);
    *initial_length = Some(initial.length());
    log::debug!("{:?} start: length {:.3}", config.initial, initial.length());
    strategy.improve(&initial, rng, trace)
}

/// Run `algorithm` on `instance`; `record_trace` keeps the accepted solutions
pub fn solve(
    algorithm: Algorithm,
    instance: &TaxiInstance,
    config: &SolverConfig,
    rng: &mut dyn RngCore,
    record_trace: bool,
) -> SolverResult<SolveOutcome> {
    let start = std::time::Instant::now();
    let mut trace = if record_trace { Trace::recording() } else { Trace::disabled() };
    let mut initial_length = None;

    log::info!(
        "Solving '{}' ({} passengers) with {}",
        instance.name,
        instance.num_passengers(),
        algorithm
    );

    let mut solution = match algorithm {
        Algorithm::Random => RandomConstruction::new().construct(instance, rng),
        Algorithm::Greedy => GreedyConstruction::new().construct(instance, rng),
        Algorithm::LocalSearch => {
            improve(&RandomDescent::new(), instance, config, rng, &mut trace, &mut initial_length)
        }
        Algorithm::HillClimbing => {
            improve(&HillClimbing::new(), instance, config, rng, &mut trace, &mut initial_length)
        }
        Algorithm::SimulatedAnnealing => {
            let sa = SimulatedAnnealing::with_config(config.annealing.clone());
            improve(&sa, instance, config, rng, &mut trace, &mut initial_length)
        }
        Algorithm::BeamSearch => {
            let beam = BeamSearch::with_config(config.beam.clone());
            improve(&beam, instance, config, rng, &mut trace, &mut initial_length)
        }
        Algorithm::MultiRestart => {
            let restarts = MultiRestartLocalSearch::with_config(config.multi_restart.clone());
            improve(&restarts, instance, config, rng, &mut trace, &mut initial_length)
        }
        Algorithm::Genetic => {
            let mut ga = GeneticAlgorithm::new(instance, config.genetic.clone());
            let (best, _) = ga.run(rng);
            best
        }
        Algorithm::BruteForce => BruteForceSolver::with_config(&config.exact).solve(instance)?.solution,
        Algorithm::BranchAndBound => {
            let greedy = GreedyConstruction::new().construct(instance, rng);
            initial_length = Some(greedy.length());
            BranchAndBoundSolver::new()
                .with_incumbent(greedy, config.exact.epsilon)
                .solve(instance)
                .solution
        }
    };

    instance.check_solution(&solution)?;

    solution.algorithm = algorithm.to_string();
    solution.computation_time = start.elapsed().as_secs_f64();

    log::info!(
        "{} finished: length {:.3} in {:.4}s",
        algorithm,
        solution.length(),
        solution.computation_time
    );

    Ok(SolveOutcome {
        solution,
        trace,
        initial_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn quick_config() -> SolverConfig {
        let mut config = SolverConfig::default();
        config.beam.beam_width = 10;
        config.multi_restart.n_tries = 4;
        config.genetic.max_generations = 10;
        config
    }

    #[test]
    fn test_every_algorithm_returns_checked_solution() {
        let instance = TaxiInstance::random(5, &mut ChaCha8Rng::seed_from_u64(9));
        let config = quick_config();

        for algorithm in Algorithm::ALL {
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
            let outcome = solve(algorithm, &instance, &config, &mut rng, false).unwrap();

            instance.check_solution(&outcome.solution).unwrap();
            assert_eq!(outcome.solution.algorithm, algorithm.to_string());
            if let Some(initial) = outcome.initial_length {
                assert!(outcome.solution.length() <= initial + 1e-6, "{} got worse", algorithm);
            }
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let instance = TaxiInstance::random(6, &mut ChaCha8Rng::seed_from_u64(2));
        let config = quick_config();

        let run = |seed| {
            solve(Algorithm::SimulatedAnnealing, &instance, &config, &mut ChaCha8Rng::seed_from_u64(seed), false)
        };
        let a = run(5).unwrap();
        let b = run(5).unwrap();
        assert_eq!(a.solution, b.solution);
    }

    #[test]
    fn test_trace_only_when_requested() {
        let instance = TaxiInstance::random(5, &mut ChaCha8Rng::seed_from_u64(3));
        let config = quick_config();

        let run = |trace| solve(Algorithm::LocalSearch, &instance, &config, &mut ChaCha8Rng::seed_from_u64(1), trace);

        let quiet = run(false).unwrap();
        assert!(quiet.trace.steps().is_empty());

        let traced = run(true).unwrap();
        assert!(!traced.trace.steps().is_empty());
        assert_eq!(traced.trace.steps()[0].length, traced.initial_length.unwrap());
    }

    #[test]
    fn test_brute_force_limit_is_reported() {
        let instance = TaxiInstance::random(7, &mut ChaCha8Rng::seed_from_u64(3));
        let config = SolverConfig::default();
        let result = solve(Algorithm::BruteForce, &instance, &config, &mut ChaCha8Rng::seed_from_u64(1), false);
        assert!(result.is_err());
    }
}
