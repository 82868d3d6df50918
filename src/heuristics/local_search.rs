//! Local search improvement heuristics.
//!
//! Every method here explores the relocation neighborhood of
//! [`Solution::relocations`]:
//! - Random descent (first improvement, random neighbor order)
//! - Hill climbing (steepest descent)
//! - Simulated annealing
//! - Beam search over a fixed-size pool
//! - Multi-restart random descent

use crate::solution::{Relocation, Solution, Trace};
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trait for local search improvement methods
pub trait LocalSearch {
    /// Improve `initial`, recording accepted solutions into `trace`
    fn improve(&self, initial: &Solution, rng: &mut dyn RngCore, trace: &mut Trace) -> Solution;
    fn name(&self) -> &str;
}

/// Remove and return a uniformly random move from `moves`
fn draw_move(moves: &mut Vec<Relocation>, rng: &mut dyn RngCore) -> Option<Relocation> {
    if moves.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..moves.len());
    Some(moves.swap_remove(idx))
}

fn finish(mut solution: Solution, name: &str, iterations: usize, start: std::time::Instant) -> Solution {
    solution.algorithm = name.to_string();
    solution.iterations = Some(iterations);
    solution.computation_time = start.elapsed().as_secs_f64();
    solution
}

/// First-improvement local search
///
/// Draws neighbors in random order without replacement and moves to the first one
/// that is strictly shorter. Stops once every neighbor of the current solution has
/// been rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDescent;

impl RandomDescent {
    pub fn new() -> Self {
        RandomDescent
    }
}

impl LocalSearch for RandomDescent {
    fn improve(&self, initial: &Solution, rng: &mut dyn RngCore, trace: &mut Trace) -> Solution {
        let start = std::time::Instant::now();
        let mut current = initial.clone();
        let mut moves = current.relocations();
        let mut iterations = 0;

        trace.record(&current);

        while let Some(mv) = draw_move(&mut moves, rng) {
            iterations += 1;
            let candidate = current.relocate(&mv);
            if candidate.length() < current.length() {
                current = candidate;
                trace.record(&current);
                moves = current.relocations();
            }
        }

        log::debug!("{}: length {:.2} after {} evaluations", self.name(), current.length(), iterations);
        finish(current, self.name(), iterations, start)
    }

    fn name(&self) -> &str {
        "LocalSearch"
    }
}

/// Steepest-descent hill climbing
///
/// Evaluates the whole neighborhood each round and moves to the shortest neighbor
/// while it is strictly better than the current solution.
#[derive(Debug, Clone, Copy, Default)]
pub struct HillClimbing;

impl HillClimbing {
    pub fn new() -> Self {
        HillClimbing
    }
}

impl LocalSearch for HillClimbing {
    fn improve(&self, initial: &Solution, _rng: &mut dyn RngCore, trace: &mut Trace) -> Solution {
        let start = std::time::Instant::now();
        let mut current = initial.clone();
        let mut rounds = 0;

        trace.record(&current);

        loop {
            let best = current
                .neighbors()
                .into_iter()
                .min_by_key(|s| OrderedFloat(s.length()));

            match best {
                Some(best) if best.length() < current.length() => {
                    current = best;
                    rounds += 1;
                    trace.record(&current);
                }
                _ => break,
            }
        }

        log::debug!("{}: local optimum {:.2} after {} rounds", self.name(), current.length(), rounds);
        finish(current, self.name(), rounds, start)
    }

    fn name(&self) -> &str {
        "HillClimbing"
    }
}

/// Annealing schedule parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    /// Initial temperature
    pub initial_temp: f64,
    /// The schedule stops once the temperature drops below this value
    pub final_temp: f64,
    /// Multiplicative cooling applied every iteration
    pub cooling_rate: f64,
    /// Scale applied to the Metropolis probability of a non-improving move
    pub acceptance_scale: f64,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            initial_temp: 100.0,
            final_temp: 0.1,
            cooling_rate: 0.995,
            acceptance_scale: 1.0 / 25.0,
        }
    }
}

/// Simulated Annealing
///
/// Each iteration draws one random neighbor. Improvements are always taken, other
/// moves with probability `acceptance_scale * exp(-delta / T)`.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAnnealing {
    pub config: AnnealingConfig,
}

impl SimulatedAnnealing {
    pub fn new() -> Self {
        SimulatedAnnealing { config: AnnealingConfig::default() }
    }

    pub fn with_config(config: AnnealingConfig) -> Self {
        SimulatedAnnealing { config }
    }

    /// Probability of accepting a move that lengthens the route by `delta`
    pub fn acceptance_probability(&self, delta: f64, temp: f64) -> f64 {
        let prob = self.config.acceptance_scale * (-delta / temp).exp();
        if prob.is_finite() {
            prob.min(1.0)
        } else {
            1.0
        }
    }
}

impl LocalSearch for SimulatedAnnealing {
    fn improve(&self, initial: &Solution, rng: &mut dyn RngCore, trace: &mut Trace) -> Solution {
        let start = std::time::Instant::now();
        let mut current = initial.clone();
        let mut best = current.clone();
        let mut moves = current.relocations();
        let mut temp = self.config.initial_temp;
        let mut iterations = 0;

        trace.record(&current);

        while temp >= self.config.final_temp && !moves.is_empty() {
            let idx = rng.gen_range(0..moves.len());
            let candidate = current.relocate(&moves[idx]);
            let delta = candidate.length() - current.length();

            let accept = delta < 0.0 || rng.gen::<f64>() < self.acceptance_probability(delta, temp);
            if accept {
                current = candidate;
                moves = current.relocations();
                trace.record(&current);

                if current.length() < best.length() {
                    best = current.clone();
                }
            }

            temp *= self.config.cooling_rate;
            iterations += 1;
        }

        log::debug!(
            "{}: best {:.2}, final {:.2}, {} iterations",
            self.name(),
            best.length(),
            current.length(),
            iterations
        );
        finish(best, self.name(), iterations, start)
    }

    fn name(&self) -> &str {
        "SimulatedAnnealing"
    }
}

/// Beam search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    /// Number of pool members
    pub beam_width: usize,
}

impl Default for BeamConfig {
    fn default() -> Self {
        BeamConfig { beam_width: 100 }
    }
}

struct BeamMember {
    solution: Solution,
    moves: Vec<Relocation>,
}

impl BeamMember {
    fn new(solution: Solution) -> Self {
        let moves = solution.relocations();
        BeamMember { solution, moves }
    }
}

/// Index and length of the longest member; ties keep the lowest index
fn worst_member(pool: &[BeamMember]) -> (usize, f64) {
    pool.iter()
        .enumerate()
        .map(|(i, m)| (i, m.solution.length()))
        .fold(None, |worst: Option<(usize, f64)>, (i, len)| match worst {
            Some((_, worst_len)) if len <= worst_len => worst,
            _ => Some((i, len)),
        })
        .unwrap_or((0, f64::INFINITY))
}

/// Beam local search
///
/// Keeps a pool of solutions, each with its own untried neighbors. Every sweep,
/// each member proposes one random untried neighbor, which replaces the current
/// worst member when it is shorter. A sweep without replacement ends the search.
#[derive(Debug, Clone, Default)]
pub struct BeamSearch {
    pub config: BeamConfig,
}

impl BeamSearch {
    pub fn new() -> Self {
        BeamSearch { config: BeamConfig::default() }
    }

    pub fn with_config(config: BeamConfig) -> Self {
        BeamSearch { config }
    }
}

impl LocalSearch for BeamSearch {
    fn improve(&self, initial: &Solution, rng: &mut dyn RngCore, trace: &mut Trace) -> Solution {
        let start = std::time::Instant::now();
        let width = self.config.beam_width.max(1);
        let mut pool: Vec<BeamMember> = (0..width).map(|_| BeamMember::new(initial.clone())).collect();
        let mut best_length = initial.length();
        let mut sweeps = 0;

        trace.record(initial);

        loop {
            sweeps += 1;
            let mut replaced = false;
            let (mut worst_idx, mut worst_len) = worst_member(&pool);

            for i in 0..pool.len() {
                let Some(mv) = draw_move(&mut pool[i].moves, rng) else {
                    continue;
                };
                let candidate = pool[i].solution.relocate(&mv);

                if candidate.length() < worst_len {
                    if candidate.length() < best_length {
                        best_length = candidate.length();
                        trace.record(&candidate);
                    }
                    pool[worst_idx] = BeamMember::new(candidate);
                    (worst_idx, worst_len) = worst_member(&pool);
                    replaced = true;
                }
            }

            if !replaced {
                break;
            }
        }

        let best = pool
            .into_iter()
            .map(|m| m.solution)
            .min_by_key(|s| OrderedFloat(s.length()))
            .unwrap_or_else(|| initial.clone());

        log::debug!("{}: best {:.2} after {} sweeps", self.name(), best.length(), sweeps);
        finish(best, self.name(), sweeps, start)
    }

    fn name(&self) -> &str {
        "BeamSearch"
    }
}

/// Running best length after each restart, keyed by restart index
pub type RestartLog = BTreeMap<usize, Vec<f64>>;

/// Multi-restart parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiRestartConfig {
    /// Number of independent descents
    pub n_tries: usize,
    /// Run the descents on the rayon thread pool
    pub parallel: bool,
}

impl Default for MultiRestartConfig {
    fn default() -> Self {
        MultiRestartConfig { n_tries: 35, parallel: false }
    }
}

/// Repeated random descent from the same start, keeping the overall best
#[derive(Debug, Clone, Default)]
pub struct MultiRestartLocalSearch {
    pub config: MultiRestartConfig,
}

impl MultiRestartLocalSearch {
    pub fn new() -> Self {
        MultiRestartLocalSearch { config: MultiRestartConfig::default() }
    }

    pub fn with_config(config: MultiRestartConfig) -> Self {
        MultiRestartLocalSearch { config }
    }

    /// Run all restarts; when `restart_log` is given, the running best length after
    /// restart `i` is appended to `restart_log[i]`
    pub fn improve_with_log(
        &self,
        initial: &Solution,
        rng: &mut dyn RngCore,
        trace: &mut Trace,
        mut restart_log: Option<&mut RestartLog>,
    ) -> Solution {
        let start = std::time::Instant::now();
        let descent = RandomDescent::new();

        let results: Vec<Solution> = if self.config.parallel {
            // one independent stream per restart, seeded in restart order
            let seeds: Vec<u64> = (0..self.config.n_tries).map(|_| rng.next_u64()).collect();
            seeds
                .par_iter()
                .map(|&seed| {
                    let mut trial_rng = ChaCha8Rng::seed_from_u64(seed);
                    descent.improve(initial, &mut trial_rng, &mut Trace::disabled())
                })
                .collect()
        } else {
            (0..self.config.n_tries)
                .map(|_| descent.improve(initial, rng, &mut Trace::disabled()))
                .collect()
        };

        let mut best = initial.clone();
        let mut best_length = f64::INFINITY;
        trace.record(initial);

        for (restart, result) in results.into_iter().enumerate() {
            if result.length() < best_length {
                best_length = result.length();
                trace.record(&result);
                best = result;
            }
            if let Some(entries) = restart_log.as_deref_mut() {
                entries.entry(restart).or_default().push(best_length);
            }
            log::debug!("{}: restart {} running best {:.2}", self.name(), restart, best_length);
        }

        finish(best, self.name(), self.config.n_tries, start)
    }
}

impl LocalSearch for MultiRestartLocalSearch {
    fn improve(&self, initial: &Solution, rng: &mut dyn RngCore, trace: &mut Trace) -> Solution {
        self.improve_with_log(initial, rng, trace, None)
    }

    fn name(&self) -> &str {
        "MultiRestart"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::construction::{ConstructionHeuristic, GreedyConstruction, RandomConstruction};
    use crate::instance::TaxiInstance;

    fn create_test_instance() -> TaxiInstance {
        TaxiInstance::random(8, &mut ChaCha8Rng::seed_from_u64(11))
    }

    fn random_start(instance: &TaxiInstance) -> Solution {
        RandomConstruction::new().construct(instance, &mut ChaCha8Rng::seed_from_u64(2))
    }

    fn assert_non_increasing(lengths: &[f64]) {
        for w in lengths.windows(2) {
            assert!(w[1] <= w[0], "trace increased: {:?}", lengths);
        }
    }

    #[test]
    fn test_random_descent() {
        let instance = create_test_instance();
        let initial = random_start(&instance);
        let mut trace = Trace::recording();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let solution = RandomDescent::new().improve(&initial, &mut rng, &mut trace);

        instance.check_solution(&solution).unwrap();
        assert!(solution.length() <= initial.length());
        assert_non_increasing(&trace.lengths());
        assert_eq!(trace.steps().last().map(|s| s.length), Some(solution.length()));

        // no neighbor of the result is shorter
        assert!(solution.neighbors().iter().all(|n| n.length() >= solution.length()));
    }

    #[test]
    fn test_hill_climbing_reaches_local_optimum() {
        let instance = create_test_instance();
        let initial = random_start(&instance);
        let mut trace = Trace::recording();

        let solution = HillClimbing::new().improve(&initial, &mut ChaCha8Rng::seed_from_u64(1), &mut trace);

        instance.check_solution(&solution).unwrap();
        assert_non_increasing(&trace.lengths());
        assert!(solution.neighbors().iter().all(|n| n.length() >= solution.length()));
        assert_eq!(solution.algorithm, "HillClimbing");
    }

    #[test]
    fn test_annealing_probability_clamps() {
        let sa = SimulatedAnnealing::new();
        assert!((sa.acceptance_probability(0.0, 50.0) - 0.04).abs() < 1e-12);
        assert_eq!(sa.acceptance_probability(-1e6, 1e-3), 1.0);
        assert!(sa.acceptance_probability(100.0, 1.0) < 1e-10);
    }

    #[test]
    fn test_simulated_annealing() {
        let instance = create_test_instance();
        let initial = random_start(&instance);
        let sa = SimulatedAnnealing::new();

        let solution = sa.improve(&initial, &mut ChaCha8Rng::seed_from_u64(7), &mut Trace::disabled());

        instance.check_solution(&solution).unwrap();
        assert!(solution.length() <= initial.length());
        // ceil(ln(0.1 / 100) / ln(0.995)) cooling steps
        assert_eq!(solution.iterations, Some(1379));
    }

    #[test]
    fn test_beam_search() {
        let instance = create_test_instance();
        let initial = random_start(&instance);
        let beam = BeamSearch::with_config(BeamConfig { beam_width: 10 });
        let mut trace = Trace::recording();

        let solution = beam.improve(&initial, &mut ChaCha8Rng::seed_from_u64(5), &mut trace);

        instance.check_solution(&solution).unwrap();
        assert!(solution.length() <= initial.length());
        assert_non_increasing(&trace.lengths());
    }

    #[test]
    fn test_worst_member_prefers_first_on_ties() {
        let instance = create_test_instance();
        let greedy = GreedyConstruction::new().construct(&instance, &mut ChaCha8Rng::seed_from_u64(0));
        let random = random_start(&instance);
        assert_ne!(greedy.length(), random.length());
        let (short, long) = if greedy.length() < random.length() {
            (greedy, random)
        } else {
            (random, greedy)
        };

        let mut pool: Vec<BeamMember> = (0..4).map(|_| BeamMember::new(short.clone())).collect();
        assert_eq!(worst_member(&pool), (0, short.length()));

        pool[2] = BeamMember::new(long.clone());
        pool[3] = BeamMember::new(long.clone());
        assert_eq!(worst_member(&pool), (2, long.length()));
    }

    #[test]
    fn test_multi_restart_log_and_parallel() {
        let instance = create_test_instance();
        let mut source = ChaCha8Rng::seed_from_u64(3);
        let initial = GreedyConstruction::new().construct(&instance, &mut source);

        let mut log = RestartLog::new();
        let sequential = MultiRestartLocalSearch::with_config(MultiRestartConfig { n_tries: 5, parallel: false });
        let solution = sequential.improve_with_log(
            &initial,
            &mut ChaCha8Rng::seed_from_u64(8),
            &mut Trace::disabled(),
            Some(&mut log),
        );

        instance.check_solution(&solution).unwrap();
        assert_eq!(log.len(), 5);
        let running: Vec<f64> = log.values().map(|v| v[0]).collect();
        assert_non_increasing(&running);
        assert_eq!(running.last().copied(), Some(solution.length()));

        let parallel = MultiRestartLocalSearch::with_config(MultiRestartConfig { n_tries: 5, parallel: true });
        let a = parallel.improve(&initial, &mut ChaCha8Rng::seed_from_u64(8), &mut Trace::disabled());
        let b = parallel.improve(&initial, &mut ChaCha8Rng::seed_from_u64(8), &mut Trace::disabled());
        assert_eq!(a, b);
        instance.check_solution(&a).unwrap();
    }
}
