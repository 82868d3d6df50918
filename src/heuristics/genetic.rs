//! Genetic Algorithm over pickup/drop sequences.
//!
//! The engine keeps a population of feasible solutions and recombines every
//! pair of members each generation. Recombination is delegated to a pluggable
//! [`GeneticOperators`] implementation; two are provided:
//! - [`SequencePreserving`]: keeps positions the parents agree on and a prefix of
//!   one parent, filling the rest in the other parent's order
//! - [`SegmentPreserving`]: copies a slice of the first parent and orders the
//!   remaining stations around it following the second parent

use crate::heuristics::construction::{ConstructionHeuristic, RandomConstruction};
use crate::instance::TaxiInstance;
use crate::solution::{Solution, Station};
use ordered_float::OrderedFloat;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Crossover operator used when none is supplied explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverKind {
    /// Two children, gaps filled in the other parent's order
    SequencePreserving,
    /// One child built around a slice of the first parent
    #[default]
    SegmentPreserving,
}

/// How equal members are collapsed when the population is trimmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Members sharing a length value are collapsed, first one kept
    ByLength,
    /// Only members with identical station sequences are collapsed
    #[default]
    ByStructure,
    /// No deduplication
    Keep,
}

/// Genetic Algorithm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GAConfig {
    /// Population size
    pub population_size: usize,
    /// Number of generations
    pub max_generations: usize,
    /// Probability to mutate each child
    pub mutation_prob: f64,
    /// Stop once max/min length of the population falls below this ratio
    pub convergence_ratio: f64,
    /// Crossover operator
    pub crossover: CrossoverKind,
    /// Population trimming policy
    pub dedup: DedupPolicy,
    /// Number of shuffled pairs crossed per generation, all pairs when `None`
    pub pairs_per_generation: Option<usize>,
}

impl Default for GAConfig {
    fn default() -> Self {
        GAConfig {
            population_size: 20,
            max_generations: 400,
            mutation_prob: 0.05,
            convergence_ratio: 1.02,
            crossover: CrossoverKind::default(),
            dedup: DedupPolicy::default(),
            pairs_per_generation: None,
        }
    }
}

/// Recombination and mutation used by the engine
pub trait GeneticOperators {
    /// Produce one or two children from two feasible parents
    fn crossover(&self, parent1: &Solution, parent2: &Solution, rng: &mut dyn RngCore) -> Vec<Solution>;

    /// With probability `prob`, replace the solution by a random neighbor
    fn mutate(&self, solution: Solution, prob: f64, rng: &mut dyn RngCore) -> Solution {
        if rng.gen::<f64>() < prob {
            solution.random_neighbor(rng).unwrap_or(solution)
        } else {
            solution
        }
    }

    fn name(&self) -> &str;
}

/// Mark positions `i` and `i + 1` wherever both parents hold the same pair of
/// consecutive stations. The depot slot is never marked.
pub fn find_matches(p1: &[Station], p2: &[Station]) -> Vec<bool> {
    let mut matches = vec![false; p1.len()];
    let n = p1.len().min(p2.len());
    for i in 1..n.saturating_sub(1) {
        if p1[i] == p2[i] && p1[i + 1] == p2[i + 1] {
            matches[i] = true;
            matches[i + 1] = true;
        }
    }
    matches
}

/// Swap the two stations of every passenger whose drop precedes its pickup
fn repair_precedence(stations: &mut [Station]) {
    let mut first_seen: HashMap<usize, usize> = HashMap::new();
    let mut inverted = Vec::new();

    for (index, station) in stations.iter().enumerate().skip(1) {
        match first_seen.get(&station.passenger_id) {
            Some(&first) if !station.is_drop => inverted.push((first, index)),
            Some(_) => {}
            None => {
                first_seen.insert(station.passenger_id, index);
            }
        }
    }

    for (drop_at, pickup_at) in inverted {
        stations.swap(drop_at, pickup_at);
    }
}

/// Sequence-preserving crossover, two children
///
/// Positions on which the parents agree, plus the first `cut` remaining positions
/// (depot included), are copied from each parent. The gaps are filled with the
/// missing stations in the order of the other parent. Children whose drop ended
/// up ahead of its pickup are repaired by swapping that passenger's stations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequencePreserving;

impl SequencePreserving {
    fn scaffold(
        parent: &[Station],
        matches: &[bool],
        mut cut: usize,
    ) -> (Vec<Option<Station>>, HashSet<(usize, bool)>) {
        let mut fixed = matches.to_vec();
        for slot in fixed.iter_mut() {
            if cut == 0 {
                break;
            }
            if !*slot {
                *slot = true;
                cut -= 1;
            }
        }

        let child = parent
            .iter()
            .zip(&fixed)
            .map(|(station, &keep)| keep.then_some(*station))
            .collect();
        let missing = parent
            .iter()
            .zip(&fixed)
            .filter(|(_, keep)| !**keep)
            .map(|(station, _)| station.key())
            .collect();

        (child, missing)
    }

    /// Fill the gaps in order with the donor's stations whose key is missing.
    /// The donor holds every key once, so one pass places everything it can;
    /// gaps left afterwards mean the parents serve different passengers.
    fn complete(
        child: &mut [Option<Station>],
        donor: &[Station],
        missing: &mut HashSet<(usize, bool)>,
    ) {
        let mut gaps = child.iter_mut().filter(|slot| slot.is_none());

        for station in donor.iter().skip(1) {
            if !missing.remove(&station.key()) {
                continue;
            }
            let Some(gap) = gaps.next() else {
                break;
            };
            *gap = Some(*station);
        }
    }

    fn child(parent: &Solution, donor: &Solution, matches: &[bool], cut: usize) -> Solution {
        let (mut child, mut missing) = Self::scaffold(parent.stations(), matches, cut);
        Self::complete(&mut child, donor.stations(), &mut missing);

        let stations: Option<Vec<Station>> = child.into_iter().collect();
        match stations {
            Some(mut stations) => {
                repair_precedence(&mut stations);
                Solution::from_stations(stations)
            }
            None => {
                log::warn!("sequence crossover left unfilled stations, keeping parent");
                parent.clone()
            }
        }
    }
}

impl GeneticOperators for SequencePreserving {
    fn crossover(&self, parent1: &Solution, parent2: &Solution, rng: &mut dyn RngCore) -> Vec<Solution> {
        if parent1.len() != parent2.len() || parent1.len() < 3 {
            return vec![parent1.clone(), parent2.clone()];
        }

        let matches = find_matches(parent1.stations(), parent2.stations());
        let unmatched = matches.iter().filter(|&&m| !m).count();
        let cut = rng.gen_range(1..=unmatched);

        vec![
            Self::child(parent1, parent2, &matches, cut),
            Self::child(parent2, parent1, &matches, cut),
        ]
    }

    fn name(&self) -> &str {
        "SequencePreserving"
    }
}

/// Segment-preserving crossover, one child
///
/// A random slice of the first parent is kept as is. Pickups whose drop is in
/// the slice must come before it, drops whose pickup is in the slice after it;
/// every station is placed in the order it appears in the second parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentPreserving;

impl SegmentPreserving {
    /// Slice bounds `[start, end)` over `len` non-depot stations for two draws in `[0, 1)`
    pub fn slice_bounds(a: f64, b: f64, len: usize) -> (usize, usize) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let start = ((lo * len as f64) as usize).min(len.saturating_sub(1));
        let end = ((hi * len as f64) as usize + 1).min(len);
        (start, end)
    }

    /// Build the child for a fixed slice `[start, end)` of `parent1` (depot excluded)
    pub fn child_for_slice(parent1: &Solution, parent2: &Solution, start: usize, end: usize) -> Solution {
        let depot = parent1.stations()[0];
        let p1 = &parent1.stations()[1..];
        let slice = &p1[start..end];

        let picked_in_slice: HashSet<usize> = slice
            .iter()
            .filter(|s| !s.is_drop)
            .map(|s| s.passenger_id)
            .collect();
        let dropped_in_slice: HashSet<usize> = slice
            .iter()
            .filter(|s| s.is_drop)
            .map(|s| s.passenger_id)
            .collect();
        let slice_keys: HashSet<(usize, bool)> = slice.iter().map(|s| s.key()).collect();

        let mut must_precede: HashSet<(usize, bool)> = p1
            .iter()
            .filter(|s| {
                !s.is_drop
                    && dropped_in_slice.contains(&s.passenger_id)
                    && !picked_in_slice.contains(&s.passenger_id)
            })
            .map(|s| s.key())
            .collect();
        let must_follow: HashSet<(usize, bool)> = p1
            .iter()
            .filter(|s| {
                s.is_drop
                    && picked_in_slice.contains(&s.passenger_id)
                    && !dropped_in_slice.contains(&s.passenger_id)
            })
            .map(|s| s.key())
            .collect();

        let mut before = Vec::new();
        let mut after = Vec::new();

        for station in parent2.stations().iter().skip(1) {
            let key = station.key();
            if slice_keys.contains(&key) {
                continue;
            }
            if must_precede.remove(&key) {
                before.push(*station);
            } else if must_follow.contains(&key) {
                after.push(*station);
            } else if !must_precede.is_empty() {
                before.push(*station);
            } else {
                after.push(*station);
            }
        }

        let mut stations = Vec::with_capacity(parent1.len());
        stations.push(depot);
        stations.extend(before);
        stations.extend_from_slice(slice);
        stations.extend(after);
        Solution::from_stations(stations)
    }
}

impl GeneticOperators for SegmentPreserving {
    fn crossover(&self, parent1: &Solution, parent2: &Solution, rng: &mut dyn RngCore) -> Vec<Solution> {
        if parent1.len() < 2 {
            return vec![parent1.clone()];
        }
        let len = parent1.len() - 1;
        let (a, b) = (rng.gen::<f64>(), rng.gen::<f64>());
        let (start, end) = Self::slice_bounds(a, b, len);
        vec![Self::child_for_slice(parent1, parent2, start, end)]
    }

    fn name(&self) -> &str {
        "SegmentPreserving"
    }
}

/// Genetic Algorithm implementation
pub struct GeneticAlgorithm {
    config: GAConfig,
    instance: TaxiInstance,
    operators: Box<dyn GeneticOperators>,
    population: Vec<Solution>,
    best: Option<Solution>,
    best_history: Vec<f64>,
    generation: usize,
}

impl GeneticAlgorithm {
    pub fn new(instance: &TaxiInstance, config: GAConfig) -> Self {
        let operators: Box<dyn GeneticOperators> = match config.crossover {
            CrossoverKind::SequencePreserving => Box::new(SequencePreserving),
            CrossoverKind::SegmentPreserving => Box::new(SegmentPreserving),
        };
        Self::with_operators(instance, config, operators)
    }

    /// Use caller-supplied recombination; `config.crossover` is ignored
    pub fn with_operators(instance: &TaxiInstance, config: GAConfig, operators: Box<dyn GeneticOperators>) -> Self {
        GeneticAlgorithm {
            config,
            instance: instance.clone(),
            operators,
            population: Vec::new(),
            best: None,
            best_history: Vec::new(),
            generation: 0,
        }
    }

    fn initialize_population(&mut self, rng: &mut dyn RngCore) {
        let builder = RandomConstruction::new();
        let size = self.config.population_size.max(1);
        self.population = (0..size).map(|_| builder.construct(&self.instance, rng)).collect();
    }

    fn sort_population(&mut self) {
        self.population.sort_by_key(|s| OrderedFloat(s.length()));
    }

    /// Take the first (shortest) member as global best when it improves
    fn update_best(&mut self) {
        let Some(candidate) = self.population.first() else {
            return;
        };
        let improved = self.best.as_ref().map_or(true, |best| candidate.length() < best.length());
        if improved {
            self.best = Some(candidate.clone());
        }
        if let Some(best) = &self.best {
            self.best_history.push(best.length());
        }
    }

    fn converged(&self) -> bool {
        let (Some(min), Some(max)) = (self.population.first(), self.population.last()) else {
            return true;
        };
        let (min, max) = (min.length(), max.length());
        if max == 0.0 {
            return true;
        }
        max / min < self.config.convergence_ratio
    }

    fn trim_population(&mut self) {
        match self.config.dedup {
            DedupPolicy::ByLength => self.population.dedup_by(|a, b| a.length() == b.length()),
            DedupPolicy::ByStructure => {
                let mut kept: Vec<Solution> = Vec::with_capacity(self.population.len());
                for candidate in self.population.drain(..) {
                    let duplicate = kept
                        .iter()
                        .rev()
                        .take_while(|s| s.length() == candidate.length())
                        .any(|s| *s == candidate);
                    if !duplicate {
                        kept.push(candidate);
                    }
                }
                self.population = kept;
            }
            DedupPolicy::Keep => {}
        }
        self.population.truncate(self.config.population_size.max(1));
    }

    fn evolve(&mut self, rng: &mut dyn RngCore) {
        let n = self.population.len();
        let mut pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i + 1..n).map(move |j| (i, j))).collect();
        pairs.shuffle(rng);
        if let Some(k) = self.config.pairs_per_generation {
            pairs.truncate(k);
        }

        let mut children = Vec::with_capacity(2 * pairs.len());
        for (i, j) in pairs {
            for child in self.operators.crossover(&self.population[i], &self.population[j], rng) {
                children.push(self.operators.mutate(child, self.config.mutation_prob, rng));
            }
        }

        self.population.extend(children);
        self.sort_population();
        self.trim_population();
    }

    /// Run the algorithm; returns the global best solution and its length
    pub fn run(&mut self, rng: &mut dyn RngCore) -> (Solution, f64) {
        let start = std::time::Instant::now();

        self.initialize_population(rng);
        self.best = None;
        self.best_history.clear();
        self.generation = 0;

        while self.generation < self.config.max_generations {
            self.sort_population();
            self.update_best();

            if self.converged() {
                log::debug!("[GA] converged at generation {}", self.generation);
                break;
            }

            self.evolve(rng);
            self.generation += 1;

            log::debug!(
                "[GA] Gen {}  Best {:.3}  Population {}",
                self.generation,
                self.best.as_ref().map_or(f64::INFINITY, |b| b.length()),
                self.population.len()
            );
        }

        self.sort_population();
        self.update_best();

        let mut solution = self
            .best
            .clone()
            .unwrap_or_else(|| Solution::depot_only(self.instance.start))
            .with_algorithm("Genetic");
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(self.generation);

        log::info!(
            "[GA] {} finished after {} generations, best {:.3}",
            self.operators.name(),
            self.generation,
            solution.length()
        );

        let length = solution.length();
        (solution, length)
    }

    /// Global best length recorded once per generation
    pub fn best_history(&self) -> &[f64] {
        &self.best_history
    }

    /// Get current generation
    pub fn current_generation(&self) -> usize {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Passenger, Point};
    use rand_chacha::ChaCha8Rng;

    fn create_test_instance() -> TaxiInstance {
        TaxiInstance::random(7, &mut ChaCha8Rng::seed_from_u64(21))
    }

    fn random_parents(instance: &TaxiInstance, rng: &mut ChaCha8Rng) -> (Solution, Solution) {
        let builder = RandomConstruction::new();
        (builder.construct(instance, rng), builder.construct(instance, rng))
    }

    fn keys(solution: &Solution) -> Vec<(usize, bool)> {
        solution.stations().iter().map(|s| s.key()).collect()
    }

    #[test]
    fn test_find_matches_marks_shared_pairs() {
        let p: Vec<Passenger> = (1..=3)
            .map(|id| Passenger::new(id, Point::new(id as f64, 0.0), Point::new(0.0, id as f64)))
            .collect();
        let depot = Station::depot(Point::default());
        let a = [
            depot,
            Station::pickup(&p[0]),
            Station::drop(&p[0]),
            Station::pickup(&p[1]),
            Station::drop(&p[1]),
        ];
        let b = [
            depot,
            Station::pickup(&p[0]),
            Station::drop(&p[0]),
            Station::pickup(&p[2]),
            Station::drop(&p[1]),
        ];

        assert_eq!(find_matches(&a, &b), vec![false, true, true, false, false]);
        assert_eq!(find_matches(&a, &a), vec![false, true, true, true, true]);
    }

    #[test]
    fn test_repair_swaps_inverted_passenger() {
        let p = Passenger::new(1, Point::new(1.0, 0.0), Point::new(2.0, 0.0));
        let mut stations = vec![Station::depot(Point::default()), Station::drop(&p), Station::pickup(&p)];
        repair_precedence(&mut stations);
        assert!(!stations[1].is_drop);
        assert!(stations[2].is_drop);
    }

    #[test]
    fn test_sequence_crossover_children_are_valid() {
        let instance = create_test_instance();
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        for _ in 0..50 {
            let (p1, p2) = random_parents(&instance, &mut rng);
            let children = SequencePreserving.crossover(&p1, &p2, &mut rng);
            assert_eq!(children.len(), 2);
            for child in &children {
                instance.check_solution(child).unwrap();
                assert_eq!(child.len(), p1.len());
            }
        }
    }

    #[test]
    fn test_sequence_crossover_of_identical_parents() {
        let instance = create_test_instance();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let (p1, _) = random_parents(&instance, &mut rng);

        let children = SequencePreserving.crossover(&p1, &p1, &mut rng);
        assert!(children.iter().all(|c| *c == p1));
    }

    #[test]
    fn test_sequence_child_keeps_parent_when_passengers_differ() {
        let p: Vec<Passenger> = (1..=3)
            .map(|id| Passenger::new(id, Point::new(id as f64, 0.0), Point::new(0.0, id as f64)))
            .collect();
        let depot = Station::depot(Point::default());
        let a = Solution::from_stations(vec![
            depot,
            Station::pickup(&p[0]),
            Station::drop(&p[0]),
            Station::pickup(&p[1]),
            Station::drop(&p[1]),
        ]);
        let b = Solution::from_stations(vec![
            depot,
            Station::pickup(&p[2]),
            Station::drop(&p[2]),
            Station::pickup(&p[0]),
            Station::drop(&p[0]),
        ]);

        let matches = find_matches(a.stations(), b.stations());
        assert!(matches.iter().all(|m| !m));

        // only the depot is fixed, passenger 2 has no counterpart in the donor
        assert_eq!(SequencePreserving::child(&a, &b, &matches, 1), a);
        assert_eq!(SequencePreserving::child(&b, &a, &matches, 1), b);
    }

    #[test]
    fn test_segment_bounds() {
        assert_eq!(SegmentPreserving::slice_bounds(0.0, 0.0, 10), (0, 1));
        assert_eq!(SegmentPreserving::slice_bounds(0.95, 0.25, 10), (2, 10));
        assert_eq!(SegmentPreserving::slice_bounds(0.5, 0.5, 4), (2, 3));
    }

    #[test]
    fn test_segment_child_keeps_slice() {
        let instance = create_test_instance();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let (p1, p2) = random_parents(&instance, &mut rng);

        let child = SegmentPreserving::child_for_slice(&p1, &p2, 3, 8);
        instance.check_solution(&child).unwrap();

        let slice: Vec<(usize, bool)> = keys(&p1)[4..9].to_vec();
        let child_keys = keys(&child);
        assert!(child_keys.windows(slice.len()).any(|w| w == slice.as_slice()));
    }

    #[test]
    fn test_segment_crossover_children_are_valid() {
        let instance = create_test_instance();
        let mut rng = ChaCha8Rng::seed_from_u64(10);

        for _ in 0..50 {
            let (p1, p2) = random_parents(&instance, &mut rng);
            let children = SegmentPreserving.crossover(&p1, &p2, &mut rng);
            assert_eq!(children.len(), 1);
            instance.check_solution(&children[0]).unwrap();
        }
    }

    #[test]
    fn test_mutation_probability() {
        let instance = create_test_instance();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let (p1, _) = random_parents(&instance, &mut rng);

        let same = SegmentPreserving.mutate(p1.clone(), 0.0, &mut rng);
        assert_eq!(same, p1);

        let moved = SegmentPreserving.mutate(p1.clone(), 1.0, &mut rng);
        assert_ne!(moved, p1);
        instance.check_solution(&moved).unwrap();
    }

    #[test]
    fn test_genetic_algorithm() {
        let instance = create_test_instance();
        for crossover in [CrossoverKind::SequencePreserving, CrossoverKind::SegmentPreserving] {
            let config = GAConfig {
                max_generations: 30,
                crossover,
                ..Default::default()
            };
            let mut ga = GeneticAlgorithm::new(&instance, config);
            let (solution, length) = ga.run(&mut ChaCha8Rng::seed_from_u64(42));

            instance.check_solution(&solution).unwrap();
            assert_eq!(length, solution.length());
            assert!(ga.current_generation() <= 30);

            let history = ga.best_history();
            assert!(!history.is_empty());
            assert!(history.windows(2).all(|w| w[1] <= w[0]));
            assert_eq!(history.last().copied(), Some(length));
        }
    }

    #[test]
    fn test_length_dedup_reproduces_trim() {
        let instance = create_test_instance();
        let config = GAConfig {
            max_generations: 5,
            dedup: DedupPolicy::ByLength,
            pairs_per_generation: Some(20),
            ..Default::default()
        };
        let mut ga = GeneticAlgorithm::new(&instance, config);
        ga.run(&mut ChaCha8Rng::seed_from_u64(1));

        let lengths: Vec<f64> = ga.population.iter().map(|s| s.length()).collect();
        assert!(lengths.windows(2).all(|w| w[0] < w[1]));
        assert!(lengths.len() <= 20);
    }

    struct CloneParents;

    impl GeneticOperators for CloneParents {
        fn crossover(&self, parent1: &Solution, parent2: &Solution, _rng: &mut dyn RngCore) -> Vec<Solution> {
            vec![parent1.clone(), parent2.clone()]
        }

        fn name(&self) -> &str {
            "CloneParents"
        }
    }

    #[test]
    fn test_custom_operators() {
        let instance = create_test_instance();
        let config = GAConfig {
            max_generations: 10,
            mutation_prob: 1.0,
            ..Default::default()
        };
        let mut ga = GeneticAlgorithm::with_operators(&instance, config, Box::new(CloneParents));
        let (solution, _) = ga.run(&mut ChaCha8Rng::seed_from_u64(3));
        instance.check_solution(&solution).unwrap();
    }

    #[test]
    fn test_empty_instance_converges_immediately() {
        let instance = TaxiInstance::new("empty", Point::default(), Vec::new()).unwrap();
        let mut ga = GeneticAlgorithm::new(&instance, GAConfig::default());
        let (solution, length) = ga.run(&mut ChaCha8Rng::seed_from_u64(0));

        assert_eq!(length, 0.0);
        assert_eq!(solution.len(), 1);
        assert_eq!(ga.current_generation(), 0);
    }
}
