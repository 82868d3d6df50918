//! Full enumeration of pickup/drop orders.

use super::{ExactConfig, ExactResult};
use crate::error::{SolverError, SolverResult};
use crate::instance::{euclidean_distance, TaxiInstance};
use crate::solution::{Solution, Station};

/// Enumerates every order of the `2n` stations and keeps the shortest feasible one.
///
/// Orders are generated position by position; a prefix that places a drop before
/// its pickup can never become feasible, so it is discarded as soon as it appears.
#[derive(Debug, Clone)]
pub struct BruteForceSolver {
    max_passengers: usize,
}

impl Default for BruteForceSolver {
    fn default() -> Self {
        Self::new()
    }
}

struct Enumeration<'a> {
    stations: &'a [Station],
    used: Vec<bool>,
    picked: Vec<bool>,
    order: Vec<Station>,
    best: Option<(f64, Vec<Station>)>,
    leaves: u64,
}

impl Enumeration<'_> {
    fn visit(&mut self, length: f64) {
        if self.order.len() == self.stations.len() + 1 {
            self.leaves += 1;
            if self.best.as_ref().map_or(true, |(best, _)| length < *best) {
                self.best = Some((length, self.order.clone()));
            }
            return;
        }

        for idx in 0..self.stations.len() {
            // stations come in (pickup, drop) pairs per passenger
            let passenger = idx / 2;
            let is_drop = idx % 2 == 1;
            if self.used[idx] || (is_drop && !self.picked[passenger]) {
                continue;
            }

            let station = self.stations[idx];
            let last = self.order[self.order.len() - 1].location;
            let step = euclidean_distance(last, station.location);

            self.used[idx] = true;
            if !is_drop {
                self.picked[passenger] = true;
            }
            self.order.push(station);

            self.visit(length + step);

            self.order.pop();
            if !is_drop {
                self.picked[passenger] = false;
            }
            self.used[idx] = false;
        }
    }
}

impl BruteForceSolver {
    pub fn new() -> Self {
        Self::with_config(&ExactConfig::default())
    }

    pub fn with_config(config: &ExactConfig) -> Self {
        BruteForceSolver {
            max_passengers: config.max_passengers,
        }
    }

    pub fn solve(&self, instance: &TaxiInstance) -> SolverResult<ExactResult> {
        let n = instance.num_passengers();
        if n > self.max_passengers {
            return Err(SolverError::InstanceTooLarge {
                passengers: n,
                limit: self.max_passengers,
            });
        }

        let start = std::time::Instant::now();
        let stations: Vec<Station> = instance
            .passengers
            .iter()
            .flat_map(|p| [Station::pickup(p), Station::drop(p)])
            .collect();

        let mut search = Enumeration {
            stations: &stations,
            used: vec![false; stations.len()],
            picked: vec![false; n],
            order: vec![Station::depot(instance.start)],
            best: None,
            leaves: 0,
        };
        search.visit(0.0);

        let order = search
            .best
            .map(|(_, order)| order)
            .unwrap_or_else(|| vec![Station::depot(instance.start)]);
        let mut solution = Solution::from_stations(order).with_algorithm("BruteForce");
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(search.leaves as usize);

        log::info!(
            "BruteForce: {} feasible orders, best {:.3}",
            search.leaves,
            solution.length()
        );

        Ok(ExactResult {
            solution,
            nodes_explored: search.leaves,
            improved_incumbent: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::construction::{ConstructionHeuristic, GreedyConstruction};
    use crate::instance::{Passenger, Point};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn create_test_instance() -> TaxiInstance {
        TaxiInstance::new(
            "test",
            Point::new(0.0, 0.0),
            vec![
                Passenger::new(1, Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
                Passenger::new(2, Point::new(10.0, 0.0), Point::new(0.0, 0.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_symmetric_scenario() {
        let result = BruteForceSolver::new().solve(&create_test_instance()).unwrap();
        assert!((result.solution.length() - 20.0).abs() < 1e-10);
        // 4! / 2^2 precedence-respecting orders
        assert_eq!(result.nodes_explored, 6);
    }

    #[test]
    fn test_not_worse_than_greedy() {
        for seed in 0..5 {
            let instance = TaxiInstance::random(4, &mut ChaCha8Rng::seed_from_u64(seed));
            let exact = BruteForceSolver::new().solve(&instance).unwrap();
            let greedy = GreedyConstruction::new().construct(&instance, &mut ChaCha8Rng::seed_from_u64(seed));

            instance.check_solution(&exact.solution).unwrap();
            assert!(exact.solution.length() <= greedy.length() + 1e-9);
            assert_eq!(exact.nodes_explored, 2520);
        }
    }

    #[test]
    fn test_rejects_large_instances() {
        let instance = TaxiInstance::random(7, &mut ChaCha8Rng::seed_from_u64(1));
        match BruteForceSolver::new().solve(&instance) {
            Err(SolverError::InstanceTooLarge { passengers, limit }) => {
                assert_eq!(passengers, 7);
                assert_eq!(limit, 6);
            }
            other => panic!("expected InstanceTooLarge, got {:?}", other.map(|r| r.solution.length())),
        }
    }

    #[test]
    fn test_empty_instance() {
        let instance = TaxiInstance::new("empty", Point::new(2.0, 2.0), Vec::new()).unwrap();
        let result = BruteForceSolver::new().solve(&instance).unwrap();
        assert_eq!(result.solution.len(), 1);
        assert_eq!(result.solution.length(), 0.0);
    }
}
