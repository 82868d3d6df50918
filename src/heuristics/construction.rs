//! Construction heuristics building a first feasible solution from the passenger list.

use crate::instance::{euclidean_distance, TaxiInstance};
use crate::solution::{Solution, Station};
use rand::{Rng, RngCore};

pub trait ConstructionHeuristic {
    fn construct(&self, instance: &TaxiInstance, rng: &mut dyn RngCore) -> Solution;
    fn name(&self) -> &str;
}

/// Random feasible construction
///
/// At every step one passenger still waiting or still on board is drawn uniformly;
/// a waiting passenger is picked up, an on-board passenger is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomConstruction;

impl RandomConstruction {
    pub fn new() -> Self {
        RandomConstruction
    }
}

impl ConstructionHeuristic for RandomConstruction {
    fn construct(&self, instance: &TaxiInstance, rng: &mut dyn RngCore) -> Solution {
        let start = std::time::Instant::now();

        let mut stations = Vec::with_capacity(2 * instance.num_passengers() + 1);
        stations.push(Station::depot(instance.start));

        // (passenger index, on board)
        let mut pending: Vec<(usize, bool)> = (0..instance.passengers.len()).map(|i| (i, false)).collect();

        while !pending.is_empty() {
            let idx = rng.gen_range(0..pending.len());
            let (passenger_idx, on_board) = pending[idx];
            let passenger = &instance.passengers[passenger_idx];

            if on_board {
                stations.push(Station::drop(passenger));
                pending.swap_remove(idx);
            } else {
                stations.push(Station::pickup(passenger));
                pending[idx].1 = true;
            }
        }

        let mut solution = Solution::from_stations(stations).with_algorithm(self.name());
        solution.computation_time = start.elapsed().as_secs_f64();
        solution
    }

    fn name(&self) -> &str {
        "Random"
    }
}

/// Greedy nearest-station construction
///
/// From the current position, moves to the closest legal station: the pickup of a
/// waiting passenger or the drop of an on-board one. Ties keep the first candidate
/// in passenger order.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyConstruction;

impl GreedyConstruction {
    pub fn new() -> Self {
        GreedyConstruction
    }
}

impl ConstructionHeuristic for GreedyConstruction {
    fn construct(&self, instance: &TaxiInstance, _rng: &mut dyn RngCore) -> Solution {
        let start = std::time::Instant::now();

        let mut stations = Vec::with_capacity(2 * instance.num_passengers() + 1);
        stations.push(Station::depot(instance.start));

        let mut on_board = vec![false; instance.passengers.len()];
        let mut served = vec![false; instance.passengers.len()];
        let mut current = instance.start;

        loop {
            let mut closest: Option<(usize, f64)> = None;
            for (idx, passenger) in instance.passengers.iter().enumerate() {
                if served[idx] {
                    continue;
                }
                let target = if on_board[idx] { passenger.end } else { passenger.start };
                let dist = euclidean_distance(current, target);
                if closest.map_or(true, |(_, best)| dist < best) {
                    closest = Some((idx, dist));
                }
            }

            let Some((idx, _)) = closest else {
                break;
            };
            let passenger = &instance.passengers[idx];
            let station = if on_board[idx] {
                served[idx] = true;
                Station::drop(passenger)
            } else {
                on_board[idx] = true;
                Station::pickup(passenger)
            };
            current = station.location;
            stations.push(station);
        }

        let mut solution = Solution::from_stations(stations).with_algorithm(self.name());
        solution.computation_time = start.elapsed().as_secs_f64();
        solution
    }

    fn name(&self) -> &str {
        "Greedy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn test_greedy_symmetric_scenario() {
        let instance = create_test_instance();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let solution = GreedyConstruction::new().construct(&instance, &mut rng);

        let route: Vec<(usize, bool)> = solution.stations().iter().map(|s| s.key()).collect();
        assert_eq!(route, vec![(0, false), (1, false), (1, true), (2, false), (2, true)]);
        assert!((solution.length() - 20.0).abs() < 1e-10);
        assert_eq!(solution.algorithm, "Greedy");
    }

    #[test]
    fn test_random_construction_is_valid_and_seeded() {
        let mut source = ChaCha8Rng::seed_from_u64(3);
        let instance = TaxiInstance::random(12, &mut source);

        let a = RandomConstruction::new().construct(&instance, &mut ChaCha8Rng::seed_from_u64(9));
        let b = RandomConstruction::new().construct(&instance, &mut ChaCha8Rng::seed_from_u64(9));

        assert_eq!(a, b);
        assert_eq!(a.len(), 25);
        instance.check_solution(&a).unwrap();
    }

    #[test]
    fn test_empty_instance() {
        let instance = TaxiInstance::new("empty", Point::new(1.0, 2.0), Vec::new()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for solution in [
            GreedyConstruction::new().construct(&instance, &mut rng),
            RandomConstruction::new().construct(&instance, &mut rng),
        ] {
            assert_eq!(solution.len(), 1);
            assert_eq!(solution.length(), 0.0);
        }
    }
}
