//! Depth-first branch and bound over pickup/drop orders.

use super::ExactResult;
use crate::instance::{euclidean_distance, TaxiInstance};
use crate::solution::{Solution, Station};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Waiting,
    OnBoard,
    Delivered,
}

/// Branch and bound solver
///
/// Extends a partial route one station at a time. Each undelivered passenger
/// offers exactly one next station (its pickup, or its drop once on board),
/// branches are tried in passenger order, and a partial route whose length
/// already reaches the best known bound is abandoned.
#[derive(Debug, Clone, Default)]
pub struct BranchAndBoundSolver {
    incumbent: Option<Solution>,
    bound: Option<f64>,
}

struct Search<'a> {
    instance: &'a TaxiInstance,
    progress: Vec<Progress>,
    route: Vec<Station>,
    best_length: f64,
    best_route: Option<Vec<Station>>,
    nodes: u64,
}

impl Search<'_> {
    fn explore(&mut self, length: f64) {
        self.nodes += 1;

        let complete = self.progress.iter().all(|&p| p == Progress::Delivered);
        if complete {
            if length < self.best_length {
                self.best_length = length;
                self.best_route = Some(self.route.clone());
            }
            return;
        }

        if length >= self.best_length {
            return;
        }

        let last = self.route[self.route.len() - 1].location;
        for idx in 0..self.progress.len() {
            let passenger = &self.instance.passengers[idx];
            let (station, next) = match self.progress[idx] {
                Progress::Waiting => (Station::pickup(passenger), Progress::OnBoard),
                Progress::OnBoard => (Station::drop(passenger), Progress::Delivered),
                Progress::Delivered => continue,
            };
            let previous = self.progress[idx];

            self.progress[idx] = next;
            self.route.push(station);

            self.explore(length + euclidean_distance(last, station.location));

            self.route.pop();
            self.progress[idx] = previous;
        }
    }
}

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        BranchAndBoundSolver {
            incumbent: None,
            bound: None,
        }
    }

    /// Start from a known solution; only routes shorter than its length plus
    /// `epsilon` are accepted
    pub fn with_incumbent(mut self, solution: Solution, epsilon: f64) -> Self {
        self.bound = Some(solution.length() + epsilon);
        self.incumbent = Some(solution);
        self
    }

    pub fn solve(&self, instance: &TaxiInstance) -> ExactResult {
        let start = std::time::Instant::now();

        let mut search = Search {
            instance,
            progress: vec![Progress::Waiting; instance.num_passengers()],
            route: vec![Station::depot(instance.start)],
            best_length: self.bound.unwrap_or(f64::INFINITY),
            best_route: None,
            nodes: 0,
        };
        search.explore(0.0);

        let improved_incumbent = search.best_route.is_some();
        let solution = match (search.best_route, &self.incumbent) {
            (Some(route), _) => Solution::from_stations(route),
            (None, Some(incumbent)) => incumbent.clone(),
            (None, None) => Solution::depot_only(instance.start),
        };

        let mut solution = solution.with_algorithm("BranchAndBound");
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(search.nodes as usize);

        log::info!(
            "BranchAndBound: {} nodes, best {:.3}{}",
            search.nodes,
            solution.length(),
            if improved_incumbent { "" } else { " (incumbent kept)" }
        );

        ExactResult {
            solution,
            nodes_explored: search.nodes,
            improved_incumbent,
        }
    }
}
