//! Solution representation and manipulation.
//!
//! A solution is the ordered list of stations the taxi visits, starting at the depot.
//! Every passenger contributes a pickup station and a later drop station. Solutions
//! are treated as values: moves never edit a solution in place, they build a new one.

use crate::error::{InvalidSolution, SolverResult};
use crate::instance::{euclidean_distance, Passenger, Point};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Passenger id carried by the depot station
pub const DEPOT_ID: usize = 0;

/// A pickup or drop event at a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub location: Point,
    /// Passenger served here, `DEPOT_ID` for the depot
    pub passenger_id: usize,
    pub is_drop: bool,
}

impl Station {
    pub fn depot(location: Point) -> Self {
        Station { location, passenger_id: DEPOT_ID, is_drop: false }
    }

    pub fn pickup(passenger: &Passenger) -> Self {
        Station { location: passenger.start, passenger_id: passenger.id, is_drop: false }
    }

    pub fn drop(passenger: &Passenger) -> Self {
        Station { location: passenger.end, passenger_id: passenger.id, is_drop: true }
    }

    pub fn is_depot(&self) -> bool {
        self.passenger_id == DEPOT_ID
    }

    /// Identity of the station inside a solution: (passenger id, drop flag)
    #[inline]
    pub fn key(&self) -> (usize, bool) {
        (self.passenger_id, self.is_drop)
    }
}

/// Total travelled distance along consecutive stations
pub fn solution_length(stations: &[Station]) -> f64 {
    stations
        .windows(2)
        .map(|w| euclidean_distance(w[0].location, w[1].location))
        .sum()
}

/// A single-station relocation: remove the station at `from`, then insert it at
/// index `to` of the shortened sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub from: usize,
    pub to: usize,
}

/// Represents a solution to the routing problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    stations: Vec<Station>,
    length: f64,
    /// Algorithm that generated this solution
    #[serde(default)]
    pub algorithm: String,
    /// Computation time in seconds
    #[serde(default)]
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    #[serde(default)]
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create a solution from a station sequence
    pub fn from_stations(stations: Vec<Station>) -> Self {
        let length = solution_length(&stations);
        Solution {
            stations,
            length,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// The trivial solution of an instance without passengers
    pub fn depot_only(start: Point) -> Self {
        Self::from_stations(vec![Station::depot(start)])
    }

    /// Tag the solution with the algorithm that produced it
    pub fn with_algorithm(mut self, algorithm: &str) -> Self {
        self.algorithm = algorithm.to_string();
        self
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn into_stations(self) -> Vec<Station> {
        self.stations
    }

    /// Total travelled distance, depot leg included
    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Number of passengers served
    pub fn num_passengers(&self) -> usize {
        self.stations.len().saturating_sub(1) / 2
    }

    /// Check the depot, uniqueness and pickup-before-drop invariants
    pub fn validate(&self) -> Result<(), InvalidSolution> {
        match self.stations.first() {
            Some(first) if first.is_depot() => {}
            _ => return Err(InvalidSolution::MissingDepot),
        }

        let mut picked_up = HashSet::new();
        let mut dropped = HashSet::new();

        for (index, station) in self.stations.iter().enumerate().skip(1) {
            let passenger_id = station.passenger_id;
            if !station.is_drop {
                if !picked_up.insert(passenger_id) {
                    return Err(InvalidSolution::DuplicatePickup { passenger_id, index });
                }
            } else {
                if !picked_up.contains(&passenger_id) {
                    return Err(InvalidSolution::DropWithoutPickup { passenger_id, index });
                }
                if !dropped.insert(passenger_id) {
                    return Err(InvalidSolution::DuplicateDrop { passenger_id, index });
                }
            }
        }

        if let Some(&passenger_id) = picked_up.iter().filter(|&&id| !dropped.contains(&id)).min() {
            return Err(InvalidSolution::UndeliveredPassenger { passenger_id });
        }

        Ok(())
    }

    /// Position of the pickup and the drop of every passenger
    fn station_positions(&self) -> HashMap<usize, (usize, usize)> {
        let mut positions: HashMap<usize, (usize, usize)> = HashMap::new();
        for (index, station) in self.stations.iter().enumerate().skip(1) {
            let entry = positions.entry(station.passenger_id).or_insert((usize::MAX, usize::MAX));
            if station.is_drop {
                entry.1 = index;
            } else {
                entry.0 = index;
            }
        }
        positions
    }

    /// All precedence-respecting single-station relocations.
    ///
    /// A drop may move anywhere after its pickup, a pickup anywhere before its drop.
    /// Positions are expressed in the sequence with the moved station removed, and the
    /// move that would put the station back where it was is skipped.
    pub fn relocations(&self) -> Vec<Relocation> {
        let n = self.stations.len();
        if n < 3 {
            return Vec::new();
        }
        let positions = self.station_positions();
        let mut moves = Vec::new();

        for (from, station) in self.stations.iter().enumerate().skip(1) {
            let Some(&(pickup_at, drop_at)) = positions.get(&station.passenger_id) else {
                continue;
            };
            let partner = if station.is_drop { pickup_at } else { drop_at };
            if partner == usize::MAX {
                continue;
            }
            // index of the partner once `from` is removed
            let partner = if partner > from { partner - 1 } else { partner };

            let targets = if station.is_drop { partner + 1..n } else { 1..partner + 1 };
            moves.extend(targets.filter(|&to| to != from).map(|to| Relocation { from, to }));
        }

        moves
    }

    /// Build the neighbor produced by a relocation
    pub fn relocate(&self, relocation: &Relocation) -> Solution {
        let mut stations = self.stations.clone();
        let station = stations.remove(relocation.from);
        stations.insert(relocation.to, station);
        Solution::from_stations(stations)
    }

    /// Every neighbor of this solution, in the order of [`Solution::relocations`]
    pub fn neighbors(&self) -> Vec<Solution> {
        self.relocations().iter().map(|r| self.relocate(r)).collect()
    }

    /// A uniformly random neighbor, `None` when no relocation exists
    pub fn random_neighbor(&self, rng: &mut dyn RngCore) -> Option<Solution> {
        let moves = self.relocations();
        if moves.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..moves.len());
        Some(self.relocate(&moves[idx]))
    }
}

impl PartialEq for Solution {
    fn eq(&self, other: &Self) -> bool {
        self.stations == other.stations
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Length: {:.2}", self.length)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        let route: Vec<String> = self
            .stations
            .iter()
            .map(|s| {
                if s.is_depot() {
                    "depot".to_string()
                } else if s.is_drop {
                    format!("-{}", s.passenger_id)
                } else {
                    format!("+{}", s.passenger_id)
                }
            })
            .collect();
        writeln!(f, "  Route: {}", route.join(" "))
    }
}

/// One accepted solution recorded by an improvement strategy
#[derive(Debug, Clone, Serialize)]
pub struct TraceStep {
    pub step: usize,
    pub length: f64,
    pub stations: Vec<Station>,
}

/// Intermediate solutions kept for display; a disabled trace records nothing
#[derive(Debug, Clone, Default)]
pub struct Trace {
    enabled: bool,
    steps: Vec<TraceStep>,
}

impl Trace {
    pub fn disabled() -> Self {
        Trace { enabled: false, steps: Vec::new() }
    }

    pub fn recording() -> Self {
        Trace { enabled: true, steps: Vec::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&mut self, solution: &Solution) {
        if !self.enabled {
            return;
        }
        self.steps.push(TraceStep {
            step: self.steps.len(),
            length: solution.length(),
            stations: solution.stations().to_vec(),
        });
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn lengths(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.length).collect()
    }

    /// Write `step,length` rows
    pub fn export_csv<W: std::io::Write>(&self, writer: W) -> SolverResult<()> {
        #[derive(Serialize)]
        struct Row {
            step: usize,
            length: f64,
        }

        let mut writer = csv::Writer::from_writer(writer);
        for step in &self.steps {
            writer.serialize(Row { step: step.step, length: step.length })?;
        }
        writer.flush()?;
        Ok(())
    }
}
