//! Module for parsing and representing taxi routing instances.
//!
//! An instance is a depot coordinate and a list of passengers, each with a pickup
//! and a drop coordinate. Instances are read either from JSON or from a small
//! keyword-based text format:
//!
//! ```text
//! NAME: demo
//! DEPOT: 0 0
//! PASSENGER_SECTION
//! 1 0 0 10 0
//! 2 10 0 0 0
//! EOF
//! ```

use crate::error::{InvalidSolution, SolverError, SolverResult};
use crate::solution::Solution;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Upper bound (inclusive) of the coordinates produced by [`TaxiInstance::random`].
pub const MAP_SIZE: i32 = 1000;

/// A coordinate in the plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Euclidean distance between two points
#[inline]
pub fn euclidean_distance(a: Point, b: Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// A passenger to serve: picked up at `start`, dropped at `end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passenger {
    /// Unique identifier, at least 1 (0 is reserved for the depot)
    pub id: usize,
    /// Pickup coordinate
    pub start: Point,
    /// Drop coordinate
    pub end: Point,
}

impl Passenger {
    pub fn new(id: usize, start: Point, end: Point) -> Self {
        Passenger { id, start, end }
    }

    /// Length of the direct ride
    pub fn trip_length(&self) -> f64 {
        euclidean_distance(self.start, self.end)
    }
}

impl std::fmt::Display for Passenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "passenger {}: start {}, end {}", self.id, self.start, self.end)
    }
}

/// A complete, static routing problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxiInstance {
    /// Name of the instance
    #[serde(default)]
    pub name: String,
    /// Starting position of the taxi (the depot)
    pub start: Point,
    /// Passengers to serve
    pub passengers: Vec<Passenger>,
}

impl TaxiInstance {
    /// Build an instance, rejecting reserved or duplicate passenger ids
    pub fn new(name: &str, start: Point, passengers: Vec<Passenger>) -> SolverResult<Self> {
        let instance = TaxiInstance {
            name: name.to_string(),
            start,
            passengers,
        };
        instance.check_ids()?;
        Ok(instance)
    }

    fn check_ids(&self) -> SolverResult<()> {
        let mut seen = HashSet::with_capacity(self.passengers.len());
        for passenger in &self.passengers {
            if passenger.id == 0 {
                return Err(SolverError::InvalidInstance(
                    "passenger id 0 is reserved for the depot".to_string(),
                ));
            }
            if !seen.insert(passenger.id) {
                return Err(SolverError::InvalidInstance(format!(
                    "duplicate passenger id {}",
                    passenger.id
                )));
            }
        }
        Ok(())
    }

    /// Generate `num_passengers` passengers with integer coordinates in `[0, MAP_SIZE]`.
    /// The depot is the origin.
    pub fn random(num_passengers: usize, rng: &mut dyn RngCore) -> Self {
        let passengers = (1..=num_passengers)
            .map(|id| {
                let start = Point::new(
                    rng.gen_range(0..=MAP_SIZE) as f64,
                    rng.gen_range(0..=MAP_SIZE) as f64,
                );
                let end = Point::new(
                    rng.gen_range(0..=MAP_SIZE) as f64,
                    rng.gen_range(0..=MAP_SIZE) as f64,
                );
                Passenger::new(id, start, end)
            })
            .collect();

        TaxiInstance {
            name: format!("random-{}", num_passengers),
            start: Point::default(),
            passengers,
        }
    }

    /// Load an instance from a `.json` file or from the keyword text format
    pub fn from_file<P: AsRef<Path>>(path: P) -> SolverResult<Self> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let instance: TaxiInstance = if is_json {
            serde_json::from_reader(reader)?
        } else {
            let mut instance = Self::parse_text(reader)?;
            if instance.name.is_empty() {
                instance.name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
            }
            instance
        };

        instance.check_ids()?;
        Ok(instance)
    }

    /// Write the instance as pretty JSON
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> SolverResult<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    fn parse_text<R: BufRead>(reader: R) -> SolverResult<Self> {
        let mut name = String::new();
        let mut start: Option<Point> = None;
        let mut passengers = Vec::new();
        let mut in_passengers = false;

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line?;
            let line = match line.split_once('#') {
                Some((content, _)) => content,
                None => line.as_str(),
            };
            let line = line.trim();

            if line.is_empty() {
                continue;
            }
            if line == "EOF" {
                break;
            }

            if let Some(rest) = line.strip_prefix("NAME:") {
                name = rest.trim().to_string();
                continue;
            }
            if line.starts_with("COMMENT:") {
                continue;
            }
            if let Some(rest) = line.strip_prefix("DEPOT:") {
                let values = parse_numbers(rest, line_no)?;
                if values.len() != 2 {
                    return Err(SolverError::Parse {
                        line: line_no,
                        message: "DEPOT expects two coordinates".to_string(),
                    });
                }
                start = Some(Point::new(values[0], values[1]));
                continue;
            }
            if line.starts_with("PASSENGER_SECTION") {
                in_passengers = true;
                continue;
            }

            if !in_passengers {
                return Err(SolverError::Parse {
                    line: line_no,
                    message: format!("unexpected line '{}'", line),
                });
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 5 {
                return Err(SolverError::Parse {
                    line: line_no,
                    message: "passenger lines are 'id start_x start_y end_x end_y'".to_string(),
                });
            }
            let id: usize = parts[0].parse().map_err(|_| SolverError::Parse {
                line: line_no,
                message: format!("invalid passenger id '{}'", parts[0]),
            })?;
            let coords = parse_numbers(&parts[1..].join(" "), line_no)?;
            passengers.push(Passenger::new(
                id,
                Point::new(coords[0], coords[1]),
                Point::new(coords[2], coords[3]),
            ));
        }

        let start = start.ok_or(SolverError::Parse {
            line: 0,
            message: "missing DEPOT line".to_string(),
        })?;

        Ok(TaxiInstance { name, start, passengers })
    }

    /// Number of passengers
    pub fn num_passengers(&self) -> usize {
        self.passengers.len()
    }

    /// Look up a passenger by id
    pub fn passenger(&self, id: usize) -> Option<&Passenger> {
        self.passengers.iter().find(|p| p.id == id)
    }

    /// Validate a solution and verify it serves exactly the passengers of this instance
    pub fn check_solution(&self, solution: &Solution) -> Result<(), InvalidSolution> {
        solution.validate()?;

        let served: HashSet<usize> = solution
            .stations()
            .iter()
            .skip(1)
            .map(|s| s.passenger_id)
            .collect();

        if let Some(missing) = self.passengers.iter().find(|p| !served.contains(&p.id)) {
            return Err(InvalidSolution::MissingPassenger { passenger_id: missing.id });
        }

        let known: HashSet<usize> = self.passengers.iter().map(|p| p.id).collect();
        match served.iter().copied().filter(|id| !known.contains(id)).min() {
            Some(passenger_id) => Err(InvalidSolution::UnknownPassenger { passenger_id }),
            None => Ok(()),
        }
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let trips: Vec<f64> = self.passengers.iter().map(|p| p.trip_length()).collect();
        let total_trip_length: f64 = trips.iter().sum();
        let avg_trip_length = if trips.is_empty() {
            0.0
        } else {
            total_trip_length / trips.len() as f64
        };

        let (mut min_x, mut min_y) = (self.start.x, self.start.y);
        let (mut max_x, mut max_y) = (self.start.x, self.start.y);
        for p in self.passengers.iter().flat_map(|p| [p.start, p.end]) {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        InstanceStatistics {
            name: self.name.clone(),
            num_passengers: self.passengers.len(),
            depot: self.start,
            total_trip_length,
            avg_trip_length,
            bounding_box: (Point::new(min_x, min_y), Point::new(max_x, max_y)),
        }
    }
}

fn parse_numbers(text: &str, line_no: usize) -> SolverResult<Vec<f64>> {
    text.split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| SolverError::Parse {
                line: line_no,
                message: format!("invalid number '{}'", token),
            })
        })
        .collect()
}

/// Statistics about an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub num_passengers: usize,
    pub depot: Point,
    pub total_trip_length: f64,
    pub avg_trip_length: f64,
    pub bounding_box: (Point, Point),
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Passengers: {} ({} stations)", self.num_passengers, 2 * self.num_passengers)?;
        writeln!(f, "  Depot: {}", self.depot)?;
        writeln!(f, "  Total direct trip length: {:.2}", self.total_trip_length)?;
        writeln!(f, "  Avg direct trip length: {:.2}", self.avg_trip_length)?;
        writeln!(f, "  Bounding box: {} - {}", self.bounding_box.0, self.bounding_box.1)
    }
}
