//! Taxi Route Solver Library
//!
//! Plans the route of a single taxi that starts at a depot and must pick up and
//! drop off every passenger of a static instance, each pickup before its drop,
//! while minimising the travelled Euclidean distance.
//!
//! # Features
//!
//! - Random and greedy construction heuristics
//! - Local search methods (random descent, hill climbing, simulated annealing,
//!   beam search, multi-restart)
//! - Genetic algorithm with pluggable precedence-preserving crossovers
//! - Exact solvers (brute force enumeration, branch and bound)
//!
//! # Example
//!
//! ```no_run
//! use taxi_route_solver::instance::TaxiInstance;
//! use taxi_route_solver::heuristics::construction::{ConstructionHeuristic, GreedyConstruction};
//! use taxi_route_solver::heuristics::local_search::{LocalSearch, SimulatedAnnealing};
//! use taxi_route_solver::solution::Trace;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(5);
//!
//! // Load instance
//! let instance = TaxiInstance::from_file("instance.json").unwrap();
//!
//! // Construct initial solution
//! let initial = GreedyConstruction::new().construct(&instance, &mut rng);
//!
//! // Improve with simulated annealing
//! let sa = SimulatedAnnealing::new();
//! let solution = sa.improve(&initial, &mut rng, &mut Trace::disabled());
//!
//! println!("Route length: {:.2}", solution.length());
//! ```

pub mod config;
pub mod error;
pub mod exact;
pub mod heuristics;
pub mod instance;
pub mod runner;
pub mod solution;

pub use config::SolverConfig;
pub use error::{SolverError, SolverResult};
pub use instance::TaxiInstance;
pub use runner::{solve, Algorithm, SolveOutcome};
pub use solution::Solution;
