//! Exact solvers module.
//!
//! Both solvers explore pickup/drop orders exhaustively and are meant for small
//! instances only.

pub mod branch_and_bound;
pub mod brute_force;

pub use branch_and_bound::*;
pub use brute_force::*;

use crate::solution::Solution;
use serde::{Deserialize, Serialize};

/// Exact solver parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExactConfig {
    /// Largest instance accepted by brute force enumeration
    pub max_passengers: usize,
    /// Slack added to an incumbent length so an equally long route is not rejected
    pub epsilon: f64,
}

impl Default for ExactConfig {
    fn default() -> Self {
        ExactConfig {
            max_passengers: 6,
            epsilon: 1e-7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExactResult {
    pub solution: Solution,
    /// Search nodes visited (complete orders for brute force)
    pub nodes_explored: u64,
    /// Whether the search found something shorter than the incumbent it started from
    pub improved_incumbent: bool,
}
