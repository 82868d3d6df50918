//! Solver configuration loaded from JSON.
//!
//! Every field has a default, so a configuration file only needs the values it
//! overrides:
//!
//! ```json
//! { "seed": 7, "annealing": { "cooling_rate": 0.99 }, "genetic": { "crossover": "sequence_preserving" } }
//! ```

use crate::error::SolverResult;
use crate::exact::ExactConfig;
use crate::heuristics::genetic::GAConfig;
use crate::heuristics::local_search::{AnnealingConfig, BeamConfig, MultiRestartConfig};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Construction used to seed the improvement strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum InitialKind {
    #[default]
    Greedy,
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Seed of the run-wide random source
    pub seed: u64,
    pub initial: InitialKind,
    pub annealing: AnnealingConfig,
    pub beam: BeamConfig,
    pub multi_restart: MultiRestartConfig,
    pub genetic: GAConfig,
    pub exact: ExactConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            seed: 5,
            initial: InitialKind::default(),
            annealing: AnnealingConfig::default(),
            beam: BeamConfig::default(),
            multi_restart: MultiRestartConfig::default(),
            genetic: GAConfig::default(),
            exact: ExactConfig::default(),
        }
    }
}

impl SolverConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> SolverResult<Self> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }
}
