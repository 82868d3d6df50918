//! Heuristics module.
//!
//! This module exports the construction heuristics, the local improvement
//! family and the genetic algorithm.

pub mod construction;
pub mod local_search;
pub mod genetic;

pub use construction::*;
pub use local_search::*;
pub use genetic::*;
