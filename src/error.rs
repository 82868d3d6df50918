//! Error types shared by the solver library.

use std::fmt;

/// The invariant a solution broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidSolution {
    /// The first station is not the depot (or the solution is empty).
    MissingDepot,
    /// A passenger is picked up a second time.
    DuplicatePickup { passenger_id: usize, index: usize },
    /// A passenger is dropped before being picked up.
    DropWithoutPickup { passenger_id: usize, index: usize },
    /// A passenger is dropped a second time.
    DuplicateDrop { passenger_id: usize, index: usize },
    /// A passenger is picked up and never dropped.
    UndeliveredPassenger { passenger_id: usize },
    /// A passenger of the instance never appears in the solution.
    MissingPassenger { passenger_id: usize },
    /// The solution serves a passenger the instance does not have.
    UnknownPassenger { passenger_id: usize },
}

impl fmt::Display for InvalidSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidSolution::MissingDepot => write!(f, "solution does not start at the depot"),
            InvalidSolution::DuplicatePickup { passenger_id, index } => {
                write!(f, "passenger {} picked up twice (station {})", passenger_id, index)
            }
            InvalidSolution::DropWithoutPickup { passenger_id, index } => {
                write!(f, "passenger {} dropped before pickup (station {})", passenger_id, index)
            }
            InvalidSolution::DuplicateDrop { passenger_id, index } => {
                write!(f, "passenger {} dropped twice (station {})", passenger_id, index)
            }
            InvalidSolution::UndeliveredPassenger { passenger_id } => {
                write!(f, "passenger {} is never dropped", passenger_id)
            }
            InvalidSolution::MissingPassenger { passenger_id } => {
                write!(f, "passenger {} is not served", passenger_id)
            }
            InvalidSolution::UnknownPassenger { passenger_id } => {
                write!(f, "passenger {} is not part of the instance", passenger_id)
            }
        }
    }
}

impl std::error::Error for InvalidSolution {}

/// Errors raised while loading instances, running solvers or writing results.
#[derive(Debug)]
pub enum SolverError {
    InvalidInstance(String),
    InvalidSolution(InvalidSolution),
    InstanceTooLarge { passengers: usize, limit: usize },
    Parse { line: usize, message: String },
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::InvalidInstance(msg) => write!(f, "invalid instance: {}", msg),
            SolverError::InvalidSolution(err) => write!(f, "invalid solution: {}", err),
            SolverError::InstanceTooLarge { passengers, limit } => write!(
                f,
                "instance has {} passengers, exhaustive enumeration is limited to {}",
                passengers, limit
            ),
            SolverError::Parse { line, message } => write!(f, "parse error at line {}: {}", line, message),
            SolverError::Io(err) => write!(f, "I/O error: {}", err),
            SolverError::Json(err) => write!(f, "JSON error: {}", err),
            SolverError::Csv(err) => write!(f, "CSV error: {}", err),
        }
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolverError::InvalidSolution(err) => Some(err),
            SolverError::Io(err) => Some(err),
            SolverError::Json(err) => Some(err),
            SolverError::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidSolution> for SolverError {
    fn from(err: InvalidSolution) -> Self {
        SolverError::InvalidSolution(err)
    }
}

impl From<std::io::Error> for SolverError {
    fn from(err: std::io::Error) -> Self {
        SolverError::Io(err)
    }
}

impl From<serde_json::Error> for SolverError {
    fn from(err: serde_json::Error) -> Self {
        SolverError::Json(err)
    }
}

impl From<csv::Error> for SolverError {
    fn from(err: csv::Error) -> Self {
        SolverError::Csv(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_invariant() {
        let err = SolverError::from(InvalidSolution::DuplicateDrop { passenger_id: 3, index: 7 });
        assert_eq!(err.to_string(), "invalid solution: passenger 3 dropped twice (station 7)");
    }
}
