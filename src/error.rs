//! Error types for the ball sort solver.
//!
//! Expected search outcomes (no solution, budget exhausted) are not errors; they are
//! variants of [`crate::solver::SearchOutcome`]. The types here cover malformed input and
//! engine defects.

use crate::engine::{Move, State};
use thiserror::Error;

/// Main error type for engine and search operations.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A state is structurally malformed (capacity overflow, bad color, no tubes).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A pour was requested that the rules do not allow.
    #[error("Illegal move {from}->{to}: {reason}")]
    IllegalMove {
        from: usize,
        to: usize,
        reason: &'static str,
    },

    /// A successor broke ball conservation or tube capacity. Indicates an engine defect.
    #[error("Internal invariant violated by move {mv}: {detail}\n{state}")]
    InvariantViolation {
        detail: String,
        state: Box<State>,
        mv: Move,
    },
}

/// Errors raised while reading a problem-set file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Problem {number} is invalid: {source}")]
    Problem {
        number: usize,
        #[source]
        source: SolverError,
    },
}

/// Result type alias for engine and search operations.
pub type Result<T> = std::result::Result<T, SolverError>;
