//! # Ball Sort Solver Library
//!
//! This library provides the core puzzle logic for the ball sort puzzle (pour colored
//! balls between capacity-limited tubes until every tube holds a single color) and an A*
//! solver that finds short pour sequences.
//!
//! It is used by two binaries:
//! - `ai_solver`: Reads a problem-set file and prints a move list for every problem.
//! - `heuristic_evaluator`: Compares the heuristics on reproducible random puzzles.
//!
//! ## Modules
//! - `engine`: Contains the puzzle representation (`State`, `Tube`, `Color`), the goal
//!   rules, and the pour rules that generate moves.
//! - `heuristics`: Estimates of the remaining number of pours, based on color dispersion.
//! - `solver`: Provides the `solve` function and its configuration and outcome types.
//! - `utils`: Problem-file parsing, test helpers, and move-list formatting.
//! - `error`: Error types shared by the other modules.

pub mod engine;
pub mod error;
pub mod heuristics;
pub mod solver;
pub mod utils;

pub use engine::{GoalRule, Move, State};
pub use error::{LoadError, SolverError};
pub use heuristics::Heuristic;
pub use solver::{solve, SearchConfig, SearchOutcome};
