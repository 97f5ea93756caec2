//! A perfect solver for the board game 'Connect 4'
//!
//! This solver uses an optimised game tree search to find the
//! mathematically exact score of any position.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_solver::{bitboard::BitBoard, solver::Solver};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let board = BitBoard::from_moves("112233")?;
//! let mut solver = Solver::new();
//!
//! // the first player completes the bottom row with their 4th tile
//! assert_eq!(solver.solve(&board, false), 18);
//! assert_eq!(solver.solve(&board, true), 1);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;

pub mod error;

pub mod transposition_table;

pub mod bitboard;

pub mod move_sorter;

pub mod solver;


pub use error::{Result, SolverError};

/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

// ensure that the given dimensions fit in a u64 for the bitboard representation
const_assert!(WIDTH * (HEIGHT + 1) < 64);
// move digits are parsed one character per column
const_assert!(WIDTH <= 9);
