use crate::WIDTH;

/// Errors raised when a position is built from invalid input
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// The column has no free cell left
    #[error("Invalid move, column {} full", .column + 1)]
    IllegalMove { column: usize },

    /// The column does not exist on the board
    #[error("Invalid move, column index {column} out of range. Indices must be below {}", WIDTH)]
    ColumnOutOfRange { column: usize },

    /// A move string could only be replayed partially
    #[error("Invalid move sequence after {consumed} moves: {reason}")]
    InvalidSequence { consumed: usize, reason: String },

    #[error("Transposition table log size {log_size} is outside the supported range 17..=28")]
    InvalidTableSize { log_size: u32 },
}

pub type Result<T> = std::result::Result<T, SolverError>;
