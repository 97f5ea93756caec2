//! A fixed-size, lossy cache of score bounds found by the search

use static_assertions::const_assert;

use crate::error::{Result, SolverError};
use crate::solver::{MAX_SCORE, MIN_SCORE};
use crate::{HEIGHT, WIDTH};

/// Smallest supported table size, as a power of two
pub const MIN_LOG_SIZE: u32 = 17;
/// Largest supported table size, as a power of two
pub const MAX_LOG_SIZE: u32 = 28;
/// Table size used by [`TranspositionTable::new`], 8388617 entries
///
/// [`TranspositionTable::new`]: struct.TranspositionTable.html#method.new
pub const DEFAULT_LOG_SIZE: u32 = 23;

// Entries keep the low 32 bits of a key and the index keeps the key modulo an
// odd prime, which together recover the full key only if the table is large
// enough to cover the remaining high bits.
const_assert!((next_prime(1 << MIN_LOG_SIZE) as u64) << 32 >= 1 << (WIDTH * (HEIGHT + 1)));

const fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    let mut divisor = 2;
    while divisor * divisor <= n {
        if n % divisor == 0 {
            return false;
        }
        divisor += 1;
    }
    true
}

/// Returns the smallest prime greater than or equal to `n`
pub const fn next_prime(n: usize) -> usize {
    let mut candidate = n;
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

/// A one-sided bound on the score of a position
///
/// Null-window searches only prove that a score is at least or at most some
/// value, so this is all the table ever stores.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bound {
    /// The score is at least this value
    Lower(i32),
    /// The score is at most this value
    Upper(i32),
}

impl Bound {
    /// Packs the bound into a non-zero byte
    ///
    /// Scores are clamped to `MIN_SCORE..=MAX_SCORE` first. Every reachable
    /// score lies in that range, so clamping can only loosen a bound.
    pub fn pack(self) -> u8 {
        match self {
            Bound::Lower(score) => {
                (score.clamp(MIN_SCORE, MAX_SCORE) + MAX_SCORE - 2 * MIN_SCORE + 2) as u8
            }
            // offset of one to prevent putting a 0, which represents an empty entry
            Bound::Upper(score) => (score.clamp(MIN_SCORE, MAX_SCORE) - MIN_SCORE + 1) as u8,
        }
    }

    /// Reverses [`pack`](#method.pack), mapping the empty value 0 to `None`
    pub fn unpack(value: u8) -> Option<Self> {
        let value = value as i32;
        if value == 0 {
            None
        } else if value > MAX_SCORE - MIN_SCORE + 1 {
            Some(Bound::Lower(value + 2 * MIN_SCORE - MAX_SCORE - 2))
        } else {
            Some(Bound::Upper(value + MIN_SCORE - 1))
        }
    }
}

#[derive(Copy, Clone, Default)]
struct Entry {
    key: u32,
    value: u8,
}

/// Maps position keys to packed values, one entry per slot
///
/// Storing to an occupied slot evicts the previous entry. A lookup only
/// succeeds for the exact key that was stored, so evictions cost search time
/// but never change a result.
#[derive(Clone)]
pub struct TranspositionTable {
    entries: Vec<Entry>,
}

impl TranspositionTable {
    /// Creates a table of the default size
    pub fn new() -> Self {
        Self {
            entries: vec![Entry::default(); next_prime(1 << DEFAULT_LOG_SIZE)],
        }
    }

    /// Creates a table with the first prime number of slots at or above
    /// `2^log_size`
    pub fn with_log_size(log_size: u32) -> Result<Self> {
        if !(MIN_LOG_SIZE..=MAX_LOG_SIZE).contains(&log_size) {
            return Err(SolverError::InvalidTableSize { log_size });
        }
        Ok(Self {
            entries: vec![Entry::default(); next_prime(1 << log_size)],
        })
    }

    /// The number of slots
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Stores `value` for `key`, overwriting whatever shared its slot
    ///
    /// Storing 0 erases the key.
    pub fn put(&mut self, key: u64, value: u8) {
        let len = self.entries.len();
        self.entries[(key % len as u64) as usize] = Entry {
            key: key as u32,
            value,
        };
    }

    /// Returns the value stored for `key`, if it is still present
    pub fn get(&self, key: u64) -> Option<u8> {
        let entry = self.entries[(key % self.entries.len() as u64) as usize];
        if entry.key == key as u32 && entry.value != 0 {
            Some(entry.value)
        } else {
            None
        }
    }

    /// Empties every slot
    pub fn reset(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = Entry::default();
        }
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}
