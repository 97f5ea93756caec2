//! Move ordering for the game tree search

use crate::{bitboard::BitBoard, WIDTH};

/// Returns the columns ordered from the middle outwards, as
/// the middle columns are often better moves
///
/// For a 7-wide board this is `[3, 2, 4, 1, 5, 0, 6]`.
pub const fn move_order() -> [usize; WIDTH] {
    let mut move_order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        move_order[i] = if i % 2 == 0 {
            WIDTH / 2 + i / 2
        } else {
            WIDTH / 2 - (i + 1) / 2
        };
        i += 1;
    }
    move_order
}

/// A one-shot iterator over candidate moves, best first
///
/// Moves are scored with [`BitBoard::move_score`]. Moves of equal score come
/// out in [`move_order`].
///
/// [`BitBoard::move_score`]: ../bitboard/struct.BitBoard.html#method.move_score
/// [`move_order`]: fn.move_order.html
pub struct MoveSorter {
    size: usize,
    // move bitmap, column and score, sorted by ascending score
    moves: [(u64, usize, u32); WIDTH],
}

impl MoveSorter {
    pub fn new() -> Self {
        Self {
            size: 0,
            moves: [(0, 0, 0); WIDTH],
        }
    }

    /// Sorts the moves of `candidates`, a mask holding at most one cell per
    /// column, by how many winning cells they open for the player to move
    pub fn rank(candidates: u64, board: &BitBoard) -> Self {
        let mut moves = Self::new();
        // reversing move order to put edges first reduces the amount of sorting
        // as these moves are worse on average
        for &column in move_order().iter().rev() {
            let candidate = candidates & BitBoard::column_mask(column);
            if candidate != 0 {
                moves.push(candidate, column, board.move_score(candidate));
            }
        }
        moves
    }

    pub fn push(&mut self, new_move: u64, column: usize, score: u32) {
        let mut pos = self.size;
        self.size += 1;
        while pos != 0 && self.moves[pos - 1].2 > score {
            self.moves[pos] = self.moves[pos - 1];
            pos -= 1;
        }
        self.moves[pos] = (new_move, column, score);
    }
}

impl Default for MoveSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for MoveSorter {
    type Item = (u64, usize);

    fn next(&mut self) -> Option<Self::Item> {
        match self.size {
            0 => None,
            _ => {
                self.size -= 1;
                Some((self.moves[self.size].0, self.moves[self.size].1))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.size, Some(self.size))
    }
}

impl ExactSizeIterator for MoveSorter {}
