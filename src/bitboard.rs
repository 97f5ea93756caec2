use crate::error::{Result, SolverError};
use crate::{HEIGHT, WIDTH};

mod static_masks {
    use crate::{HEIGHT, WIDTH};

    pub const fn bottom_mask() -> u64 {
        let mut mask = 0;
        let mut column = 0;
        while column < WIDTH {
            mask |= 1 << (column * (HEIGHT + 1));
            column += 1;
        }
        mask
    }
    pub const fn full_board_mask() -> u64 {
        bottom_mask() * ((1 << HEIGHT as u64) - 1)
    }
}

/// A Connect 4 position stored as a pair of bitboards
///
/// Columns are laid out bottom-to-top, `HEIGHT + 1` bits each. The extra bit
/// above every column is never set, so adding a column's bottom bit to the
/// board mask lands exactly on its lowest free cell.
///
/// `BitBoard` is `Copy`: playing a move produces a new position and leaves
/// the original untouched.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitBoard {
    // mask of the tiles of the player about to move
    player_mask: u64,
    // mask of all tiles
    board_mask: u64,
    num_moves: usize,
}

impl BitBoard {
    /// Creates an empty board
    pub fn new() -> Self {
        Self {
            player_mask: 0,
            board_mask: 0,
            num_moves: 0,
        }
    }

    /// Creates a board by replaying a string of 1-based column digits
    ///
    /// Fails if the string contains anything other than column digits, plays
    /// into a full column, or continues after a move that wins the game.
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self> {
        let mut board = Self::new();
        match board.replay(moves.as_ref()) {
            (_, None) => Ok(board),
            (consumed, Some(reason)) => Err(SolverError::InvalidSequence { consumed, reason }),
        }
    }

    /// Plays a string of 1-based column digits onto this board
    ///
    /// Returns the number of moves applied. Replay stops before the first
    /// character that is not a column, a move into a full column, or a move
    /// that would win the game, so a result shorter than the input marks
    /// invalid input.
    pub fn play_sequence(&mut self, moves: &str) -> usize {
        self.replay(moves).0
    }

    fn replay(&mut self, moves: &str) -> (usize, Option<String>) {
        let mut consumed = 0;
        for column_char in moves.chars() {
            let column = match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => column - 1,
                _ => {
                    return (
                        consumed,
                        Some(format!("could not parse '{}' as a valid move", column_char)),
                    )
                }
            };
            if !self.can_play(column) {
                return (consumed, Some(format!("column {} full", column + 1)));
            }
            // abort if the position is won at any point
            if self.is_winning_move(column) {
                return (consumed, Some(String::from("game is over")));
            }
            self.play_column(column);
            consumed += 1;
        }
        (consumed, None)
    }

    pub fn player_mask(&self) -> u64 {
        self.player_mask
    }

    pub fn board_mask(&self) -> u64 {
        self.board_mask
    }

    pub fn top_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1) + (HEIGHT - 1))
    }

    pub fn bottom_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1))
    }

    pub fn column_mask(column: usize) -> u64 {
        ((1 << HEIGHT) - 1) << (column * (HEIGHT + 1))
    }

    pub fn num_moves(&self) -> usize {
        self.num_moves
    }

    /// Whether `column` exists and still has a free cell
    pub fn can_play(&self, column: usize) -> bool {
        column < WIDTH && Self::top_mask(column) & self.board_mask == 0
    }

    /// Returns the position after the current player drops a tile in `column`
    pub fn play(&self, column: usize) -> Result<Self> {
        if column >= WIDTH {
            return Err(SolverError::ColumnOutOfRange { column });
        } else if !self.can_play(column) {
            return Err(SolverError::IllegalMove { column });
        }
        let mut next = *self;
        next.play_column(column);
        Ok(next)
    }

    /// Returns the position after playing a single-bit move taken from
    /// [`possible_moves`] or [`possible_non_losing_moves`]
    ///
    /// [`possible_moves`]: #method.possible_moves
    /// [`possible_non_losing_moves`]: #method.possible_non_losing_moves
    pub fn play_move(&self, move_bitmap: u64) -> Self {
        debug_assert!(move_bitmap.count_ones() == 1 && move_bitmap & self.possible_moves() != 0);
        // the tiles that are not the mover's belong to the next player
        let board_mask = self.board_mask | move_bitmap;
        Self {
            player_mask: self.player_mask ^ self.board_mask,
            board_mask,
            num_moves: self.num_moves + 1,
        }
    }

    /// The lowest free cell of `column`, or 0 if the column is full
    pub fn move_bitmap(&self, column: usize) -> u64 {
        (self.board_mask + Self::bottom_mask(column)) & Self::column_mask(column)
    }

    fn play_column(&mut self, column: usize) {
        *self = self.play_move(self.move_bitmap(column));
    }

    /// Whether the current player can win on this turn
    pub fn can_win_next(&self) -> bool {
        self.winning_positions_mask() & self.possible_moves() != 0
    }

    /// Cells that can be played this turn, one per non-full column
    pub fn possible_moves(&self) -> u64 {
        (self.board_mask + static_masks::bottom_mask()) & static_masks::full_board_mask()
    }

    /// Playable cells that don't hand the opponent a win on their next turn
    ///
    /// Only meaningful when the current player cannot win immediately.
    /// Returns 0 if every move loses.
    pub fn possible_non_losing_moves(&self) -> u64 {
        let mut possible_moves = self.possible_moves();
        let opponent_winning_positions = self.opponent_winning_positions_mask();
        let forced_moves = possible_moves & opponent_winning_positions;

        if forced_moves != 0 {
            // if more than one forced move exists, you can't prevent the opponent winning
            if forced_moves & (forced_moves - 1) != 0 {
                return 0;
            } else {
                possible_moves = forced_moves
            }
        }
        // avoid playing below an opponent's winning move
        possible_moves & !(opponent_winning_positions >> 1)
    }

    /// Empty cells that would complete an alignment for the current player
    pub fn winning_positions_mask(&self) -> u64 {
        self.winning_positions(self.player_mask)
    }

    /// Empty cells that would complete an alignment for the opponent
    pub fn opponent_winning_positions_mask(&self) -> u64 {
        self.winning_positions(self.player_mask ^ self.board_mask)
    }

    fn winning_positions(&self, player_mask: u64) -> u64 {
        // vertical
        // find the top ends of 3-alignments
        let mut r = (player_mask << 1) & (player_mask << 2) & (player_mask << 3);

        // horizontal, then both diagonals
        for &shift in &[HEIGHT + 1, HEIGHT, HEIGHT + 2] {
            let mut p = (player_mask << shift) & (player_mask << (2 * shift));
            // find the right ends of 3-alignments
            r |= p & (player_mask << (3 * shift));
            // find holes of the type ...O O _ O...
            r |= p & (player_mask >> shift);

            p = (player_mask >> shift) & (player_mask >> (2 * shift));
            // find the left ends of 3-alignments
            r |= p & (player_mask >> (3 * shift));
            // find holes of the type ...O _ O O...
            r |= p & (player_mask << shift);
        }

        r & (static_masks::full_board_mask() ^ self.board_mask)
    }

    /// Number of winning cells the current player would have after `candidate`
    pub fn move_score(&self, candidate: u64) -> u32 {
        self.winning_positions(self.player_mask | candidate)
            .count_ones()
    }

    /// Whether dropping a tile in `column` wins the game for the current player
    ///
    /// `column` must be playable.
    pub fn is_winning_move(&self, column: usize) -> bool {
        // play the move on a copy of the player's tiles, keeping the current player
        Self::has_alignment(self.player_mask | self.move_bitmap(column))
    }

    fn has_alignment(pos: u64) -> bool {
        // horizontal, diagonal /, diagonal \, vertical
        for &shift in &[HEIGHT + 1, HEIGHT, HEIGHT + 2, 1] {
            // mark all runs of 2
            let m = pos & (pos >> shift);
            // check for runs of 2 * (runs of 2)
            if m & (m >> (2 * shift)) != 0 {
                return true;
            }
        }

        // no alignments
        false
    }

    /// Key for the transposition table
    ///
    /// A column holding `h` tiles contributes `2^h - 1 + p` with `p < 2^h`
    /// the player's tiles in it, so both the height and the tiles can be
    /// read back and no carry crosses into the next column. The key is
    /// unique per position and fits in `WIDTH * (HEIGHT + 1)` bits.
    pub fn key(&self) -> u64 {
        self.player_mask + self.board_mask
    }
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::new()
    }
}
