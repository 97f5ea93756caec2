//! An agent to solve the game of Connect 4

use log::{debug, info, trace};
use rayon::prelude::*;

use std::cmp::Ordering;

use crate::error::Result;
use crate::{bitboard::BitBoard, move_sorter::*, transposition_table::*, HEIGHT, WIDTH};

/// The minimum possible score of a position
pub const MIN_SCORE: i32 = -((WIDTH * HEIGHT) as i32) / 2 + 3;
/// The maximum possible score of a postion
pub const MAX_SCORE: i32 = ((WIDTH * HEIGHT) as i32 + 1) / 2 - 3;

const NUM_CELLS: i32 = (WIDTH * HEIGHT) as i32;

/// Score of a position where the current player wins on this turn
fn immediate_win_score(board: &BitBoard, weak: bool) -> i32 {
    if weak {
        1
    } else {
        (NUM_CELLS + 1 - board.num_moves() as i32) / 2
    }
}

/// An agent to solve Connect 4 positions
///
/// # Notes
/// This agent uses a classical game tree search with various optimisations to
/// find the mathematically best move(s) in any position, thus 'solving' the game.
/// Each `Solver` owns its transposition table, so independent solvers can run
/// on separate threads without sharing anything.
///
/// # Position Scoring
/// A position is scored from the point of view of the player about to move.
/// If that player wins with their final placed tile (their 21st tile in a 7x6 board)
/// the score is 1, or -1 if the opponent wins with their final tile. Earlier wins
/// have scores further from 0, up to 18/-18, where a player wins with their 4th tile. A drawn position
/// has a score of 0
#[derive(Clone)]
pub struct Solver {
    node_count: usize,
    transposition_table: TranspositionTable,
}

impl Solver {
    /// Creates a new `Solver` with a default-sized transposition table
    pub fn new() -> Self {
        Self::with_transposition_table(TranspositionTable::new())
    }

    /// Creates a new `Solver` with a given transposition table
    pub fn with_transposition_table(transposition_table: TranspositionTable) -> Self {
        Self {
            node_count: 0,
            transposition_table,
        }
    }

    /// The number of nodes searched since this `Solver` was created or last
    /// reset (for diagnostics only)
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Clears the transposition table and the node counter
    pub fn reset(&mut self) {
        trace!(
            "Resetting transposition table ({} entries)",
            self.transposition_table.capacity()
        );
        self.transposition_table.reset();
        self.node_count = 0;
    }

    /// Performs game tree search within the window `alpha..beta`
    ///
    /// Returns the exact score of the position if it lies inside the window,
    /// an upper bound of it if the result is `<= alpha`, or a lower bound of
    /// it if the result is `>= beta` (see [Position Scoring])
    ///
    /// [Position Scoring]: #position-scoring
    fn negamax(&mut self, board: &BitBoard, mut alpha: i32, mut beta: i32) -> i32 {
        debug_assert!(alpha < beta);
        self.node_count += 1;

        let num_moves = board.num_moves() as i32;

        // check for next-move win for current player
        if board.can_win_next() {
            return (NUM_CELLS + 1 - num_moves) / 2;
        }

        // look for moves that don't give the opponent a next turn win
        let non_losing_moves = board.possible_non_losing_moves();
        if non_losing_moves == 0 {
            return -(NUM_CELLS - num_moves) / 2;
        }

        // check for draw, neither player can win with the last two tiles
        if num_moves >= NUM_CELLS - 2 {
            return 0;
        }

        // lower bound of score, as the opponent cannot win on their next move
        let min = -(NUM_CELLS - 2 - num_moves) / 2;
        if alpha < min {
            alpha = min;
            if alpha >= beta {
                return alpha;
            }
        }

        // upper bound of score, as we cannot win on this move
        let max = (NUM_CELLS - 1 - num_moves) / 2;
        if beta > max {
            // clamp beta to calculated upper bound
            beta = max;
            // if the upper bound is lower than alpha, we can prune the exploration
            if alpha >= beta {
                return beta;
            }
        }

        // try to fetch the upper/lower bound of the score from the transposition table
        let key = board.key();
        match self.transposition_table.get(key).and_then(Bound::unpack) {
            Some(Bound::Lower(min)) => {
                if alpha < min {
                    alpha = min;
                    if alpha >= beta {
                        // prune the exploration
                        return alpha;
                    }
                }
            }
            Some(Bound::Upper(max)) => {
                if beta > max {
                    beta = max;
                    if alpha >= beta {
                        // prune the exploration
                        return beta;
                    }
                }
            }
            None => {}
        }

        // search the next level of the tree
        for (move_bitmap, _column) in MoveSorter::rank(non_losing_moves, board) {
            let next = board.play_move(move_bitmap);
            // the search window is flipped for the other player
            let score = -self.negamax(&next, -beta, -alpha);
            // if a child node's score is better than beta, we can prune the tree
            // here because a perfect opponent will not pick this branch
            if score >= beta {
                // save a lower bound of the score
                self.transposition_table
                    .put(key, Bound::Lower(score).pack());
                return score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        // no move reached beta, save an upper bound of the score
        self.transposition_table.put(key, Bound::Upper(alpha).pack());
        alpha
    }

    /// Calculates the score of a position by iteratively narrowing a null-window search
    ///
    /// With `weak` set only the outcome is computed: the result is 1 for a
    /// win, 0 for a draw and -1 for a loss.
    pub fn solve(&mut self, board: &BitBoard, weak: bool) -> i32 {
        // the search assumes the current player can't win immediately
        if board.can_win_next() {
            return immediate_win_score(board, weak);
        }

        let num_moves = board.num_moves() as i32;
        let (mut min, mut max) = if weak {
            (-1, 1)
        } else {
            (-(NUM_CELLS - num_moves) / 2, (NUM_CELLS + 1 - num_moves) / 2)
        };

        // iteratively narrow the search window
        while min < max {
            let mut mid = min + (max - min) / 2;
            // tweak the search value for both negative and positive searches
            if mid <= 0 && min / 2 < mid {
                mid = min / 2
            } else if mid >= 0 && max / 2 > mid {
                mid = max / 2
            }

            // use a null-window to determine if the actual score is greater or less that mid
            let r = self.negamax(board, mid, mid + 1);
            debug!(
                "Probe at {} returned {}, window {}..={}, {} nodes searched",
                mid, r, min, max, self.node_count
            );

            // r is not necessarily the exact true score, but its value indicates
            // whether the true score is above or below the search target
            if r <= mid {
                // actual score <= r
                max = r
            } else {
                // actual score >= r
                min = r;
            }
        }

        // a weak search may step past its -1..=1 window, only the sign is exact
        if weak {
            min.signum()
        } else {
            // min and max should be equal here
            min
        }
    }

    /// Scores every column of the position for the player about to move
    ///
    /// Full columns are `None`. The best score of the result equals
    /// [`solve`](#method.solve) of the position.
    pub fn analyze(&mut self, board: &BitBoard, weak: bool) -> [Option<i32>; WIDTH] {
        let mut scores = [None; WIDTH];
        for (column, score) in scores.iter_mut().enumerate() {
            if !board.can_play(column) {
                continue;
            }
            *score = Some(if board.is_winning_move(column) {
                immediate_win_score(board, weak)
            } else {
                -self.solve(&board.play_move(board.move_bitmap(column)), weak)
            });
        }
        scores
    }

    /// Finds the best column to play, preferring central columns among equals
    ///
    /// Returns `None` if the board is full.
    pub fn best_move(&mut self, board: &BitBoard) -> Option<usize> {
        let scores = self.analyze(board, false);
        let mut best: Option<(usize, i32)> = None;
        for &column in move_order().iter() {
            if let Some(score) = scores[column] {
                match best {
                    Some((_, best_score)) if best_score >= score => {}
                    _ => best = Some((column, score)),
                }
            }
        }
        best.map(|(column, _)| column)
    }

    /// Converts a position score to the number of tiles the winning player
    /// still has to place, or the number of empty cells for a draw
    pub fn score_to_win_distance(board: &BitBoard, score: i32) -> usize {
        let num_moves = board.num_moves();
        match score.cmp(&0) {
            Ordering::Equal => WIDTH * HEIGHT - num_moves,
            // the current player has placed num_moves / 2 tiles
            Ordering::Greater => (WIDTH * HEIGHT / 2 + 1 - score as usize) - num_moves / 2,
            // the opponent has placed (num_moves + 1) / 2 tiles
            Ordering::Less => {
                (WIDTH * HEIGHT / 2 + 1) - (-score as usize) - (num_moves + 1) / 2
            }
        }
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

/// Scores every column of the position like [`Solver::analyze`], solving the
/// columns in parallel
///
/// Every column gets its own `Solver` with a table of `2^log_size` entries,
/// so memory use grows with the number of columns searched at once.
///
/// [`Solver::analyze`]: struct.Solver.html#method.analyze
pub fn analyze_parallel(
    board: &BitBoard,
    weak: bool,
    log_size: u32,
) -> Result<[Option<i32>; WIDTH]> {
    let board = *board;
    let results = (0..WIDTH)
        .into_par_iter()
        .map(|column| -> Result<(Option<i32>, usize)> {
            if !board.can_play(column) {
                return Ok((None, 0));
            }
            if board.is_winning_move(column) {
                return Ok((Some(immediate_win_score(&board, weak)), 0));
            }
            let mut solver =
                Solver::with_transposition_table(TranspositionTable::with_log_size(log_size)?);
            let score = -solver.solve(&board.play_move(board.move_bitmap(column)), weak);
            Ok((Some(score), solver.node_count()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut scores = [None; WIDTH];
    let mut node_count = 0;
    for (column, (score, nodes)) in results.into_iter().enumerate() {
        scores[column] = score;
        node_count += nodes;
    }
    info!(
        "Parallel analysis after {} moves searched {} nodes",
        board.num_moves(),
        node_count
    );
    Ok(scores)
}
