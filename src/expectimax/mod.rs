//! Expectimax placement policy (single-threaded and parallel).
//!
//! This module provides two policy implementations:
//! - [`Expectimax`]: single-threaded depth-first search.
//! - [`ExpectimaxParallel`]: rayon fan-out over the root candidate cells.
//!
//! Both variants share the same public surface and decision rule: a root
//! MAX ply over the empty cells of the grid, CHANCE plies averaging over
//! the identity of the next drawn card, and direct oracle scoring at the
//! depth limit. Ties resolve to the earliest cell in row-major order, and
//! pruning or parallelism never changes which cell is returned.
//!
//! Notes
//! - Each call is independent: the search owns clones of the grid and
//!   deck it is given and retains nothing across turns except diagnostic
//!   counters.
//! - The search is deterministic; randomness only enters a game through
//!   the driver's shuffled deal.
//!
//! Quick start
//! ```
//! use ai_squares::cards::{Card, Rank, Suit};
//! use ai_squares::engine::{Deck, Grid};
//! use ai_squares::expectimax::Expectimax;
//! use ai_squares::scoring::PointSystem;
//! use std::time::Duration;
//!
//! let grid = Grid::new();
//! let mut deck = Deck::full();
//! let card = Card::new(Rank::Ace, Suit::Clubs);
//! deck.draw(card).unwrap();
//!
//! let mut ex = Expectimax::new(PointSystem::british());
//! let (row, col) = ex
//!     .choose_cell(card, &grid, &deck, 2, Duration::from_secs(1))
//!     .unwrap();
//! assert!(grid.is_empty(row, col));
//! ```

use std::time::Duration;

mod search_par;
mod search_seq;

pub use search_par::ExpectimaxParallel;
pub use search_seq::Expectimax;

/// Default knobs used when the engine is driven through the
/// [`Strategy`](crate::game::Strategy) trait. Direct [`Expectimax::choose_cell`]
/// calls always take the depth limit and time budget explicitly.
#[derive(Debug, Clone)]
pub struct ExpectimaxConfig {
    /// Ply alternations explored before falling back to direct scoring.
    pub depth_limit: usize,
    /// Per-move cap on search time; advisory, checked only between fully
    /// evaluated root candidates.
    pub time_budget: Duration,
    /// Thresholds used by the parallel implementation.
    pub par_thresholds: ParThresholds,
}

impl Default for ExpectimaxConfig {
    fn default() -> Self {
        Self {
            depth_limit: 2,
            time_budget: Duration::from_secs(30),
            par_thresholds: ParThresholds::default(),
        }
    }
}

/// Thresholds used to balance parallel overheads.
#[derive(Debug, Clone, Copy)]
pub struct ParThresholds {
    /// Fewer root candidates than this and the parallel variant runs the
    /// sequential loop instead.
    pub min_candidates: usize,
}

impl Default for ParThresholds {
    fn default() -> Self {
        Self { min_candidates: 4 }
    }
}

/// The outcome of evaluating one candidate placement.
///
/// MAX nodes fold children with strict-improvement comparison; CHANCE
/// nodes average the per-card best values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChoiceResult {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Per-cell expected value at the root.
///
/// - `ev` is the expected final score after placing the revealed card at
///   `(row, col)`.
/// - `legal` is false when the cell is already occupied.
#[derive(Debug, Clone, Copy)]
pub struct CellEval {
    pub row: usize,
    pub col: usize,
    pub ev: f64,
    pub legal: bool,
}

/// Basic search stats for a single evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// States evaluated during the last call.
    pub nodes: u64,
    /// Oracle leaf evaluations during the last call.
    pub leaves: u64,
    /// Largest `nodes` observed across calls.
    pub peak_nodes: u64,
}
