//! The per-game driver: deal, reveal, consult a strategy, commit.
//!
//! The driver owns the live [`Grid`] and [`Deck`]; strategies only ever
//! see them by reference and answer with a cell. Per turn: reveal the
//! next card of the shuffled deal, `deck.draw(card)`, ask the strategy,
//! commit with `grid.place(row, col, card)`, repeat until the grid is
//! full.

use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::cards::{self, Card, DECK_SIZE};
use crate::engine::{Deck, EngineError, Grid, CELLS, SIZE};
use crate::scoring::ScoringOracle;

/// A placement policy consulted once per revealed card.
pub trait Strategy {
    /// Called once before the first card of a game.
    fn init(&mut self) {}

    /// Identification string; no behavioral contract.
    fn name(&self) -> &str;

    /// Pick an empty cell for `card`. The grid and deck are the driver's;
    /// implementations must not assume they can retain them.
    fn choose(
        &mut self,
        card: Card,
        grid: &Grid,
        deck: &Deck,
        clock_remaining: Duration,
    ) -> Result<(usize, usize), EngineError>;
}

/// One committed placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub card: Card,
    pub row: usize,
    pub col: usize,
}

/// Outcome of a completed game.
#[derive(Debug, Clone)]
pub struct GameResult {
    pub placements: Vec<Placement>,
    pub grid: Grid,
    pub final_score: f64,
    pub elapsed: Duration,
}

/// Play one full game from a shuffled deal.
///
/// `clock` is the wall-clock budget for the whole game; the remaining
/// clock is passed down to the strategy each turn. Deterministic for a
/// seeded RNG and a deterministic strategy/oracle.
pub fn play<T: Strategy, O: ScoringOracle, R: Rng>(
    strategy: &mut T,
    oracle: &O,
    rng: &mut R,
    clock: Duration,
) -> Result<GameResult, EngineError> {
    let mut grid = Grid::new();
    let mut deck = Deck::full();
    let mut deal: Vec<Card> = cards::all().collect();
    deal.shuffle(rng);

    strategy.init();
    let start = Instant::now();
    let mut placements = Vec::with_capacity(CELLS);

    for card in deal.into_iter().take(CELLS) {
        deck.draw(card)?;
        let remaining = clock.saturating_sub(start.elapsed());
        let (row, col) = strategy.choose(card, &grid, &deck, remaining)?;
        grid.place(row, col, card)?;
        placements.push(Placement { card, row, col });
        debug_assert_eq!(deck.len() + grid.filled(), DECK_SIZE);
    }

    let final_score = oracle.score(&grid);
    Ok(GameResult { placements, grid, final_score, elapsed: start.elapsed() })
}

/// Column-assignment strategy with no lookahead: each suit gets a column,
/// the fifth column takes the overflow.
///
/// Placement order: the card's suit column, then the overflow column,
/// then the first remaining column with space. Rows fill top-down.
pub struct FlushStrategy;

impl FlushStrategy {
    fn first_empty_row(grid: &Grid, col: usize) -> Option<usize> {
        (0..SIZE).find(|&row| grid.is_empty(row, col))
    }
}

impl Strategy for FlushStrategy {
    fn name(&self) -> &str {
        "flush"
    }

    fn choose(
        &mut self,
        card: Card,
        grid: &Grid,
        _deck: &Deck,
        _clock_remaining: Duration,
    ) -> Result<(usize, usize), EngineError> {
        let suit_col = u8::from(card.suit()) as usize;
        let overflow = SIZE - 1;
        if let Some(row) = Self::first_empty_row(grid, suit_col) {
            return Ok((row, suit_col));
        }
        if let Some(row) = Self::first_empty_row(grid, overflow) {
            return Ok((row, overflow));
        }
        for col in (0..overflow).filter(|&c| c != suit_col) {
            if let Some(row) = Self::first_empty_row(grid, col) {
                return Ok((row, col));
            }
        }
        Err(EngineError::NoEmptyCells)
    }
}
