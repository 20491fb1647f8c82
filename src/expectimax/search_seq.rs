use std::time::{Duration, Instant};

use crate::cards::Card;
use crate::engine::{Deck, EngineError, Grid, CELLS};
use crate::game::Strategy;
use crate::scoring::ScoringOracle;

use super::{CellEval, ChoiceResult, ExpectimaxConfig, SearchStats};

/// Single-threaded depth-limited expectimax.
///
/// Holds the scoring oracle and diagnostic counters; every search runs on
/// internal clones of the grid and deck it is handed, so the caller's
/// state is never mutated.
pub struct Expectimax<S> {
    oracle: S,
    cfg: ExpectimaxConfig,
    stats: SearchStats,
}

impl<S: ScoringOracle> Expectimax<S> {
    pub fn new(oracle: S) -> Self {
        Self::with_config(oracle, ExpectimaxConfig::default())
    }

    pub fn with_config(oracle: S, cfg: ExpectimaxConfig) -> Self {
        Self { oracle, cfg, stats: SearchStats::default() }
    }

    /// Pick the empty cell for `card` that maximizes expected final score.
    ///
    /// Preconditions: the grid is not full and `card` was already drawn
    /// from `deck`. The returned cell is empty in `grid`; committing the
    /// placement is the driver's job.
    ///
    /// The budget is advisory: it is checked only between fully evaluated
    /// root candidates, so every candidate that participates in the
    /// decision was explored to full depth. On exhaustion the best cell
    /// found so far wins; if no candidate has been evaluated yet, the
    /// first empty cell in row-major order is returned.
    ///
    /// ```
    /// use ai_squares::cards::Card;
    /// use ai_squares::engine::{Deck, Grid};
    /// use ai_squares::expectimax::Expectimax;
    /// use ai_squares::scoring::PointSystem;
    /// use std::time::Duration;
    ///
    /// let grid = Grid::new();
    /// let mut deck = Deck::full();
    /// let card = Card::from(0);
    /// deck.draw(card).unwrap();
    /// let mut ex = Expectimax::new(PointSystem::american());
    /// let cell = ex.choose_cell(card, &grid, &deck, 1, Duration::from_secs(1)).unwrap();
    /// assert_eq!(cell, (0, 0));
    /// ```
    pub fn choose_cell(
        &mut self,
        card: Card,
        grid: &Grid,
        deck: &Deck,
        depth_limit: usize,
        time_budget: Duration,
    ) -> Result<(usize, usize), EngineError> {
        let fallback = grid.first_empty().ok_or(EngineError::NoEmptyCells)?;
        debug_assert!(!deck.contains(card));

        self.stats.nodes = 0;
        self.stats.leaves = 0;
        let start = Instant::now();

        let mut best: Option<ChoiceResult> = None;
        for (row, col) in grid.empty_cells() {
            if start.elapsed() >= time_budget {
                break;
            }
            let mut snapshot = grid.clone();
            snapshot.place(row, col, card)?;
            let value = self.evaluate(&snapshot, deck, 1, depth_limit);
            if best.map_or(true, |b| value > b.value) {
                best = Some(ChoiceResult { row, col, value });
            }
        }

        self.stats.peak_nodes = self.stats.peak_nodes.max(self.stats.nodes);
        Ok(best.map(|b| (b.row, b.col)).unwrap_or(fallback))
    }

    /// Expected value of every cell for `card`, occupied cells marked
    /// illegal.
    ///
    /// Unlike [`Self::choose_cell`] this always evaluates every empty
    /// cell to full depth; it exists for analysis and run recording, not
    /// for time-constrained play.
    pub fn cell_evals(
        &mut self,
        card: Card,
        grid: &Grid,
        deck: &Deck,
        depth_limit: usize,
    ) -> Vec<CellEval> {
        self.stats.nodes = 0;
        self.stats.leaves = 0;
        let mut out = Vec::with_capacity(CELLS);
        for row in 0..crate::engine::SIZE {
            for col in 0..crate::engine::SIZE {
                if !grid.is_empty(row, col) {
                    out.push(CellEval { row, col, ev: 0.0, legal: false });
                    continue;
                }
                let mut snapshot = grid.clone();
                snapshot
                    .place(row, col, card)
                    .expect("empty cell rejected speculative placement");
                let ev = self.evaluate(&snapshot, deck, 1, depth_limit);
                out.push(CellEval { row, col, ev, legal: true });
            }
        }
        self.stats.peak_nodes = self.stats.peak_nodes.max(self.stats.nodes);
        out
    }

    /// Statistics collected from the last call.
    #[inline]
    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) {
        self.stats = SearchStats::default();
    }

    #[inline]
    pub fn oracle(&self) -> &S {
        &self.oracle
    }

    /// Value of a grid snapshot at `depth` plies below the root.
    ///
    /// Leaf cases: the depth limit, a full grid, or a grid with fewer
    /// than two cards (the very first and last placements are scored
    /// directly — lookahead is not meaningful there).
    fn evaluate(&mut self, grid: &Grid, deck: &Deck, depth: usize, depth_limit: usize) -> f64 {
        self.stats.nodes += 1;
        if depth >= depth_limit || grid.is_full() || grid.filled() < 2 {
            self.stats.leaves += 1;
            return self.oracle.score(grid);
        }
        self.chance_value(grid, deck, depth, depth_limit)
    }

    /// CHANCE ply: the uniform average, over each card the deck could
    /// produce next, of the best placement value for that card.
    fn chance_value(&mut self, grid: &Grid, deck: &Deck, depth: usize, depth_limit: usize) -> f64 {
        if deck.is_empty() {
            self.stats.leaves += 1;
            return self.oracle.score(grid);
        }
        let mut total = 0.0;
        for card in deck.remaining() {
            let rest = deck.without(card);
            let best = self.best_placement(card, grid, &rest, depth + 1, depth_limit);
            total += match best {
                Some(choice) => choice.value,
                None => self.oracle.score(grid),
            };
        }
        total / deck.len() as f64
    }

    /// MAX ply nested inside a chance expansion: try `card` in every
    /// empty cell and keep the best child, folding pure return values
    /// instead of mutating shared state.
    fn best_placement(
        &mut self,
        card: Card,
        grid: &Grid,
        deck: &Deck,
        depth: usize,
        depth_limit: usize,
    ) -> Option<ChoiceResult> {
        let mut best: Option<ChoiceResult> = None;
        for (row, col) in grid.empty_cells() {
            let mut snapshot = grid.clone();
            snapshot
                .place(row, col, card)
                .expect("empty cell rejected speculative placement");
            let value = self.evaluate(&snapshot, deck, depth, depth_limit);
            if best.map_or(true, |b| value > b.value) {
                best = Some(ChoiceResult { row, col, value });
            }
        }
        best
    }
}

impl<S: ScoringOracle> Strategy for Expectimax<S> {
    fn init(&mut self) {
        self.stats = SearchStats::default();
    }

    fn name(&self) -> &str {
        "expectimax"
    }

    fn choose(
        &mut self,
        card: Card,
        grid: &Grid,
        deck: &Deck,
        clock_remaining: Duration,
    ) -> Result<(usize, usize), EngineError> {
        let moves_left = (CELLS - grid.filled()).max(1) as u32;
        let budget = (clock_remaining / moves_left).min(self.cfg.time_budget);
        self.choose_cell(card, grid, deck, self.cfg.depth_limit, budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{self, Rank, Suit};
    use crate::engine::SIZE;
    use crate::scoring::PointSystem;

    const BUDGET: Duration = Duration::from_secs(60);

    /// Rewards only a completed flush in column 0.
    struct ColumnFlushOracle;

    impl ScoringOracle for ColumnFlushOracle {
        fn score(&self, grid: &Grid) -> f64 {
            let col = grid.col(0);
            if col.iter().any(|c| c.is_none()) {
                return 0.0;
            }
            let mut suits = col.iter().flatten().map(|c| c.suit());
            let first = match suits.next() {
                Some(suit) => suit,
                None => return 0.0,
            };
            if suits.all(|s| s == first) {
                20.0
            } else {
                0.0
            }
        }
    }

    fn drawn(card: Card) -> Deck {
        let mut deck = Deck::full();
        deck.draw(card).unwrap();
        deck
    }

    /// A mid-game position: `n` cards committed row-major, the next card
    /// revealed (drawn but not yet placed).
    fn position(n: usize) -> (Grid, Deck, Card) {
        let mut grid = Grid::new();
        let mut deck = Deck::full();
        let mut deal = cards::all();
        for i in 0..n {
            let card = deal.next().unwrap();
            deck.draw(card).unwrap();
            grid.place(i / SIZE, i % SIZE, card).unwrap();
        }
        let revealed = deal.next().unwrap();
        deck.draw(revealed).unwrap();
        (grid, deck, revealed)
    }

    #[test]
    fn full_grid_is_rejected() {
        let (grid, deck, revealed) = position(CELLS);
        let mut ex = Expectimax::new(PointSystem::british());
        let err = ex.choose_cell(revealed, &grid, &deck, 2, BUDGET).unwrap_err();
        assert_eq!(err, EngineError::NoEmptyCells);
    }

    #[test]
    fn returns_empty_cell_and_leaves_inputs_untouched() {
        let (grid, deck, card) = position(7);
        let grid_before = grid.clone();
        let deck_before = deck.clone();
        let mut ex = Expectimax::new(PointSystem::british());
        let (row, col) = ex.choose_cell(card, &grid, &deck, 2, BUDGET).unwrap();
        assert!(grid.is_empty(row, col));
        assert!(grid == grid_before);
        assert!(deck == deck_before);
    }

    #[test]
    fn first_card_ties_break_row_major() {
        // All placements of the first card score alike, so the first
        // empty cell must win.
        let card = Card::new(Rank::Ace, Suit::Clubs);
        let mut ex = Expectimax::new(ColumnFlushOracle);
        let cell = ex
            .choose_cell(card, &Grid::new(), &drawn(card), 1, BUDGET)
            .unwrap();
        assert_eq!(cell, (0, 0));
    }

    #[test]
    fn depth_one_matches_greedy() {
        let (grid, deck, card) = position(9);
        let oracle = PointSystem::american();

        let mut greedy_best: Option<((usize, usize), f64)> = None;
        for (row, col) in grid.empty_cells() {
            let mut g = grid.clone();
            g.place(row, col, card).unwrap();
            let v = oracle.score(&g);
            if greedy_best.map_or(true, |(_, best)| v > best) {
                greedy_best = Some(((row, col), v));
            }
        }

        let mut ex = Expectimax::new(PointSystem::american());
        let cell = ex.choose_cell(card, &grid, &deck, 1, BUDGET).unwrap();
        assert_eq!(cell, greedy_best.unwrap().0);
    }

    #[test]
    fn first_and_last_placements_skip_chance_expansion() {
        // First card: every root candidate leaves one card on the grid,
        // which is scored directly regardless of depth limit.
        let card = Card::new(Rank::Queen, Suit::Hearts);
        let mut ex = Expectimax::new(PointSystem::british());
        ex.choose_cell(card, &Grid::new(), &drawn(card), 3, BUDGET).unwrap();
        let stats = ex.last_stats();
        assert_eq!(stats.nodes, CELLS as u64);
        assert_eq!(stats.leaves, CELLS as u64);

        // Last card: the single candidate fills the grid.
        let (grid, deck, card) = position(CELLS - 1);
        let only: Vec<_> = grid.empty_cells().collect();
        assert_eq!(only.len(), 1);
        let cell = ex.choose_cell(card, &grid, &deck, 3, BUDGET).unwrap();
        assert_eq!(cell, only[0]);
        let stats = ex.last_stats();
        assert_eq!(stats.nodes, 1);
        assert_eq!(stats.leaves, 1);
    }

    #[test]
    fn deterministic_across_calls() {
        let (grid, deck, card) = position(20);
        let mut ex = Expectimax::new(PointSystem::british());
        let first = ex.choose_cell(card, &grid, &deck, 2, BUDGET).unwrap();
        let second = ex.choose_cell(card, &grid, &deck, 2, BUDGET).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn exhausted_budget_falls_back_to_first_empty() {
        let (grid, deck, card) = position(5);
        let mut ex = Expectimax::new(PointSystem::british());
        let cell = ex
            .choose_cell(card, &grid, &deck, 2, Duration::ZERO)
            .unwrap();
        assert_eq!(cell, grid.first_empty().unwrap());
    }

    #[test]
    fn cell_evals_cover_grid() {
        let (grid, deck, card) = position(22);
        let mut ex = Expectimax::new(PointSystem::british());
        let evals = ex.cell_evals(card, &grid, &deck, 2);
        assert_eq!(evals.len(), CELLS);
        assert_eq!(evals.iter().filter(|e| e.legal).count(), CELLS - 22);
        for eval in &evals {
            assert_eq!(eval.legal, grid.is_empty(eval.row, eval.col));
        }
        // The chosen cell carries the maximum EV among legal cells.
        let chosen = ex.choose_cell(card, &grid, &deck, 2, BUDGET).unwrap();
        let max_ev = evals
            .iter()
            .filter(|e| e.legal)
            .map(|e| e.ev)
            .fold(f64::NEG_INFINITY, f64::max);
        let chosen_ev = evals
            .iter()
            .find(|e| (e.row, e.col) == chosen)
            .unwrap()
            .ev;
        assert_eq!(chosen_ev, max_ev);
    }
}
