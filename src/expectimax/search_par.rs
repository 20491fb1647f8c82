use rayon::prelude::*;
use std::time::{Duration, Instant};

use crate::cards::Card;
use crate::engine::{Deck, EngineError, Grid, CELLS, SIZE};
use crate::game::Strategy;
use crate::scoring::ScoringOracle;

use super::{CellEval, ChoiceResult, ExpectimaxConfig, SearchStats};

/// Parallel expectimax: rayon fan-out over the root candidate cells.
///
/// The root MAX ply is the only safe parallelism boundary — every
/// candidate subtree runs on its own grid/deck clones, sequentially below
/// the root, so sibling subtrees share nothing but the read-only oracle.
/// The decision rule is identical to [`Expectimax`](super::Expectimax):
/// for the same inputs both variants return the same cell.
pub struct ExpectimaxParallel<S> {
    oracle: S,
    cfg: ExpectimaxConfig,
    stats: SearchStats,
}

impl<S: ScoringOracle> ExpectimaxParallel<S> {
    pub fn new(oracle: S) -> Self {
        Self::with_config(oracle, ExpectimaxConfig::default())
    }

    pub fn with_config(oracle: S, cfg: ExpectimaxConfig) -> Self {
        Self { oracle, cfg, stats: SearchStats::default() }
    }

    /// Pick the empty cell for `card` that maximizes expected final
    /// score. Same contract and tie-break as the sequential variant.
    ///
    /// Cancellation stays cooperative at root-candidate granularity: a
    /// worker that starts after the budget elapsed skips its candidate
    /// entirely, so every candidate that participates in the decision
    /// was evaluated to full depth.
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

        let candidates: Vec<(usize, usize)> = grid.empty_cells().collect();
        let start = Instant::now();

        let results: Vec<Option<ChoiceResult>> =
            if candidates.len() < self.cfg.par_thresholds.min_candidates {
                candidates
                    .iter()
                    .map(|&(row, col)| {
                        self.evaluate_candidate(card, grid, deck, row, col, depth_limit, start, time_budget)
                    })
                    .collect()
            } else {
                candidates
                    .par_iter()
                    .map(|&(row, col)| {
                        self.evaluate_candidate(card, grid, deck, row, col, depth_limit, start, time_budget)
                    })
                    .collect()
            };

        // Candidate order is row-major, so folding in order preserves the
        // earliest-cell tie-break regardless of worker timing.
        let mut best: Option<ChoiceResult> = None;
        for choice in results.into_iter().flatten() {
            if best.map_or(true, |b| choice.value > b.value) {
                best = Some(choice);
            }
        }

        self.stats.nodes = 0;
        Ok(best.map(|b| (b.row, b.col)).unwrap_or(fallback))
    }

    /// Expected value of every cell for `card`, occupied cells marked
    /// illegal. Always evaluates every empty cell to full depth.
    pub fn cell_evals(
        &mut self,
        card: Card,
        grid: &Grid,
        deck: &Deck,
        depth_limit: usize,
    ) -> Vec<CellEval> {
        let cells: Vec<(usize, usize)> = (0..SIZE)
            .flat_map(|row| (0..SIZE).map(move |col| (row, col)))
            .collect();
        let out: Vec<CellEval> = cells
            .par_iter()
            .map(|&(row, col)| {
                if !grid.is_empty(row, col) {
                    return CellEval { row, col, ev: 0.0, legal: false };
                }
                let mut snapshot = grid.clone();
                snapshot
                    .place(row, col, card)
                    .expect("empty cell rejected speculative placement");
                let ev = self.evaluate(&snapshot, deck, 1, depth_limit);
                CellEval { row, col, ev, legal: true }
            })
            .collect();
        self.stats.nodes = 0;
        out
    }

    /// Statistics from the last call. Node counts are not tracked across
    /// parallel workers.
    #[inline]
    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }

    #[inline]
    pub fn oracle(&self) -> &S {
        &self.oracle
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_candidate(
        &self,
        card: Card,
        grid: &Grid,
        deck: &Deck,
        row: usize,
        col: usize,
        depth_limit: usize,
        start: Instant,
        time_budget: Duration,
    ) -> Option<ChoiceResult> {
        if start.elapsed() >= time_budget {
            return None;
        }
        let mut snapshot = grid.clone();
        snapshot
            .place(row, col, card)
            .expect("empty cell rejected speculative placement");
        let value = self.evaluate(&snapshot, deck, 1, depth_limit);
        Some(ChoiceResult { row, col, value })
    }

    fn evaluate(&self, grid: &Grid, deck: &Deck, depth: usize, depth_limit: usize) -> f64 {
        if depth >= depth_limit || grid.is_full() || grid.filled() < 2 {
            return self.oracle.score(grid);
        }
        self.chance_value(grid, deck, depth, depth_limit)
    }

    fn chance_value(&self, grid: &Grid, deck: &Deck, depth: usize, depth_limit: usize) -> f64 {
        if deck.is_empty() {
            return self.oracle.score(grid);
        }
        let mut total = 0.0;
        for card in deck.remaining() {
            let rest = deck.without(card);
            let mut best: Option<f64> = None;
            for (row, col) in grid.empty_cells() {
                let mut snapshot = grid.clone();
                snapshot
                    .place(row, col, card)
                    .expect("empty cell rejected speculative placement");
                let value = self.evaluate(&snapshot, &rest, depth + 1, depth_limit);
                if best.map_or(true, |b| value > b) {
                    best = Some(value);
                }
            }
            total += best.unwrap_or_else(|| self.oracle.score(grid));
        }
        total / deck.len() as f64
    }
}

impl<S: ScoringOracle> Strategy for ExpectimaxParallel<S> {
    fn init(&mut self) {
        self.stats = SearchStats::default();
    }

    fn name(&self) -> &str {
        "expectimax-parallel"
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
