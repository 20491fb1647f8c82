use std::time::Duration;

use ai_squares::engine::{Deck, Grid};
use ai_squares::expectimax::Expectimax;
use ai_squares::game::Strategy;
use ai_squares::scoring::{PointSystem, ScoringOracle};
use rand::seq::SliceRandom;

fn main() {
    let oracle = PointSystem::british();
    let mut strategy = Expectimax::new(PointSystem::british());
    let mut rng = rand::thread_rng();

    let mut grid = Grid::new();
    let mut deck = Deck::full();
    let mut deal: Vec<_> = ai_squares::cards::all().collect();
    deal.shuffle(&mut rng);

    strategy.init();
    let clock = Duration::from_secs(300);
    let start = std::time::Instant::now();
    for card in deal.into_iter().take(ai_squares::engine::CELLS) {
        deck.draw(card).expect("revealed card was already drawn");
        let remaining = clock.saturating_sub(start.elapsed());
        let (row, col) = strategy
            .choose(card, &grid, &deck, remaining)
            .expect("no legal placement");
        grid.place(row, col, card).expect("chosen cell was occupied");
        println!("{} -> ({}, {})", card, row, col);
        println!("{}", grid);
    }
    let stats = strategy.last_stats();
    println!(
        "Final score: {} | Peak states considered for a move: {}",
        oracle.score(&grid),
        stats.peak_nodes
    );
}
