use ai_squares::cards::{self, Card};
use ai_squares::engine::{Grid, SIZE};
use ai_squares::scoring::{PointSystem, ScoringOracle};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::hint::black_box;

fn grids(fills: &[usize]) -> Vec<Grid> {
    let mut rng = StdRng::seed_from_u64(4242);
    let mut deal: Vec<Card> = cards::all().collect();
    deal.shuffle(&mut rng);
    fills
        .iter()
        .map(|&fill| {
            let mut grid = Grid::new();
            for (i, &card) in deal.iter().take(fill).enumerate() {
                grid.place(i / SIZE, i % SIZE, card).unwrap();
            }
            grid
        })
        .collect()
}

fn bench_scoring(c: &mut Criterion) {
    let boards = grids(&[0, 5, 10, 17, 25]);

    let warm = PointSystem::british();
    c.bench_function("scoring/grid_warm_cache", |bch| {
        bch.iter(|| {
            let mut acc = 0.0;
            for grid in &boards {
                acc += warm.score(grid);
            }
            black_box(acc)
        })
    });

    c.bench_function("scoring/grid_cold_cache", |bch| {
        bch.iter(|| {
            let fresh = PointSystem::british();
            let mut acc = 0.0;
            for grid in &boards {
                acc += fresh.score(grid);
            }
            black_box(acc)
        })
    });
}

criterion_group!(scoring, bench_scoring);
criterion_main!(scoring);
