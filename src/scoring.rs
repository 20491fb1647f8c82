//! Poker-hand scoring for full and partial grids.
//!
//! A grid is worth the sum of its ten hands (5 rows, 5 columns), each
//! classified as a poker hand and mapped to points by a fixed
//! [`PointSystem`]. Partial hands score what the cards already
//! constitute: rank-multiset categories (pair, two pair, trips, full
//! house, quads) apply at any fill level; straight, flush and straight
//! flush require all five cards.

use ahash::RandomState;
use dashmap::DashMap;

use crate::cards::Card;
use crate::engine::{Grid, SIZE};

/// External scoring oracle consulted at search leaves.
///
/// Implementations must be deterministic, side-effect-free and safely
/// callable from concurrent search workers.
pub trait ScoringOracle: Sync {
    fn score(&self, grid: &Grid) -> f64;
}

/// Poker hand categories, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

/// Classify a possibly partial hand of up to five cards.
pub fn classify(hand: &[Option<Card>; SIZE]) -> HandCategory {
    let mut rank_counts = [0u8; 13];
    let mut suit_counts = [0u8; 4];
    let mut n = 0u8;
    for card in hand.iter().flatten() {
        rank_counts[u8::from(card.rank()) as usize] += 1;
        suit_counts[u8::from(card.suit()) as usize] += 1;
        n += 1;
    }

    let mut pairs = 0u8;
    let mut trips = false;
    let mut quads = false;
    for &count in rank_counts.iter() {
        match count {
            2 => pairs += 1,
            3 => trips = true,
            4 => quads = true,
            _ => {}
        }
    }

    let flush = n == 5 && suit_counts.iter().any(|&c| c == 5);
    let straight = n == 5 && is_straight(&rank_counts);
    // T-J-Q-K-A, ranks 8..=12
    let royal = straight && rank_counts[8] == 1 && rank_counts[12] == 1;

    if straight && flush {
        if royal {
            HandCategory::RoyalFlush
        } else {
            HandCategory::StraightFlush
        }
    } else if quads {
        HandCategory::FourOfAKind
    } else if trips && pairs == 1 {
        HandCategory::FullHouse
    } else if flush {
        HandCategory::Flush
    } else if straight {
        HandCategory::Straight
    } else if trips {
        HandCategory::ThreeOfAKind
    } else if pairs == 2 {
        HandCategory::TwoPair
    } else if pairs == 1 {
        HandCategory::OnePair
    } else {
        HandCategory::HighCard
    }
}

fn is_straight(rank_counts: &[u8; 13]) -> bool {
    if rank_counts.iter().any(|&c| c > 1) {
        return false;
    }
    // Ace plays low in A-2-3-4-5.
    if rank_counts[12] == 1 && (0..4).all(|r| rank_counts[r] == 1) {
        return true;
    }
    let lowest = match rank_counts.iter().position(|&c| c == 1) {
        Some(r) => r,
        None => return false,
    };
    lowest + 4 < 13 && (lowest..=lowest + 4).all(|r| rank_counts[r] == 1)
}

/// A fixed ruleset mapping hand categories to points.
///
/// Holds a concurrent per-hand memo so that the eight hands a speculative
/// placement leaves untouched are not reclassified; the cache is
/// read-safe from parallel search workers and never observable in
/// scores.
pub struct PointSystem {
    name: &'static str,
    points: [u32; 10],
    cache: DashMap<u64, u32, RandomState>,
}

impl PointSystem {
    /// The American point system.
    pub fn american() -> Self {
        Self::with_table("american", [0, 2, 5, 10, 15, 20, 25, 50, 75, 100])
    }

    /// The British point system, weighing hands by difficulty under
    /// deal-without-replacement.
    pub fn british() -> Self {
        Self::with_table("british", [0, 1, 3, 6, 12, 5, 10, 16, 30, 30])
    }

    fn with_table(name: &'static str, points: [u32; 10]) -> Self {
        PointSystem { name, points, cache: DashMap::with_hasher(RandomState::new()) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Points awarded for one (possibly partial) hand.
    pub fn hand_points(&self, hand: &[Option<Card>; SIZE]) -> u32 {
        let key = hand_key(hand);
        if let Some(points) = self.cache.get(&key) {
            return *points;
        }
        let points = self.points[classify(hand) as usize];
        self.cache.insert(key, points);
        points
    }

    /// Total points over the ten hands of a grid.
    pub fn grid_points(&self, grid: &Grid) -> u32 {
        grid.hands().map(|hand| self.hand_points(&hand)).sum()
    }
}

impl ScoringOracle for PointSystem {
    fn score(&self, grid: &Grid) -> f64 {
        self.grid_points(grid) as f64
    }
}

/// Pack a hand into a cache key: present card indices, sorted, 6 bits
/// each (offset by one so zero never collides with a card).
fn hand_key(hand: &[Option<Card>; SIZE]) -> u64 {
    let mut indices = [0u8; SIZE];
    let mut n = 0;
    for card in hand.iter().flatten() {
        indices[n] = u8::from(*card);
        n += 1;
    }
    indices[..n].sort_unstable();
    indices[..n]
        .iter()
        .fold(0u64, |key, &idx| (key << 6) | (idx as u64 + 1))
}
