//! ai-squares: a Poker Squares game engine + Expectimax placement policy
//!
//! This crate provides:
//! - The card domain and the board model: `cards`, `engine` (`Grid`, `Deck`)
//! - Poker-hand scoring of full and partial grids (`scoring` module)
//! - An Expectimax placement AI (`expectimax` module) with single-threaded
//!   and parallel variants
//! - A game driver and baseline strategies (`game` module)
//! - A binary trace format for runs (`trace` module) and a postcard-based
//!   v2 format with per-turn cell EVs (`serialization` module)
//!
//! Quick start:
//! ```
//! use ai_squares::expectimax::{Expectimax, ExpectimaxConfig};
//! use ai_squares::game;
//! use ai_squares::scoring::PointSystem;
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::time::Duration;
//!
//! // Deterministic game with a seeded RNG
//! let mut rng = StdRng::seed_from_u64(42);
//! let cfg = ExpectimaxConfig { depth_limit: 1, ..Default::default() };
//! let mut strategy = Expectimax::with_config(PointSystem::british(), cfg);
//! let oracle = PointSystem::british();
//! let result = game::play(&mut strategy, &oracle, &mut rng, Duration::from_secs(300)).unwrap();
//! assert!(result.grid.is_full());
//! ```
//!
//! Note: the search itself is deterministic; randomness only enters a game
//! through the driver's shuffled deal. Prefer seeded RNGs when you need
//! reproducibility.

pub mod cards;
pub mod engine;
pub mod expectimax;
pub mod game;
pub mod scoring;
pub mod serialization;
pub mod trace;
