use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::engine::CELLS;
use crate::expectimax::CellEval;
use crate::trace::{Meta, Run};

/// Cell EV for one candidate at a decision point.
///
/// Values are normalized to [0, 1) using per-turn min-max across legal
/// cells; occupied cells are recorded explicitly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum CellV2 {
    Legal(f32),
    Occupied,
}

/// A single decision turn in a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepV2 {
    /// Card revealed before the placement.
    pub card: Card,
    /// Chosen cell in row-major index form (row * 5 + col).
    pub chosen_cell: u8,
    /// Normalized cell EVs in row-major order.
    ///
    /// Absent when converted from legacy v1 traces.
    pub evals: Option<[CellV2; CELLS]>,
}

/// A full run in v2 representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunV2 {
    pub meta: Meta,
    pub steps: Vec<StepV2>,
}

#[derive(thiserror::Error, Debug)]
pub enum SerializationError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}

/// Normalize raw cell EVs to [0, 1) with stable edge cases.
///
/// - If no legal cells: all `Occupied`.
/// - One legal cell: that cell gets `1.0 - f32::EPSILON`.
/// - Multiple legal with equal EVs: all legal get 0.5.
/// - Else: (ev - min) / (max - min), clamped to < 1.0.
pub fn normalize_cells(input: &[CellEval]) -> [CellV2; CELLS] {
    let mut out = [CellV2::Occupied; CELLS];
    let mut legal_vals: Vec<(usize, f64)> = Vec::with_capacity(CELLS);
    for eval in input {
        if eval.legal {
            legal_vals.push((eval.row * 5 + eval.col, eval.ev));
        }
    }
    if legal_vals.is_empty() {
        return out;
    }
    if legal_vals.len() == 1 {
        out[legal_vals[0].0] = CellV2::Legal(1.0 - f32::EPSILON);
        return out;
    }
    let (mut min_ev, mut max_ev) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, ev) in &legal_vals {
        if ev < min_ev {
            min_ev = ev;
        }
        if ev > max_ev {
            max_ev = ev;
        }
    }
    if (max_ev - min_ev).abs() < f64::EPSILON {
        for (i, _) in legal_vals {
            out[i] = CellV2::Legal(0.5);
        }
        return out;
    }
    let denom = (max_ev - min_ev) as f32;
    for (i, ev) in legal_vals {
        let mut v = ((ev - min_ev) as f32) / denom;
        if v >= 1.0 {
            v = 1.0 - f32::EPSILON;
        }
        out[i] = CellV2::Legal(v);
    }
    out
}

/// Convert a legacy v1 binary run into a v2 struct, without cell EVs.
pub fn from_v1(run: Run) -> RunV2 {
    let turns = run.meta.turns as usize;
    let mut steps = Vec::with_capacity(turns);
    for i in 0..turns {
        steps.push(StepV2 {
            card: Card::from(run.cards[i]),
            chosen_cell: run.cells[i],
            evals: None,
        });
    }
    RunV2 { meta: run.meta, steps }
}

/// Encode a v2 run to postcard bytes.
pub fn to_postcard_bytes(run: &RunV2) -> Result<Vec<u8>, SerializationError> {
    Ok(postcard::to_allocvec(run)?)
}

/// Decode a v2 run from postcard bytes.
pub fn from_postcard_bytes(bytes: &[u8]) -> Result<RunV2, SerializationError> {
    Ok(postcard::from_bytes(bytes)?)
}

/// Write a v2 run to a file as postcard bytes.
pub fn write_postcard_to_path<P: AsRef<Path>>(
    path: P,
    run: &RunV2,
) -> Result<(), SerializationError> {
    let bytes = to_postcard_bytes(run)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Read a v2 run from a postcard file.
pub fn read_postcard_from_path<P: AsRef<Path>>(path: P) -> Result<RunV2, SerializationError> {
    let bytes = fs::read(path)?;
    from_postcard_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evals_from(pairs: &[(usize, usize, f64, bool)]) -> Vec<CellEval> {
        pairs
            .iter()
            .map(|&(row, col, ev, legal)| CellEval { row, col, ev, legal })
            .collect()
    }

    #[test]
    fn normalize_minmax() {
        let evals = evals_from(&[
            (0, 0, 10.0, true),
            (0, 1, 20.0, true),
            (0, 2, 15.0, true),
            (0, 3, 0.0, false),
        ]);
        let out = normalize_cells(&evals);
        assert_eq!(out[0], CellV2::Legal(0.0));
        assert!(matches!(out[1], CellV2::Legal(v) if v >= 0.99 && v < 1.0));
        assert_eq!(out[2], CellV2::Legal(0.5));
        assert_eq!(out[3], CellV2::Occupied);
    }

    #[test]
    fn normalize_single_legal() {
        let evals = evals_from(&[(2, 4, 123.0, true), (2, 3, 0.0, false)]);
        let out = normalize_cells(&evals);
        assert!(matches!(out[2 * 5 + 4], CellV2::Legal(v) if v < 1.0 && v > 0.99));
        assert_eq!(out[2 * 5 + 3], CellV2::Occupied);
    }

    #[test]
    fn normalize_all_equal() {
        let evals = evals_from(&[(0, 0, 7.0, true), (1, 1, 7.0, true), (2, 2, 7.0, true)]);
        let out = normalize_cells(&evals);
        assert_eq!(out[0], CellV2::Legal(0.5));
        assert_eq!(out[6], CellV2::Legal(0.5));
        assert_eq!(out[12], CellV2::Legal(0.5));
    }

    #[test]
    fn normalize_none_legal() {
        let out = normalize_cells(&[]);
        assert!(out.iter().all(|c| *c == CellV2::Occupied));
    }

    #[test]
    fn postcard_round_trip() {
        let meta = Meta {
            turns: 2,
            start_unix_s: 1_700_000_000,
            elapsed_s: 1.5,
            final_score: 21,
            point_system: Some("american".to_string()),
        };
        let evals = normalize_cells(&[
            CellEval { row: 0, col: 0, ev: 1.0, legal: true },
            CellEval { row: 0, col: 1, ev: 2.0, legal: true },
        ]);
        let run = RunV2 {
            meta,
            steps: vec![
                StepV2 { card: Card::from(12), chosen_cell: 0, evals: Some(evals) },
                StepV2 { card: Card::from(40), chosen_cell: 6, evals: None },
            ],
        };
        let bytes = to_postcard_bytes(&run).unwrap();
        let parsed = from_postcard_bytes(&bytes).unwrap();
        assert_eq!(parsed, run);
    }

    #[test]
    fn v1_conversion_drops_evals() {
        let run = Run {
            meta: Meta {
                turns: 2,
                start_unix_s: 0,
                elapsed_s: 0.0,
                final_score: 5,
                point_system: None,
            },
            cards: vec![0, 51],
            cells: vec![24, 0],
        };
        let v2 = from_v1(run);
        assert_eq!(v2.steps.len(), 2);
        assert_eq!(v2.steps[0].card, Card::from(0));
        assert_eq!(v2.steps[0].chosen_cell, 24);
        assert!(v2.steps.iter().all(|s| s.evals.is_none()));
    }
}
