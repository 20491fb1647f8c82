//! Serialization surfaces for run traces.
//!
//! This module defines a postcard-based v2 format that records per-turn
//! cell evaluations alongside the revealed card and chosen cell. It also
//! provides helpers to normalize cell EVs and to convert legacy v1 traces
//! to v2 structures (with `evals: None`).

mod v2;

pub use v2::{
    from_postcard_bytes,
    from_v1,
    normalize_cells,
    read_postcard_from_path,
    to_postcard_bytes,
    write_postcard_to_path,
    CellV2,
    RunV2,
    SerializationError,
    StepV2,
};
