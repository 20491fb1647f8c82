use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const MAGIC: &[u8; 4] = b"PSQ1"; // ASCII magic
const VERSION: u8 = 1;
const ENDIAN_LE: u8 = 0; // 0 = little-endian

use serde::{Deserialize, Serialize};

use crate::cards::DECK_SIZE;
use crate::engine::CELLS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub turns: u32,
    pub start_unix_s: u64,
    pub elapsed_s: f32,
    pub final_score: u32,
    pub point_system: Option<String>,
}

/// A recorded game: per turn, the revealed card's deck index and the
/// chosen cell's row-major index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub meta: Meta,
    pub cards: Vec<u8>, // length = turns, values < 52
    pub cells: Vec<u8>, // length = turns, values < 25
}

#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid magic or version")]
    MagicOrVersion,
    #[error("unsupported endianness")]
    Endianness,
    #[error("file too short or malformed")]
    Malformed,
    #[error("checksum mismatch")]
    Checksum,
}

#[inline]
fn read_u16_le(bytes: &[u8]) -> Option<u16> {
    if bytes.len() < 2 {
        return None;
    }
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < 4 {
        return None;
    }
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
fn read_u64_le(bytes: &[u8]) -> Option<u64> {
    if bytes.len() < 8 {
        return None;
    }
    Some(u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}

#[inline]
fn read_f32_le(bytes: &[u8]) -> Option<f32> {
    read_u32_le(bytes).map(f32::from_bits)
}

pub fn encode_run(meta: &Meta, cards: &[u8], cells: &[u8]) -> Vec<u8> {
    // Validate lengths consistent
    assert_eq!(cards.len(), meta.turns as usize);
    assert_eq!(cells.len(), meta.turns as usize);

    let system_bytes = meta
        .point_system
        .as_ref()
        .map(|s| s.as_bytes())
        .unwrap_or(&[]);
    let system_len: u16 = system_bytes
        .len()
        .try_into()
        .expect("point_system too long for u16 length");

    // Header size:
    // 4 magic + 1 version + 1 endian + 4 turns + 8 start + 4 elapsed + 4 final_score + 2 system_len
    let header_len = 4 + 1 + 1 + 4 + 8 + 4 + 4 + 2;
    let payload_len = system_bytes.len() + cards.len() + cells.len();
    let total_without_checksum = header_len + payload_len;
    let mut buf = Vec::with_capacity(total_without_checksum + 4);

    // Header
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.push(ENDIAN_LE);
    buf.extend_from_slice(&meta.turns.to_le_bytes());
    buf.extend_from_slice(&meta.start_unix_s.to_le_bytes());
    buf.extend_from_slice(&meta.elapsed_s.to_bits().to_le_bytes());
    buf.extend_from_slice(&meta.final_score.to_le_bytes());
    buf.extend_from_slice(&system_len.to_le_bytes());

    // Variable metadata
    buf.extend_from_slice(system_bytes);

    // Payload: card indices, then cell indices
    buf.extend_from_slice(cards);
    buf.extend_from_slice(cells);

    // Trailer: CRC32C of all preceding bytes
    let checksum = crc32c::crc32c(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    buf
}

pub fn write_run_to_path<P: AsRef<Path>>(
    path: P,
    meta: &Meta,
    cards: &[u8],
    cells: &[u8],
) -> Result<(), TraceError> {
    let data = encode_run(meta, cards, cells);
    let mut f = fs::File::create(path)?;
    f.write_all(&data)?;
    Ok(())
}

pub fn parse_run_bytes(bytes: &[u8]) -> Result<Run, TraceError> {
    // header + checksum at minimum (no payload)
    if bytes.len() < 4 + 1 + 1 + 4 + 8 + 4 + 4 + 2 + 4 {
        return Err(TraceError::Malformed);
    }

    // Validate checksum first to avoid panics while reading fields
    let (content, trailer) = bytes.split_at(bytes.len() - 4);
    let file_crc = read_u32_le(trailer).ok_or(TraceError::Malformed)?;
    let calc_crc = crc32c::crc32c(content);
    if file_crc != calc_crc {
        return Err(TraceError::Checksum);
    }

    // Fixed header
    if &content[..4] != MAGIC {
        return Err(TraceError::MagicOrVersion);
    }
    if content[4] != VERSION {
        return Err(TraceError::MagicOrVersion);
    }
    if content[5] != ENDIAN_LE {
        return Err(TraceError::Endianness);
    }

    let mut off = 6;
    let turns = read_u32_le(&content[off..]).ok_or(TraceError::Malformed)?;
    off += 4;
    let start_unix_s = read_u64_le(&content[off..]).ok_or(TraceError::Malformed)?;
    off += 8;
    let elapsed_s = read_f32_le(&content[off..]).ok_or(TraceError::Malformed)?;
    off += 4;
    let final_score = read_u32_le(&content[off..]).ok_or(TraceError::Malformed)?;
    off += 4;
    let system_len = read_u16_le(&content[off..]).ok_or(TraceError::Malformed)? as usize;
    off += 2;

    if content.len() < off + system_len {
        return Err(TraceError::Malformed);
    }
    let system_bytes = &content[off..off + system_len];
    off += system_len;
    let point_system = if system_len > 0 {
        match std::str::from_utf8(system_bytes) {
            Ok(s) => Some(s.to_string()),
            Err(_) => None,
        }
    } else {
        None
    };

    let turns_len = turns as usize;
    if turns_len > CELLS {
        return Err(TraceError::Malformed);
    }
    if content.len() < off + 2 * turns_len {
        return Err(TraceError::Malformed);
    }

    let cards = content[off..off + turns_len].to_vec();
    off += turns_len;
    let cells = content[off..off + turns_len].to_vec();

    if cards.iter().any(|&c| c as usize >= DECK_SIZE) {
        return Err(TraceError::Malformed);
    }
    if cells.iter().any(|&c| c as usize >= CELLS) {
        return Err(TraceError::Malformed);
    }

    let meta = Meta { turns, start_unix_s, elapsed_s, final_score, point_system };

    Ok(Run { meta, cards, cells })
}

pub fn parse_run_file<P: AsRef<Path>>(path: P) -> Result<Run, TraceError> {
    let data = fs::read(path)?;
    parse_run_bytes(&data)
}

pub fn now_unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn round_trip_small() {
        let cards = vec![0_u8, 13, 51];
        let cells = vec![0_u8, 12, 24];
        let meta = Meta {
            turns: cards.len() as u32,
            start_unix_s: 1_700_000_000,
            elapsed_s: 12.34,
            final_score: 42,
            point_system: Some("british".to_string()),
        };

        let tmp = NamedTempFile::new().unwrap();
        write_run_to_path(tmp.path(), &meta, &cards, &cells).unwrap();
        let run = parse_run_file(tmp.path()).unwrap();
        assert_eq!(run.meta, meta);
        assert_eq!(run.cards, cards);
        assert_eq!(run.cells, cells);
    }

    #[test]
    fn checksum_mismatch() {
        let cards = vec![3_u8];
        let cells = vec![7_u8];
        let meta = Meta {
            turns: 1,
            start_unix_s: 0,
            elapsed_s: 0.0,
            final_score: 0,
            point_system: None,
        };
        let mut bytes = encode_run(&meta, &cards, &cells);
        // Flip one byte in the payload
        let payload_start = 4 + 1 + 1 + 4 + 8 + 4 + 4 + 2;
        bytes[payload_start] ^= 0xFF;
        // Parsing should fail on checksum
        let err = parse_run_bytes(&bytes).unwrap_err();
        assert!(matches!(err, TraceError::Checksum));
    }

    #[test]
    fn malformed_bounds() {
        let cards = vec![3_u8, 1];
        let cells = vec![7_u8, 8];
        let meta = Meta {
            turns: 2,
            start_unix_s: 0,
            elapsed_s: 0.0,
            final_score: 0,
            point_system: None,
        };
        let mut bytes = encode_run(&meta, &cards, &cells);
        // Truncate last 5 bytes to simulate incomplete file
        bytes.truncate(bytes.len() - 5);
        let err = parse_run_bytes(&bytes).unwrap_err();
        assert!(matches!(err, TraceError::Checksum | TraceError::Malformed));
    }

    #[test]
    fn out_of_range_indices_rejected() {
        let meta = Meta {
            turns: 1,
            start_unix_s: 0,
            elapsed_s: 0.0,
            final_score: 0,
            point_system: None,
        };
        let bytes = encode_run(&meta, &[52], &[0]);
        let err = parse_run_bytes(&bytes).unwrap_err();
        assert!(matches!(err, TraceError::Malformed));
    }
}
