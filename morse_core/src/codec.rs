// Pattern codec: shape validation, resizing, text form, and the bit-packed
// base64 string used for sharing patterns.
// Invalid input is reported through bool/Option, never an error or panic.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::types::Pattern;

/// Standard alphabet, padded on encode, lenient about padding on decode.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const CELL_ON: char = '█';
const CELL_OFF: char = '░';

/// True iff the pattern is non-empty and square.
pub fn is_valid_pattern(pattern: &Pattern) -> bool {
    pattern.is_valid()
}

/// Validation for untyped host data: a non-empty array of arrays, each row as
/// long as the outer array, every cell a JSON boolean.
pub fn is_valid_pattern_value(candidate: &Value) -> bool {
    let Some(rows) = candidate.as_array() else {
        return false;
    };
    let size = rows.len();
    size > 0
        && rows.iter().all(|row| {
            row.as_array()
                .is_some_and(|cells| cells.len() == size && cells.iter().all(Value::is_boolean))
        })
}

/// Converts validated host data into a [`Pattern`].
pub fn pattern_from_value(candidate: &Value) -> Option<Pattern> {
    if !is_valid_pattern_value(candidate) {
        return None;
    }
    let rows = candidate
        .as_array()?
        .iter()
        .map(|row| {
            row.as_array()
                .map(|cells| cells.iter().map(|cell| cell.as_bool().unwrap_or(false)).collect())
        })
        .collect::<Option<Vec<Vec<bool>>>>()?;
    Some(Pattern::from_rows(rows))
}

/// Resizes a valid pattern to `target_size`×`target_size`, keeping the
/// overlapping top-left region and turning every other cell off.
pub fn normalize_pattern(pattern: &Pattern, target_size: usize) -> Option<Pattern> {
    if !pattern.is_valid() || target_size == 0 {
        return None;
    }
    if pattern.size() == target_size {
        return Some(pattern.clone());
    }

    let overlap = pattern.size().min(target_size);
    let mut normalized = Pattern::empty(target_size);
    for (row, cells) in pattern.rows().iter().take(overlap).enumerate() {
        for (col, &cell) in cells.iter().take(overlap).enumerate() {
            normalized.set(row, col, cell);
        }
    }
    Some(normalized)
}

/// [`normalize_pattern`] for untyped host data.
pub fn normalize_pattern_value(candidate: &Value, target_size: usize) -> Option<Pattern> {
    pattern_from_value(candidate).and_then(|pattern| normalize_pattern(&pattern, target_size))
}

/// Packs the cells row-major, most significant bit first, eight per byte, and
/// base64-encodes the bytes. The final byte is zero-padded.
pub fn compress_pattern(pattern: &Pattern) -> String {
    let cells: Vec<bool> = pattern.rows().iter().flatten().copied().collect();
    let bytes: Vec<u8> = cells
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (bit, &on)| if on { byte | (0x80 >> bit) } else { byte })
        })
        .collect();
    BASE64.encode(bytes)
}

/// Inverse of [`compress_pattern`]. Reads exactly `size * size` bits; bits
/// beyond a truncated payload read as off. `None` on malformed base64.
pub fn decompress_pattern(compressed: &str, size: usize) -> Option<Pattern> {
    if size == 0 {
        return None;
    }
    let bytes = match BASE64.decode(compressed.trim()) {
        Ok(bytes) => bytes,
        Err(err) => {
            trace!("Rejecting compressed pattern: {}", err);
            return None;
        }
    };

    let bit_at = |index: usize| {
        bytes
            .get(index / 8)
            .is_some_and(|byte| byte & (0x80 >> (index % 8)) != 0)
    };
    let rows = (0..size)
        .map(|row| (0..size).map(|col| bit_at(row * size + col)).collect())
        .collect();
    Some(Pattern::from_rows(rows))
}

/// Compressed payload with its side length carried alongside, as the editor
/// export stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedPattern {
    pub data: String,
    pub size: usize,
}

impl CompressedPattern {
    /// `None` for a pattern that is not square.
    pub fn encode(pattern: &Pattern) -> Option<Self> {
        pattern.is_valid().then(|| CompressedPattern {
            data: compress_pattern(pattern),
            size: pattern.size(),
        })
    }

    pub fn decode(&self) -> Option<Pattern> {
        decompress_pattern(&self.data, self.size)
    }
}

/// Renders one line per row, `█` for on and `░` for off.
pub fn pattern_to_string(pattern: &Pattern) -> String {
    pattern
        .rows()
        .iter()
        .map(|row| row.iter().map(|&on| if on { CELL_ON } else { CELL_OFF }).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses the text form. Accepts `█`, `1`, `#` as on and `░`, `0`, `.` as
/// off; needs exactly `size` lines of `size` glyphs.
pub fn string_to_pattern(text: &str, size: usize) -> Option<Pattern> {
    let lines: Vec<&str> = text.trim().lines().collect();
    if size == 0 || lines.len() != size {
        return None;
    }

    let mut rows = Vec::with_capacity(size);
    for line in lines {
        let row = line
            .chars()
            .map(|glyph| match glyph {
                CELL_ON | '1' | '#' => Some(true),
                CELL_OFF | '0' | '.' => Some(false),
                _ => None,
            })
            .collect::<Option<Vec<bool>>>()?;
        if row.len() != size {
            return None;
        }
        rows.push(row);
    }
    Some(Pattern::from_rows(rows))
}
