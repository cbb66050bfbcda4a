//! GTP <-> SGF coordinate conversion.
//!
//! GTP column letters skip `I` (to avoid confusion with `1`); SGF columns
//! are contiguous lowercase letters starting at `a`. See spec §4.3.

use crate::error::{BadankError, Result};

/// Parses a GTP column letter (case-insensitive, skipping `I`) into a
/// zero-based contiguous column index.
pub fn gtp_col_to_index(letter: char) -> Result<u8> {
    let upper = letter.to_ascii_uppercase();
    if !upper.is_ascii_uppercase() || upper == 'I' {
        return Err(BadankError::Game(format!("invalid GTP column: {letter}")));
    }
    let raw = upper as u8 - b'A';
    Ok(if upper >= 'J' { raw - 1 } else { raw })
}

/// Inverse of [`gtp_col_to_index`]: zero-based contiguous index to GTP letter.
pub fn index_to_gtp_col(index: u8) -> char {
    let raw = if index >= 8 { index + 1 } else { index };
    (b'A' + raw) as char
}

pub fn index_to_sgf_col(index: u8) -> char {
    (b'a' + index) as char
}

pub fn sgf_col_to_index(c: char) -> u8 {
    c as u8 - b'a'
}

/// Parses a GTP vertex like `"J1"` into zero-based `(col_index, row_index)`.
/// Does not accept `"pass"`/`"resign"` — callers filter those first.
pub fn gtp_vertex_to_indices(vertex: &str) -> Result<(u8, u8)> {
    let mut chars = vertex.chars();
    let col = chars
        .next()
        .ok_or_else(|| BadankError::Game("empty vertex".to_string()))?;
    let row_str: String = chars.collect();
    let row: u32 = row_str
        .parse()
        .map_err(|_| BadankError::Game(format!("invalid GTP row in vertex: {vertex}")))?;
    if row == 0 {
        return Err(BadankError::Game(format!("invalid GTP row in vertex: {vertex}")));
    }
    Ok((gtp_col_to_index(col)?, (row - 1) as u8))
}

/// Formats zero-based `(col_index, row_index)` as a GTP vertex.
pub fn indices_to_gtp_vertex(col_index: u8, row_index: u8) -> String {
    format!("{}{}", index_to_gtp_col(col_index), row_index + 1)
}

/// Converts a GTP vertex directly to its two-letter SGF encoding.
pub fn gtp_vertex_to_sgf(vertex: &str) -> Result<String> {
    let (col, row) = gtp_vertex_to_indices(vertex)?;
    Ok(format!("{}{}", index_to_sgf_col(col), index_to_sgf_col(row)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn j1_maps_to_ia() {
        // J1: GTP column J skips I, so J is contiguous index 8.
        assert_eq!(gtp_vertex_to_sgf("J1").unwrap(), "ia");
    }

    #[test]
    fn h_and_j_are_adjacent_indices() {
        assert_eq!(gtp_col_to_index('H').unwrap(), 7);
        assert_eq!(gtp_col_to_index('J').unwrap(), 8);
    }

    #[test]
    fn i_column_is_rejected() {
        assert!(gtp_col_to_index('I').is_err());
    }

    #[test]
    fn round_trips_across_board_sizes() {
        for dim in 2u8..=25 {
            for col in 0..dim {
                for row in 0..dim {
                    let vertex = indices_to_gtp_vertex(col, row);
                    let (back_col, back_row) = gtp_vertex_to_indices(&vertex).unwrap();
                    assert_eq!((col, row), (back_col, back_row));

                    let sgf = gtp_vertex_to_sgf(&vertex).unwrap();
                    assert_eq!(sgf.len(), 2);
                    let mut sgf_chars = sgf.chars();
                    let sgf_col = sgf_col_to_index(sgf_chars.next().unwrap());
                    let sgf_row = sgf_col_to_index(sgf_chars.next().unwrap());
                    assert_eq!((sgf_col, sgf_row), (col, row));
                }
            }
        }
    }
}
