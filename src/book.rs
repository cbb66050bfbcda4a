//! SGF opening-book loading.
//!
//! A narrow hand-rolled scanner reading only the properties Badank needs
//! (`SZ`, `KM`, ordered `B`/`W` moves) — matching the reference
//! implementation's own minimal parser (`sgf.cpp`) rather than pulling in a
//! general-purpose SGF library for a few property reads.

use std::fs;
use std::path::Path;

use crate::engine::Color;
use crate::error::{BadankError, Result};

#[derive(Debug, Clone)]
pub struct BookEntry {
    pub dim: u32,
    pub komi: f64,
    /// Ordered moves as (color, col_index, row_index), zero-based SGF
    /// coordinates; `None` coordinates denote a pass.
    pub moves: Vec<(Color, Option<(u8, u8)>)>,
}

/// Loads every `*.sgf` file directly inside `dir` into a `BookEntry`.
pub fn load_book(dir: &Path) -> Result<Vec<BookEntry>> {
    let mut entries = Vec::new();

    for dir_entry in fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        let path = dir_entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sgf") {
            continue;
        }
        let text = fs::read_to_string(&path)?;
        entries.push(parse_sgf_opening(&text)?);
    }

    Ok(entries)
}

fn parse_sgf_opening(text: &str) -> Result<BookEntry> {
    let mut dim = 19u32;
    let mut komi = 0.0f64;
    let mut moves = Vec::new();

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == 'S' && chars.get(i + 1) == Some(&'Z') {
            let (value, next) = read_bracket_value(&chars, i + 2)?;
            dim = value.parse().unwrap_or(19);
            i = next;
        } else if c == 'K' && chars.get(i + 1) == Some(&'M') {
            let (value, next) = read_bracket_value(&chars, i + 2)?;
            komi = value.parse().unwrap_or(0.0);
            i = next;
        } else if (c == 'B' || c == 'W') && chars.get(i + 1) == Some(&'[') {
            let color = if c == 'B' { Color::Black } else { Color::White };
            let (value, next) = read_bracket_value(&chars, i + 1)?;
            if value.is_empty() {
                moves.push((color, None));
            } else {
                let mut vchars = value.chars();
                let col = vchars
                    .next()
                    .ok_or_else(|| BadankError::Game("malformed SGF move".to_string()))?;
                let row = vchars
                    .next()
                    .ok_or_else(|| BadankError::Game("malformed SGF move".to_string()))?;
                let col_index = col.to_ascii_uppercase() as u8 - b'A';
                let row_index = row.to_ascii_uppercase() as u8 - b'A';
                moves.push((color, Some((col_index, row_index))));
            }
            i = next;
        } else {
            i += 1;
        }
    }

    Ok(BookEntry { dim, komi, moves })
}

/// Starting at the `[` immediately following a property identifier,
/// returns the bracketed value and the index just past the closing `]`.
fn read_bracket_value(chars: &[char], bracket_start: usize) -> Result<(String, usize)> {
    if chars.get(bracket_start) != Some(&'[') {
        return Err(BadankError::Game("expected '[' in SGF property".to_string()));
    }
    let mut end = bracket_start + 1;
    let mut value = String::new();
    while end < chars.len() && chars[end] != ']' {
        value.push(chars[end]);
        end += 1;
    }
    if end >= chars.len() {
        return Err(BadankError::Game("unterminated SGF property".to_string()));
    }
    Ok((value, end + 1))
}
