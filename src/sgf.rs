//! SGF and PGN game record output.
//!
//! Each finished game is appended as one SGF block and, if configured, one
//! PGN block, under a single mutex across all workers — files are reopened
//! in append mode on every write so a crash loses at most the in-flight
//! record (spec §4.4 step 4).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::engine::Color;
use crate::error::Result;

/// One completed game, ready to be serialised.
pub struct GameRecord {
    pub white_name: String,
    pub black_name: String,
    pub dim: u32,
    pub komi: f64,
    pub date: String,
    /// The pairing's position in the batch, rendered into the SGF header's
    /// `C[...]` meta comment (`original_source/main.cpp`'s `"%d> "` tag).
    pub sequence: u64,
    /// Upper-cased result string, e.g. `B+RESIGN`, `W+12.5`, `DRAW`.
    pub outcome: String,
    /// SGF-encoded moves, in play order: `Some(vertex)` or `None` for pass.
    pub moves: Vec<(Color, Option<String>)>,
    pub anomaly: Option<String>,
    pub random_stones_note: Option<String>,
}

pub struct RecordWriter {
    sgf_file: Option<PathBuf>,
    pgn_file: Option<PathBuf>,
    lock: Mutex<()>,
}

impl RecordWriter {
    pub fn new(sgf_file: Option<PathBuf>, pgn_file: Option<PathBuf>) -> Self {
        Self {
            sgf_file,
            pgn_file,
            lock: Mutex::new(()),
        }
    }

    pub fn write(&self, record: &GameRecord) -> Result<()> {
        let _guard = self.lock.lock().unwrap();

        if let Some(path) = &self.sgf_file {
            append(path, &render_sgf(record))?;
        }
        if let Some(path) = &self.pgn_file {
            append(path, &render_pgn(record))?;
        }

        Ok(())
    }
}

fn append(path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

fn render_sgf(record: &GameRecord) -> String {
    let mut moves = String::new();
    for (color, vertex) in &record.moves {
        let letter = match color {
            Color::Black => 'B',
            Color::White => 'W',
        };
        match vertex {
            Some(v) => moves.push_str(&format!(";{letter}[{v}]")),
            None => moves.push_str(&format!(";{letter}[]")),
        }
    }

    let mut comments = String::new();
    if let Some(anomaly) = &record.anomaly {
        comments.push_str(&format!(";C[{anomaly}]"));
    }
    if let Some(note) = &record.random_stones_note {
        comments.push_str(&format!(";C[{note}]"));
    }

    format!(
        "(;AP[Badank]DT[{date}]GM[1]KM[{komi}]SZ[{dim}]PW[{white}]\nPB[{black}]\nRE[{outcome}]\nC[{sequence}> ]RU[Tromp/Taylor]\n({moves}{comments})\n)\n",
        date = record.date,
        komi = record.komi,
        dim = record.dim,
        white = record.white_name,
        black = record.black_name,
        outcome = record.outcome,
        sequence = record.sequence,
        moves = moves,
        comments = comments,
    )
}

/// Maps a spec outcome string (`B+...`, `W+...`, `Draw`) to a PGN result
/// token. PGN lists White's score first, so Black winning is `"0-1"` and
/// White winning is `"1-0"` (`original_source/main.cpp`'s `str_toupper`
/// result dispatch, lines 468-482).
fn pgn_result(outcome: &str) -> &'static str {
    if outcome.starts_with("B+") {
        "0-1"
    } else if outcome.starts_with("W+") {
        "1-0"
    } else {
        "1/2-1/2"
    }
}

fn render_pgn(record: &GameRecord) -> String {
    let result = pgn_result(&record.outcome);
    format!(
        "[White \"{white}\"]\n[Black \"{black}\"]\n[Result \"{result}\"]\n\n{result}\n\n",
        white = record.white_name,
        black = record.black_name,
        result = result,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> GameRecord {
        GameRecord {
            white_name: "EngineA".to_string(),
            black_name: "EngineB".to_string(),
            dim: 19,
            komi: 7.5,
            date: "2026-07-31".to_string(),
            sequence: 3,
            outcome: "B+RESIGN".to_string(),
            moves: vec![
                (Color::Black, Some("ia".to_string())),
                (Color::White, None),
            ],
            anomaly: None,
            random_stones_note: None,
        }
    }

    #[test]
    fn sgf_renders_moves_and_pass() {
        let sgf = render_sgf(&sample_record());
        assert!(sgf.contains("B[ia]"));
        assert!(sgf.contains("W[]"));
        assert!(sgf.contains("RE[B+RESIGN]"));
        assert!(sgf.contains("C[3> ]"));
        assert!(sgf.contains("RU[Tromp/Taylor]"));
    }

    #[test]
    fn pgn_result_matches_outcome_prefix() {
        assert_eq!(pgn_result("B+RESIGN"), "0-1");
        assert_eq!(pgn_result("W+12.5"), "1-0");
        assert_eq!(pgn_result("DRAW"), "1/2-1/2");
    }
}
