//! Game driver (L2a): plays one complete game and classifies its outcome.
//!
//! No internal board model is kept — the scorer is the sole legality
//! authority (spec's Non-goal: "does not validate board legality
//! independently"). Random-stone seeding tracks only which intersections it
//! has already picked, to keep samples distinct; it does not otherwise
//! model the board.

use std::collections::HashSet;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use crate::book::BookEntry;
use crate::coords;
use crate::engine::{Color, GtpEngine, TextChannel};
use crate::time_control::{MoveTiming, TimeTracker};

/// Upper bound on how long a single `genmove` read may block, independent of
/// the logical game clock enforced by `TimeTracker` below it.
const GENMOVE_IO_TIMEOUT_MS: u64 = 120_000;
const RANDOM_SEED_MAX_ATTEMPTS: u32 = 50;

pub struct GameSetup<'a> {
    pub dim: u32,
    pub komi: f64,
    pub main_time_s: u64,
    pub byo_yomi_time_s: u64,
    pub byo_yomi_stones: u32,
    pub book: Option<&'a [BookEntry]>,
    pub n_random_stones: u32,
}

/// One completed (or faulted) game.
pub struct GameResult {
    /// `B+<...>`, `W+<...>`, `Draw`, or `?` on protocol failure.
    pub outcome: String,
    /// Set only for driver-classified definite endings (resign/time/illegal);
    /// `None` for scorer-arbitrated (two-pass) endings or faults. Values are
    /// color-relative, e.g. `"black resign"`, `"white out of time"`.
    pub category: Option<String>,
    /// Ordered SGF-coordinate moves: `Some(vertex)` or `None` for pass.
    pub moves: Vec<(Color, Option<String>)>,
    pub anomaly: Option<String>,
    pub random_stones_note: Option<String>,
}

impl GameResult {
    fn fault() -> Self {
        Self {
            outcome: "?".to_string(),
            category: None,
            moves: Vec::new(),
            anomaly: None,
            random_stones_note: None,
        }
    }
}

pub fn play_game<C: TextChannel>(
    black: &mut GtpEngine<C>,
    white: &mut GtpEngine<C>,
    scorer: &mut GtpEngine<C>,
    setup: &GameSetup,
) -> GameResult {
    if black.clear_board().is_err() || white.clear_board().is_err() || scorer.clear_board().is_err() {
        return GameResult::fault();
    }
    if black.board_size(setup.dim).is_err()
        || white.board_size(setup.dim).is_err()
        || scorer.board_size(setup.dim).is_err()
    {
        return GameResult::fault();
    }

    let mut moves: Vec<(Color, Option<String>)> = Vec::new();
    let mut random_stones_note = None;

    if let Some(book) = setup.book {
        if !book.is_empty() {
            let entry = book
                .choose(&mut rand::thread_rng())
                .expect("non-empty book");
            match replay_book(black, white, scorer, entry) {
                Ok(replayed) => moves.extend(replayed),
                Err(()) => return GameResult::fault(),
            }
        }
    } else if setup.n_random_stones > 0 {
        match seed_random_stones(black, white, scorer, setup.dim, setup.n_random_stones) {
            Ok(seeded) => {
                random_stones_note = Some(format!(
                    "Initial {n} black and {n} white stones were placed randomly by Badank",
                    n = setup.n_random_stones
                ));
                moves.extend(seeded);
            }
            Err(()) => return GameResult::fault(),
        }
    }

    // Komi is set on the two contestants only, not the scorer — see
    // DESIGN.md's Open Question #6 (matches original_source/main.cpp).
    black.komi(setup.komi).ok();
    white.komi(setup.komi).ok();

    let black_supports_time_settings = black.has_command("time_settings");
    let white_supports_time_settings = white.has_command("time_settings");
    let black_supports_time_left = black.has_command("time_left");
    let white_supports_time_left = white.has_command("time_left");

    if black_supports_time_settings
        && black
            .time_settings(setup.main_time_s, setup.byo_yomi_time_s, setup.byo_yomi_stones)
            .is_err()
    {
        return GameResult::fault();
    }
    if white_supports_time_settings
        && white
            .time_settings(setup.main_time_s, setup.byo_yomi_time_s, setup.byo_yomi_stones)
            .is_err()
    {
        return GameResult::fault();
    }

    let mut clocks = TimeTracker::new(setup.main_time_s, setup.byo_yomi_time_s, setup.byo_yomi_stones);
    let mut color = Color::Black;
    let mut consecutive_pass = (false, false); // (black, white)
    let mut outcome: Option<String> = None;
    let mut category: Option<String> = None;
    let mut anomaly: Option<String> = None;

    loop {
        let is_black = color == Color::Black;
        let supports_time_left = if is_black { black_supports_time_left } else { white_supports_time_left };

        if supports_time_left {
            let remaining_s = clocks.remaining_secs(is_black);
            let stones = clocks.stones_to_do(is_black);
            let result = if is_black {
                black.time_left(color, remaining_s, stones)
            } else {
                white.time_left(color, remaining_s, stones)
            };
            if result.is_err() {
                outcome = Some("?".to_string());
                break;
            }
        }

        let started = Instant::now();
        let move_result = if is_black {
            black.genmove(color, Some(GENMOVE_IO_TIMEOUT_MS))
        } else {
            white.genmove(color, Some(GENMOVE_IO_TIMEOUT_MS))
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mv = match move_result {
            Ok(mv) => mv,
            Err(_) => {
                outcome = Some("?".to_string());
                break;
            }
        };

        let timing = clocks.account_move(is_black, elapsed_ms);
        if matches!(timing, MoveTiming::Flagged) {
            outcome = Some(format!("{}+Time", color.opponent().gtp_letter().to_ascii_uppercase()));
            category = Some(format!("{} out of time", color_name(color)));
            break;
        }

        if mv == "resign" {
            outcome = Some(format!("{}+Resign", color.opponent().gtp_letter().to_ascii_uppercase()));
            category = Some(format!("{} resign", color_name(color)));
            break;
        }

        if scorer.play(color, &mv).is_err() {
            outcome = Some(format!("{}+Illegal", color.opponent().gtp_letter().to_ascii_uppercase()));
            category = Some(format!("{} illegal move", color_name(color)));
            break;
        }

        let opponent_ref_rejected = if is_black {
            white.play(color, &mv).is_err()
        } else {
            black.play(color, &mv).is_err()
        };
        if opponent_ref_rejected {
            warn!(move_ = %mv, "opponent rejected scorer-accepted move");
            anomaly.get_or_insert_with(|| "opponent disagreed with scorer on move legality".to_string());
        }

        if mv == "pass" {
            moves.push((color, None));
            if is_black {
                consecutive_pass.0 = true;
            } else {
                consecutive_pass.1 = true;
            }
            if consecutive_pass.0 && consecutive_pass.1 {
                break;
            }
        } else {
            consecutive_pass = (false, false);
            match coords::gtp_vertex_to_sgf(&mv) {
                Ok(sgf_vertex) => moves.push((color, Some(sgf_vertex))),
                Err(_) => moves.push((color, Some(mv.clone()))),
            }
        }

        color = color.opponent();
    }

    let outcome = match outcome {
        Some(outcome) => outcome,
        None => match scorer.final_score() {
            Ok(score) => {
                black.final_score().ok();
                white.final_score().ok();
                score
            }
            Err(_) => "?".to_string(),
        },
    };

    GameResult {
        outcome,
        category,
        moves,
        anomaly,
        random_stones_note,
    }
}

fn color_name(color: Color) -> &'static str {
    match color {
        Color::Black => "black",
        Color::White => "white",
    }
}

fn replay_book<C: TextChannel>(
    black: &mut GtpEngine<C>,
    white: &mut GtpEngine<C>,
    scorer: &mut GtpEngine<C>,
    entry: &BookEntry,
) -> Result<Vec<(Color, Option<String>)>, ()> {
    let mut moves = Vec::new();
    for (color, coord) in &entry.moves {
        match coord {
            None => {
                if black.play(*color, "pass").is_err()
                    || white.play(*color, "pass").is_err()
                    || scorer.play(*color, "pass").is_err()
                {
                    return Err(());
                }
                moves.push((*color, None));
            }
            Some((col, row)) => {
                let vertex = coords::indices_to_gtp_vertex(*col, *row);
                if black.play(*color, &vertex).is_err()
                    || white.play(*color, &vertex).is_err()
                    || scorer.play(*color, &vertex).is_err()
                {
                    return Err(());
                }
                let sgf_vertex = format!(
                    "{}{}",
                    coords::index_to_sgf_col(*col),
                    coords::index_to_sgf_col(*row)
                );
                moves.push((*color, Some(sgf_vertex)));
            }
        }
    }
    Ok(moves)
}

fn seed_random_stones<C: TextChannel>(
    black: &mut GtpEngine<C>,
    white: &mut GtpEngine<C>,
    scorer: &mut GtpEngine<C>,
    dim: u32,
    n_random_stones: u32,
) -> Result<Vec<(Color, Option<String>)>, ()> {
    let total = n_random_stones * 2;
    let mut rng = rand::thread_rng();

    for _attempt in 0..RANDOM_SEED_MAX_ATTEMPTS {
        let mut occupied: HashSet<(u8, u8)> = HashSet::new();
        let mut moves = Vec::new();
        let mut retry = false;

        for i in 0..total {
            let color = if i % 2 == 0 { Color::Black } else { Color::White };

            let (col, row) = loop {
                let col = rng.gen_range(0..dim as u8);
                let row = rng.gen_range(0..dim as u8);
                if !occupied.contains(&(col, row)) {
                    break (col, row);
                }
            };
            occupied.insert((col, row));

            let vertex = coords::indices_to_gtp_vertex(col, row);
            let rejected = scorer.play(color, &vertex).is_err()
                || black.play(color, &vertex).is_err()
                || white.play(color, &vertex).is_err();

            if rejected {
                if i < 2 {
                    return Err(());
                }
                retry = true;
                break;
            }

            let sgf_vertex = format!("{}{}", coords::index_to_sgf_col(col), coords::index_to_sgf_col(row));
            moves.push((color, Some(sgf_vertex)));
        }

        if !retry {
            return Ok(moves);
        }

        if black.clear_board().is_err() || white.clear_board().is_err() || scorer.clear_board().is_err() {
            return Err(());
        }
        if black.board_size(dim).is_err() || white.board_size(dim).is_err() || scorer.board_size(dim).is_err() {
            return Err(());
        }
    }

    Err(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::FakeChannel;

    fn engine(responses: Vec<Vec<&str>>) -> GtpEngine<FakeChannel> {
        let responses = responses
            .into_iter()
            .map(|lines| lines.into_iter().map(String::from).collect())
            .collect();
        GtpEngine::new(FakeChannel::new(responses), "fake".to_string(), None)
    }

    fn setup() -> GameSetup<'static> {
        GameSetup {
            dim: 9,
            komi: 7.5,
            main_time_s: 0,
            byo_yomi_time_s: 0,
            byo_yomi_stones: 0,
            book: None,
            n_random_stones: 0,
        }
    }

    #[test]
    fn two_passes_end_the_game_via_scorer() {
        let mut black = engine(vec![
            vec!["= ", ""],      // clear_board
            vec!["= ", ""],      // boardsize
            vec!["= ", ""],      // komi
            vec!["? "],          // list_commands time_settings -> unsupported
            vec!["? "],          // list_commands time_left -> unsupported
            vec!["= pass", ""],  // genmove black
            vec!["= ", ""],      // play opponent move relayed to black
            vec!["= 0", ""],     // final_score (logging only)
        ]);
        let mut white = engine(vec![
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["? "],
            vec!["? "],
            vec!["= ", ""],      // play relayed black move
            vec!["= pass", ""],  // genmove white
            vec!["= 0", ""],
        ]);
        let mut scorer = engine(vec![
            vec!["= ", ""],       // clear_board
            vec!["= ", ""],       // boardsize
            vec!["= ", ""],       // play black pass
            vec!["= ", ""],       // play white pass
            vec!["= B+3.5", ""],  // final_score
        ]);

        let result = play_game(&mut black, &mut white, &mut scorer, &setup());
        assert_eq!(result.outcome, "B+3.5");
        assert!(result.category.is_none());
        assert_eq!(result.moves, vec![(Color::Black, None), (Color::White, None)]);
    }

    #[test]
    fn resignation_ends_the_game_immediately() {
        let mut black = engine(vec![
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["? "],
            vec!["? "],
            vec!["= resign", ""],
        ]);
        let mut white = engine(vec![
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["? "],
            vec!["? "],
        ]);
        let mut scorer = engine(vec![vec!["= ", ""], vec!["= ", ""]]);

        let result = play_game(&mut black, &mut white, &mut scorer, &setup());
        assert_eq!(result.outcome, "W+Resign");
        assert_eq!(result.category.as_deref(), Some("black resign"));
    }

    #[test]
    fn scorer_rejection_is_illegal_move() {
        let mut black = engine(vec![
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["? "],
            vec!["? "],
            vec!["= z9", ""],
        ]);
        let mut white = engine(vec![
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["? "],
            vec!["? "],
        ]);
        let mut scorer = engine(vec![vec!["= ", ""], vec!["= ", ""], vec!["? illegal"]]);

        let result = play_game(&mut black, &mut white, &mut scorer, &setup());
        assert_eq!(result.outcome, "W+Illegal");
        assert_eq!(result.category.as_deref(), Some("black illegal move"));
    }

    #[test]
    fn main_time_expiry_flags_the_mover() {
        // byo-yomi is effectively disabled (0 stones per period), so a
        // main-time underflow on the very first move is an immediate loss,
        // not a transition into a byo-yomi period that can never flag.
        let setup = GameSetup {
            dim: 9,
            komi: 7.5,
            main_time_s: 1,
            byo_yomi_time_s: 0,
            byo_yomi_stones: 0,
            book: None,
            n_random_stones: 0,
        };

        let mut black = GtpEngine::new(
            FakeChannel::with_read_delay(
                vec![
                    vec!["= ".into(), "".into()],   // clear_board
                    vec!["= ".into(), "".into()],   // boardsize
                    vec!["= ".into(), "".into()],   // komi
                    vec!["? ".into()],                // has_command(time_settings)
                    vec!["? ".into()],                // has_command(time_left)
                    vec!["= e5".into(), "".into()],   // genmove: takes longer than main_time
                ],
                600,
            ),
            "black".to_string(),
            None,
        );
        let mut white = engine(vec![
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["= ", ""],
            vec!["? "],
            vec!["? "],
        ]);
        let mut scorer = engine(vec![vec!["= ", ""], vec!["= ", ""]]);

        let result = play_game(&mut black, &mut white, &mut scorer, &setup);
        assert_eq!(result.outcome, "W+Time");
        assert_eq!(result.category.as_deref(), Some("black out of time"));
    }

    #[test]
    fn clear_board_fault_yields_unknown_outcome() {
        let mut black = engine(vec![vec!["? "]]);
        let mut white = engine(vec![vec!["= ", ""]]);
        let mut scorer = engine(vec![vec!["= ", ""]]);

        let result = play_game(&mut black, &mut white, &mut scorer, &setup());
        assert_eq!(result.outcome, "?");
        assert!(result.category.is_none());
    }
}
