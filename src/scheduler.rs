//! Batch scheduler (L2b): pairing generation, worker pool, graceful stop,
//! rating/statistics aggregation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use skillratings::glicko2::Glicko2Rating;
use tracing::{info, warn};

use crate::book::BookEntry;
use crate::colors::ThemeColor;
use crate::config::{Config, EngineConfig};
use crate::driver::{self, GameSetup};
use crate::engine::GtpEngine;
use crate::error::Result;
use crate::queue::WorkQueue;
use crate::rating::PlayerRating;
use crate::sgf::{GameRecord, RecordWriter};
use crate::stats::Statistics;

/// One engine's static descriptor plus its mutable, shared-across-games
/// rating. One exists per engine for the lifetime of the batch.
pub struct EngineDescriptor {
    pub config: EngineConfig,
    pub rating: PlayerRating,
    display_name: Mutex<Option<String>>,
}

impl EngineDescriptor {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            rating: PlayerRating::new(),
            display_name: Mutex::new(None),
        }
    }

    pub fn display_name(&self) -> String {
        if let Some(name) = self.display_name.lock().unwrap().clone() {
            return name;
        }
        self.config
            .alt_name
            .clone()
            .unwrap_or_else(|| self.config.command.clone())
    }

    fn record_resolved_name(&self, name: String) {
        *self.display_name.lock().unwrap() = Some(name);
    }
}

#[derive(Clone, Copy)]
struct Pairing {
    black_idx: usize,
    white_idx: usize,
    sequence: u64,
}

enum WorkItem {
    Play(Pairing),
    Stop,
}

/// Generates pairings per spec's round-robin / gauntlet rule.
fn generate_pairings(engines: &[EngineConfig], n_games: u32) -> Vec<Pairing> {
    let mut pairings = Vec::new();
    let mut sequence = 0u64;
    let targets: Vec<usize> = engines
        .iter()
        .enumerate()
        .filter(|(_, e)| e.target)
        .map(|(i, _)| i)
        .collect();

    if targets.is_empty() {
        for _ in 0..n_games {
            for a in 0..engines.len() {
                for b in 0..engines.len() {
                    if a != b {
                        pairings.push(Pairing { black_idx: a, white_idx: b, sequence });
                        sequence += 1;
                    }
                }
            }
        }
    } else {
        let non_targets: Vec<usize> = (0..engines.len()).filter(|i| !targets.contains(i)).collect();
        for _ in 0..n_games {
            for &t in &targets {
                for &a in &non_targets {
                    pairings.push(Pairing { black_idx: t, white_idx: a, sequence });
                    sequence += 1;
                    pairings.push(Pairing { black_idx: a, white_idx: t, sequence });
                    sequence += 1;
                }
            }
        }
    }

    pairings
}

/// Maps a completed game's outcome string onto the color-relative stats
/// bucket recorded for each side (spec §3/§4.4 step 5, §8 boundary scenarios).
fn categories_for(outcome: &str, driver_category: Option<&str>) -> Option<(String, String)> {
    if outcome == "?" {
        return None;
    }
    if let Some(cat) = driver_category {
        if cat.starts_with("black") {
            Some((cat.to_string(), "white win".to_string()))
        } else {
            Some(("black win".to_string(), cat.to_string()))
        }
    } else if outcome.starts_with("B+") {
        Some(("black win".to_string(), "white loss".to_string()))
    } else if outcome.starts_with("W+") {
        Some(("black loss".to_string(), "white win".to_string()))
    } else {
        Some(("draw".to_string(), "draw".to_string()))
    }
}

/// Maps an outcome string onto the Glicko score pair `(black, white)`,
/// or `None` for a `?` protocol-fault outcome (no rating update; spec §4.4
/// step 3 / §7 item 2).
fn glicko_scores(outcome: &str) -> Option<(f64, f64)> {
    if outcome == "?" {
        None
    } else if outcome.starts_with("B+") {
        Some((1.0, 0.0))
    } else if outcome.starts_with("W+") {
        Some((0.0, 1.0))
    } else {
        Some((0.5, 0.5))
    }
}

struct Batch {
    descriptors: Vec<EngineDescriptor>,
    book: Vec<BookEntry>,
    record_writer: RecordWriter,
    stats: Statistics,
    stop_flag: Arc<AtomicBool>,
    progress: ProgressBar,
}

fn build_progress_bar(total_games: u64) -> ProgressBar {
    let bar = ProgressBar::new(total_games);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} games ({eta})") {
        bar.set_style(style);
    }
    bar
}

/// Runs the whole tournament: builds the pairing queue, spawns `concurrency`
/// workers, aggregates ratings and statistics, and returns the finished
/// descriptors (for the final rating table) and run statistics.
pub fn play_batch(config: &Config, stop_flag: Arc<AtomicBool>) -> Result<(Vec<EngineDescriptor>, Statistics)> {
    let book = match &config.sgf_book_path {
        Some(path) => crate::book::load_book(path)?,
        None => Vec::new(),
    };

    let descriptors: Vec<EngineDescriptor> = config
        .engines
        .iter()
        .cloned()
        .map(EngineDescriptor::new)
        .collect();

    let pairings = generate_pairings(&config.engines, config.n_games);

    let batch = Arc::new(Batch {
        descriptors,
        book,
        record_writer: RecordWriter::new(config.sgf_file.clone(), config.pgn_file.clone()),
        stats: Statistics::new(),
        stop_flag,
        progress: build_progress_bar(pairings.len() as u64),
    });

    let queue: Arc<WorkQueue<WorkItem>> = Arc::new(WorkQueue::new());
    for pairing in pairings {
        if batch.stop_flag.load(Ordering::SeqCst) {
            info!("stop requested, halting pairing generation");
            break;
        }
        queue.push(WorkItem::Play(pairing));
    }
    for _ in 0..config.concurrency {
        queue.push(WorkItem::Stop);
    }

    let mut handles = Vec::new();
    for worker_id in 0..config.concurrency {
        let queue = Arc::clone(&queue);
        let batch = Arc::clone(&batch);
        let config = config.clone();
        handles.push(thread::spawn(move || worker_loop(worker_id, &queue, &batch, &config)));
    }
    for handle in handles {
        let _ = handle.join();
    }
    batch.progress.finish_and_clear();

    let batch = Arc::try_unwrap(batch).unwrap_or_else(|arc| {
        // All worker threads have joined by this point, so this is purely
        // a defensive fallback (an Arc clone outliving join would be a bug).
        warn!("batch Arc had outstanding references after worker join");
        Batch {
            descriptors: Vec::new(),
            book: Vec::new(),
            record_writer: RecordWriter::new(None, None),
            stats: Statistics::new(),
            stop_flag: arc.stop_flag.clone(),
            progress: build_progress_bar(0),
        }
    });

    Ok((batch.descriptors, batch.stats))
}

fn worker_loop(worker_id: usize, queue: &WorkQueue<WorkItem>, batch: &Batch, config: &Config) {
    loop {
        if batch.stop_flag.load(Ordering::SeqCst) {
            info!(worker_id, "stop flag observed, worker exiting");
            return;
        }

        match queue.pop() {
            WorkItem::Stop => {
                info!(worker_id, "sentinel received, worker exiting");
                return;
            }
            WorkItem::Play(pairing) => run_one_game(worker_id, pairing, batch, config),
        }
    }
}

fn run_one_game(worker_id: usize, pairing: Pairing, batch: &Batch, config: &Config) {
    let black_desc = &batch.descriptors[pairing.black_idx];
    let white_desc = &batch.descriptors[pairing.white_idx];

    let mut black = match GtpEngine::spawn(
        &black_desc.config.command,
        black_desc.config.dir.as_deref(),
        black_desc.config.alt_name.clone(),
    ) {
        Ok(engine) => engine,
        Err(e) => {
            warn!(worker_id, sequence = pairing.sequence, error = %e, "failed to spawn black engine");
            batch.stats.record_fault(&format!("{} versus {}", black_desc.display_name(), white_desc.display_name()));
            return;
        }
    };
    let mut white = match GtpEngine::spawn(
        &white_desc.config.command,
        white_desc.config.dir.as_deref(),
        white_desc.config.alt_name.clone(),
    ) {
        Ok(engine) => engine,
        Err(e) => {
            warn!(worker_id, sequence = pairing.sequence, error = %e, "failed to spawn white engine");
            batch.stats.record_fault(&format!("{} versus {}", black_desc.display_name(), white_desc.display_name()));
            return;
        }
    };
    let mut scorer = match GtpEngine::spawn(&config.scorer_command, config.scorer_dir.as_deref(), None) {
        Ok(engine) => engine,
        Err(e) => {
            warn!(worker_id, error = %e, "failed to spawn scorer engine");
            batch.stats.record_fault(&format!("{} versus {}", black_desc.display_name(), white_desc.display_name()));
            return;
        }
    };

    let black_name = black.name();
    let white_name = white.name();
    black_desc.record_resolved_name(black_name.clone());
    white_desc.record_resolved_name(white_name.clone());

    let setup = GameSetup {
        dim: config.board_size,
        komi: config.komi,
        main_time_s: config.main_time,
        byo_yomi_time_s: config.byo_yomi_time,
        byo_yomi_stones: config.byo_yomi_stones,
        book: if batch.book.is_empty() { None } else { Some(&batch.book) },
        n_random_stones: config.n_random_stones,
    };

    info!(
        worker_id,
        sequence = pairing.sequence,
        black = %black_name,
        white = %white_name,
        "starting game"
    );

    let result = driver::play_game(&mut black, &mut white, &mut scorer, &setup);

    let pair_name = format!("{black_name} versus {white_name}");
    match glicko_scores(&result.outcome) {
        Some((black_score, white_score)) => {
            let black_snapshot = black_desc.rating.snapshot();
            let white_snapshot = white_desc.rating.snapshot();
            black_desc.rating.update(white_snapshot, black_score);
            black_desc.rating.apply();
            white_desc.rating.update(black_snapshot, white_score);
            white_desc.rating.apply();
            batch.stats.record_ok(0);
        }
        None => {
            batch.stats.record_fault(&pair_name);
        }
    }

    if let Some((black_category, white_category)) = categories_for(&result.outcome, result.category.as_deref()) {
        batch.stats.record_category(&black_name, &black_category);
        batch.stats.record_category(&white_name, &white_category);
    }

    let record = GameRecord {
        white_name: white_name.clone(),
        black_name: black_name.clone(),
        dim: config.board_size,
        komi: config.komi,
        date: chrono::Local::now().format("%Y-%m-%d").to_string(),
        sequence: pairing.sequence,
        outcome: result.outcome.to_ascii_uppercase(),
        moves: result.moves,
        anomaly: result.anomaly,
        random_stones_note: result.random_stones_note,
    };
    if let Err(e) = batch.record_writer.write(&record) {
        warn!(error = %e, "failed to write game record");
    }

    info!(
        worker_id,
        sequence = pairing.sequence,
        outcome = %result.outcome,
        "game finished"
    );
    batch.progress.inc(1);

    // `black`/`white`/`scorer` drop here; each releases its child process via
    // the quit/SIGTERM/SIGKILL escalation in `TextProgram`'s destructor.
    drop(black);
    drop(white);
    drop(scorer);
}

/// Prints the final rating table, grounded on the teacher's colored
/// terminal summary style.
pub fn print_ratings(descriptors: &[EngineDescriptor]) {
    println!("{}", "Final ratings".text().bold());
    let mut ranked: Vec<(&EngineDescriptor, Glicko2Rating)> =
        descriptors.iter().map(|d| (d, d.rating.snapshot())).collect();
    ranked.sort_by(|a, b| b.1.rating.partial_cmp(&a.1.rating).unwrap());

    for (desc, rating) in ranked {
        println!(
            "  {:<24} {:>8.1} (±{:.1})",
            desc.display_name().info(),
            rating.rating,
            rating.deviation
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_config(command: &str, target: bool) -> EngineConfig {
        EngineConfig {
            command: command.to_string(),
            dir: None,
            alt_name: None,
            target,
        }
    }

    #[test]
    fn round_robin_pairs_every_ordered_pair_n_times() {
        let engines = vec![
            engine_config("a", false),
            engine_config("b", false),
            engine_config("c", false),
        ];
        let pairings = generate_pairings(&engines, 2);
        assert_eq!(pairings.len(), 3 * 2 * 2);

        let count_ab = pairings
            .iter()
            .filter(|p| p.black_idx == 0 && p.white_idx == 1)
            .count();
        assert_eq!(count_ab, 2);
    }

    #[test]
    fn gauntlet_mode_pairs_targets_both_colors() {
        let engines = vec![
            engine_config("target", true),
            engine_config("a", false),
            engine_config("b", false),
        ];
        let pairings = generate_pairings(&engines, 1);
        // 2 non-targets x 2 colour orders x 1 target x 1 iteration.
        assert_eq!(pairings.len(), 4);
        assert!(pairings.iter().any(|p| p.black_idx == 0 && p.white_idx == 1));
        assert!(pairings.iter().any(|p| p.black_idx == 1 && p.white_idx == 0));
    }

    #[test]
    fn categories_attribute_resignation_to_loser() {
        let (black_cat, white_cat) = categories_for("W+Resign", Some("black resign")).unwrap();
        assert_eq!(black_cat, "black resign");
        assert_eq!(white_cat, "white win");
    }

    #[test]
    fn fault_outcome_has_no_category() {
        assert!(categories_for("?", None).is_none());
    }

    #[test]
    fn glicko_scores_map_outcome_prefixes() {
        assert_eq!(glicko_scores("B+Resign"), Some((1.0, 0.0)));
        assert_eq!(glicko_scores("W+12.5"), Some((0.0, 1.0)));
        assert_eq!(glicko_scores("?"), None);
    }
}
