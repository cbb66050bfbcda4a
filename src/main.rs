use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use badank::config::Config;
use badank::engine::GtpEngine;
use badank::error::Result;
use badank::scheduler::{self, print_ratings};

/// GTP tournament orchestration: round-robin or gauntlet matches, scored by
/// a reference engine, with Glicko-2 ratings and SGF/PGN output.
#[derive(Parser)]
#[command(name = "badank")]
struct Cli {
    /// Path to the tournament configuration file.
    #[arg(default_value = "badank.cfg")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli.config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &PathBuf) -> Result<()> {
    let config = Config::load(config_path)?;
    let _logging_guard = badank::logging::init(&config.log_file, config.log_level_screen, config.log_level_file)?;

    test_config(&config)?;

    let stop_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        info!("SIGINT received, requesting graceful shutdown");
        handler_flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| badank::error::BadankError::Config(format!("failed to install SIGINT handler: {e}")))?;

    info!(engines = config.engines.len(), n_games = config.n_games, "starting batch");
    let (descriptors, stats) = scheduler::play_batch(&config, stop_flag)?;

    print_ratings(&descriptors);
    stats.print_summary();

    Ok(())
}

/// Spawns every engine (and the scorer) once and asks `protocol_version`
/// with the 30 s startup timeout; any failure is fatal before the batch
/// starts (reproduces `original_source/main.cpp`'s `test_config`).
fn test_config(config: &Config) -> Result<()> {
    for engine_config in &config.engines {
        let mut engine = GtpEngine::spawn(&engine_config.command, engine_config.dir.as_deref(), None)?;
        engine.protocol_version().map_err(|e| {
            error!(command = %engine_config.command, error = %e, "engine failed preflight");
            e
        })?;
    }

    let mut scorer = GtpEngine::spawn(&config.scorer_command, config.scorer_dir.as_deref(), None)?;
    scorer.protocol_version().map_err(|e| {
        error!(command = %config.scorer_command, error = %e, "scorer failed preflight");
        e
    })?;

    Ok(())
}
