//! Configuration loading.
//!
//! The tournament is configured by a TOML file (default path `badank.cfg`),
//! deserialised with `serde`. This replaces the reference implementation's
//! libconfig DSL with an idiomatic Rust equivalent while preserving every
//! key from spec §6.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BadankError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub command: String,
    pub dir: Option<PathBuf>,
    pub alt_name: Option<String>,
    #[serde(default)]
    pub target: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level_screen: LogLevel,
    #[serde(default = "default_log_level")]
    pub log_level_file: LogLevel,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    pub engines: Vec<EngineConfig>,
    pub scorer_command: String,
    pub scorer_dir: Option<PathBuf>,

    #[serde(default)]
    pub pgn_file: Option<PathBuf>,
    #[serde(default)]
    pub sgf_file: Option<PathBuf>,

    pub concurrency: usize,
    pub n_games: u32,
    pub board_size: u32,

    pub main_time: u64,
    pub byo_yomi_time: u64,
    pub byo_yomi_stones: u32,

    #[serde(default)]
    pub n_random_stones: u32,
    pub komi: f64,

    #[serde(default)]
    pub sgf_book_path: Option<PathBuf>,
}

fn default_log_level() -> LogLevel {
    LogLevel::Warning
}

fn default_log_file() -> PathBuf {
    PathBuf::from("badank.log")
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            BadankError::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.engines.len() < 2 {
            return Err(BadankError::Config(
                "at least two engines are required".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(BadankError::Config("concurrency must be >= 1".to_string()));
        }
        if self.n_games == 0 {
            return Err(BadankError::Config("n_games must be >= 1".to_string()));
        }
        if !(2..=25).contains(&self.board_size) {
            return Err(BadankError::Config(
                "board_size must be between 2 and 25".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether any engine descriptor is a gauntlet target.
    pub fn has_targets(&self) -> bool {
        self.engines.iter().any(|e| e.target)
    }
}
