//! GTP (Go Text Protocol) engine adapter (L1).
//!
//! This module provides the typed command interface over the raw subprocess
//! pipe, handling GTP request/response framing: `=`/`?` status prefixes,
//! blank-line-terminated responses, and multi-line continuation.

use std::path::Path;

use tracing::debug;

use crate::error::{BadankError, Result};
use crate::process::TextProgram;

const GTP_SUCCESS: char = '=';
const GTP_FAILURE: char = '?';

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const PROTOCOL_VERSION_TIMEOUT_MS: u64 = 30_000;

/// Abstraction over a line-oriented text channel to a GTP engine.
///
/// `TextProgram` is the real implementation; tests substitute an in-memory
/// fake so the driver can be exercised without spawning a subprocess.
pub trait TextChannel {
    fn write_line(&mut self, text: &str) -> Result<()>;
    fn read_line(&mut self, timeout_ms: Option<u64>) -> Result<Option<String>>;
}

impl TextChannel for TextProgram {
    fn write_line(&mut self, text: &str) -> Result<()> {
        TextProgram::write_line(self, text)
    }

    fn read_line(&mut self, timeout_ms: Option<u64>) -> Result<Option<String>> {
        TextProgram::read_line(self, timeout_ms)
    }
}

/// A GTP-speaking engine instance, created fresh for one game.
pub struct GtpEngine<C: TextChannel = TextProgram> {
    channel: C,
    /// Display-name override from the engine descriptor, if any.
    alt_name: Option<String>,
    /// Lazily resolved name (from GTP `name`, or the raw command line as a fallback).
    resolved_name: Option<String>,
    raw_command: String,
}

impl GtpEngine<TextProgram> {
    pub fn spawn(command: &str, dir: Option<&Path>, alt_name: Option<String>) -> Result<Self> {
        let channel = TextProgram::spawn(command, dir)?;
        Ok(Self::new(channel, command.to_string(), alt_name))
    }
}

impl<C: TextChannel> GtpEngine<C> {
    pub fn new(channel: C, raw_command: String, alt_name: Option<String>) -> Self {
        Self {
            channel,
            alt_name,
            resolved_name: None,
            raw_command,
        }
    }

    /// Write `command`, then collect the framed response as trimmed lines
    /// with the leading status character and separating space stripped
    /// from the first line. Returns `Err` on a `?` reply or I/O failure.
    fn request(&mut self, command: &str, timeout_ms: Option<u64>) -> Result<Vec<String>> {
        debug!(command, "> gtp");
        self.channel.write_line(command)?;

        let mut out = Vec::new();
        let mut first = true;

        loop {
            let line = self
                .channel
                .read_line(timeout_ms)?
                .ok_or_else(|| BadankError::Engine("engine closed the connection".to_string()))?;

            if line.is_empty() {
                break;
            }

            debug!(line = %line, "< gtp");

            if first {
                first = false;
                let mut chars = line.chars();
                match chars.next() {
                    Some(GTP_SUCCESS) => {
                        let rest = chars.as_str();
                        out.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
                    }
                    Some(GTP_FAILURE) => {
                        return Err(BadankError::Engine(format!(
                            "engine returned failure: {line}"
                        )));
                    }
                    _ => {
                        return Err(BadankError::Engine(format!(
                            "malformed GTP response: {line}"
                        )));
                    }
                }
            } else {
                out.push(line);
            }
        }

        Ok(out)
    }

    fn request_one(&mut self, command: &str, timeout_ms: Option<u64>) -> Result<String> {
        let mut lines = self.request(command, timeout_ms)?;
        Ok(lines.drain(..).next().unwrap_or_default())
    }

    pub fn protocol_version(&mut self) -> Result<String> {
        self.request_one("protocol_version", Some(PROTOCOL_VERSION_TIMEOUT_MS))
    }

    /// Resolve and cache the display name: the descriptor's alt-name if
    /// present, else the GTP `name` reply, else the raw command line.
    pub fn name(&mut self) -> String {
        if let Some(name) = &self.resolved_name {
            return name.clone();
        }
        if let Some(alt) = &self.alt_name {
            self.resolved_name = Some(alt.clone());
            return alt.clone();
        }

        let name = self
            .request_one("name", Some(DEFAULT_TIMEOUT_MS))
            .unwrap_or_else(|_| self.raw_command.clone());
        self.resolved_name = Some(name.clone());
        name
    }

    pub fn has_command(&mut self, command: &str) -> bool {
        match self.request("list_commands", Some(DEFAULT_TIMEOUT_MS)) {
            Ok(lines) => lines.iter().any(|l| l == command),
            Err(_) => false,
        }
    }

    pub fn board_size(&mut self, dim: u32) -> Result<()> {
        self.request_one(&format!("boardsize {dim}"), Some(DEFAULT_TIMEOUT_MS))?;
        Ok(())
    }

    pub fn clear_board(&mut self) -> Result<()> {
        self.request_one("clear_board", Some(DEFAULT_TIMEOUT_MS))?;
        Ok(())
    }

    pub fn komi(&mut self, komi: f64) -> Result<()> {
        self.request_one(&format!("komi {komi}"), Some(DEFAULT_TIMEOUT_MS))?;
        Ok(())
    }

    pub fn time_settings(&mut self, main_s: u64, byo_yomi_s: u64, byo_yomi_stones: u32) -> Result<()> {
        self.request_one(
            &format!("time_settings {main_s} {byo_yomi_s} {byo_yomi_stones}"),
            Some(DEFAULT_TIMEOUT_MS),
        )?;
        Ok(())
    }

    pub fn time_left(&mut self, color: Color, remaining_s: u64, stones: u32) -> Result<()> {
        self.request_one(
            &format!("time_left {} {remaining_s} {stones}", color.gtp_letter()),
            Some(DEFAULT_TIMEOUT_MS),
        )?;
        Ok(())
    }

    pub fn play(&mut self, color: Color, vertex: &str) -> Result<()> {
        self.request_one(
            &format!("play {} {vertex}", color.gtp_letter()),
            Some(DEFAULT_TIMEOUT_MS),
        )?;
        Ok(())
    }

    /// Generate a move, measuring wall-clock time taken (used by the driver
    /// for time accounting). Returns the vertex, `"pass"`, or `"resign"`.
    pub fn genmove(&mut self, color: Color, timeout_ms: Option<u64>) -> Result<String> {
        self.request_one(&format!("genmove {}", color.gtp_letter()), timeout_ms)
    }

    pub fn final_score(&mut self) -> Result<String> {
        self.request_one("final_score", Some(DEFAULT_TIMEOUT_MS))
    }

    pub fn quit(&mut self) -> Result<()> {
        let _ = self.channel.write_line("quit");
        Ok(())
    }
}

/// GTP player colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub fn gtp_letter(self) -> char {
        match self {
            Color::Black => 'b',
            Color::White => 'w',
        }
    }

    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::VecDeque;

    /// An in-memory `TextChannel` scripted with canned responses, for
    /// exercising `GtpEngine`/the driver without a real subprocess.
    pub struct FakeChannel {
        pub responses: VecDeque<Vec<String>>,
        pub sent: Vec<String>,
        /// Artificial per-read delay, for exercising real-clock timeout paths
        /// (e.g. `TimeTracker`) without a real subprocess.
        pub read_delay_ms: u64,
    }

    impl FakeChannel {
        pub fn new(responses: Vec<Vec<String>>) -> Self {
            Self {
                responses: responses.into(),
                sent: Vec::new(),
                read_delay_ms: 0,
            }
        }

        pub fn with_read_delay(responses: Vec<Vec<String>>, read_delay_ms: u64) -> Self {
            Self {
                responses: responses.into(),
                sent: Vec::new(),
                read_delay_ms,
            }
        }
    }

    impl TextChannel for FakeChannel {
        fn write_line(&mut self, text: &str) -> Result<()> {
            self.sent.push(text.to_string());
            Ok(())
        }

        fn read_line(&mut self, _timeout_ms: Option<u64>) -> Result<Option<String>> {
            if self.read_delay_ms > 0 {
                std::thread::sleep(std::time::Duration::from_millis(self.read_delay_ms));
            }
            if let Some(front) = self.responses.front_mut() {
                if let Some(line) = front.first().cloned() {
                    front.remove(0);
                    if front.is_empty() {
                        self.responses.pop_front();
                    }
                    return Ok(Some(line));
                }
            }
            Ok(Some(String::new()))
        }
    }
}
