//! Error types used throughout the crate.
//!
//! This module defines the error hierarchy for configuration loading,
//! subprocess/engine communication, and game execution.

use std::error::Error;
use std::fmt;
use std::io;

/// Comprehensive error type for Badank operations.
#[derive(Debug)]
pub enum BadankError {
    /// I/O operation failed
    Io(io::Error),
    /// Configuration loading or validation error
    Config(String),
    /// Engine communication or protocol error
    Engine(String),
    /// Game logic or adjudication error
    Game(String),
}

impl fmt::Display for BadankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BadankError::Io(err) => write!(f, "IO error: {err}"),
            BadankError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BadankError::Engine(msg) => write!(f, "Engine error: {msg}"),
            BadankError::Game(msg) => write!(f, "Game error: {msg}"),
        }
    }
}

impl Error for BadankError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BadankError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BadankError {
    fn from(err: io::Error) -> Self {
        BadankError::Io(err)
    }
}

impl From<String> for BadankError {
    fn from(msg: String) -> Self {
        BadankError::Game(msg)
    }
}

impl From<toml::de::Error> for BadankError {
    fn from(err: toml::de::Error) -> Self {
        BadankError::Config(err.to_string())
    }
}

/// Convenience type alias for Results with `BadankError`.
///
/// # Examples
///
/// ```
/// # use badank::error::Result;
/// fn might_fail() -> Result<String> {
///     Ok("success".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, BadankError>;
