//! Error types for the dispatch boundary.
//!
//! Only the edges of the system produce these: reading hook input, loading
//! the rules file, and explicit persistence calls. The routing core itself
//! never fails; malformed patterns and unreadable probes degrade to "no
//! signal" instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to read stdin: {0}")]
    StdinRead(#[from] io::Error),

    #[error("Failed to parse input JSON: {0}")]
    InputParse(#[from] serde_json::Error),

    #[error("Failed to read rules from {path}: {source}")]
    RulesRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse rules in {path}: {message}")]
    RulesParse { path: PathBuf, message: String },

    #[error("Home directory not found")]
    NoHomeDir,

    #[error("Failed to persist {what} to {path}: {message}")]
    Persist {
        what: &'static str,
        path: PathBuf,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, DispatchError>;
