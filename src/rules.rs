//! Rule configuration types (`dispatch-rules.json`, version 2).
//!
//! The structure is assumed to be validated before it reaches the engine;
//! deserialization here only tolerates missing optional sections.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{DispatchError, Result};

/// Score adjustments keyed by category (or by command for sequences).
pub type Boosts = HashMap<String, i32>;

/// Default number of suggestions surfaced after re-ranking
pub const DEFAULT_MAX_MATCHES: usize = 5;

/// Threshold used when neither the rule nor the config sets one
pub const DEFAULT_MIN_SCORE: i32 = 2;

/// How strongly a matched rule is surfaced to the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    #[default]
    Suggest,
    Silent,
    Block,
}

impl Enforcement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Enforcement::Suggest => "suggest",
            Enforcement::Silent => "silent",
            Enforcement::Block => "block",
        }
    }
}

/// A single routing rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Unique slug within the ruleset
    pub id: String,

    pub name: String,

    /// Grouping label that context boosts are keyed on
    pub category: String,

    /// Skill command suggested when the rule matches
    pub command: String,

    #[serde(default)]
    pub enforcement: Enforcement,

    /// Case-insensitive substrings, +1 each
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Case-insensitive regex sources, +2 each
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Per-rule threshold, overrides `config.minScore`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_matches: Option<i32>,

    #[serde(default)]
    pub description: String,
}

/// The `config` block of a ruleset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_matches: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<i32>,

    /// Cache lifetime in milliseconds; zero or unset disables the cache
    #[serde(default, rename = "cacheTTL", skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<i64>,

    /// Whether the caller may fall back to a model when nothing matches
    #[serde(default)]
    pub llm_fallback: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_timeout: Option<u64>,
}

impl RouterConfig {
    pub fn max_matches(&self) -> usize {
        self.max_matches.unwrap_or(DEFAULT_MAX_MATCHES)
    }

    pub fn cache_ttl_ms(&self) -> Option<i64> {
        self.cache_ttl.filter(|ttl| *ttl > 0)
    }
}

/// Boosts applied when `pattern` matches the working directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySignal {
    pub pattern: String,
    #[serde(default)]
    pub boosts: Boosts,
}

/// A file whose presence (or absence) near the working directory shifts scores
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMarker {
    /// Applies `boosts` when found in the ancestor chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boosts: Option<Boosts>,

    /// Applies `penalties` when missing from the ancestor chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalties: Option<Boosts>,
}

/// A complete ruleset as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub version: u32,

    #[serde(default)]
    pub config: RouterConfig,

    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub directory_signals: Vec<DirectorySignal>,

    /// Extension (with leading dot) -> category -> boost
    #[serde(default)]
    pub file_type_signals: HashMap<String, Boosts>,

    #[serde(default)]
    pub project_markers: Vec<ProjectMarker>,

    /// Predecessor command -> ordered successor commands
    #[serde(default)]
    pub skill_sequences: HashMap<String, Vec<String>>,
}

/// Load a ruleset from a JSON file
pub fn load_ruleset(path: &Path) -> Result<RuleSet> {
    let content = fs::read_to_string(path).map_err(|e| DispatchError::RulesRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let ruleset: RuleSet = serde_json::from_str(&content).map_err(|e| DispatchError::RulesParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    debug!(
        path = %path.display(),
        rules = ruleset.rules.len(),
        "Loaded ruleset"
    );
    Ok(ruleset)
}
