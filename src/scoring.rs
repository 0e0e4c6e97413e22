//! Layer 1: text scoring of rules against the prompt.
//!
//! Keywords are case-insensitive substrings worth 1 point each, patterns are
//! case-insensitive regexes worth 2. A pattern that fails to compile is
//! skipped; it never aborts scoring.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rules::{Enforcement, Rule, RouterConfig, DEFAULT_MIN_SCORE};

/// Points for a keyword found in the prompt
const KEYWORD_WEIGHT: i32 = 1;

/// Points for a pattern matching the prompt
const PATTERN_WEIGHT: i32 = 2;

/// A rule that passed Layer 1, carried through context scoring to output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMatch {
    pub id: String,
    pub name: String,
    pub category: String,
    pub command: String,
    pub enforcement: Enforcement,
    pub description: String,

    /// Running total: keyword score plus context score
    pub score: i32,
    pub keyword_score: i32,
    pub context_score: i32,

    /// Non-zero context contributions, e.g. `dir:+2`, `marker:-1`
    pub context_signals: Vec<String>,

    /// Keywords verbatim, patterns as `/source/`
    pub matched_terms: Vec<String>,
    pub layer: u8,
}

/// Score for one rule plus the terms that produced it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleScore {
    pub score: i32,
    pub matched_terms: Vec<String>,
}

/// Score a single rule. `prompt_lower` is used for keywords, `prompt_raw`
/// for patterns (which are compiled case-insensitive anyway).
pub fn score_rule(rule: &Rule, prompt_lower: &str, prompt_raw: &str) -> RuleScore {
    let mut result = RuleScore::default();

    for keyword in &rule.keywords {
        if prompt_lower.contains(&keyword.to_lowercase()) {
            result.score += KEYWORD_WEIGHT;
            result.matched_terms.push(keyword.clone());
        }
    }

    for pattern in &rule.patterns {
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => {
                if re.is_match(prompt_raw) {
                    result.score += PATTERN_WEIGHT;
                    result.matched_terms.push(format!("/{}/", pattern));
                }
            }
            Err(e) => {
                debug!(rule = %rule.id, pattern = %pattern, error = %e, "Skipping invalid pattern");
            }
        }
    }

    result
}

/// Threshold a rule must reach: its own `minMatches`, else `config.minScore`, else 2
pub fn effective_threshold(rule: &Rule, config: &RouterConfig) -> i32 {
    rule.min_matches
        .or(config.min_score)
        .unwrap_or(DEFAULT_MIN_SCORE)
}

/// Score every rule, keep those at or above threshold, sort by score
/// descending (ties keep rule order), and cap at twice `maxMatches` so the
/// context pass has room to re-rank.
pub fn layer1_match(rules: &[Rule], config: &RouterConfig, prompt: &str) -> Vec<RuleMatch> {
    let prompt_lower = prompt.to_lowercase();

    let mut matches: Vec<RuleMatch> = rules
        .iter()
        .filter_map(|rule| {
            let RuleScore { score, matched_terms } = score_rule(rule, &prompt_lower, prompt);
            if score < effective_threshold(rule, config) {
                return None;
            }
            Some(RuleMatch {
                id: rule.id.clone(),
                name: rule.name.clone(),
                category: rule.category.clone(),
                command: rule.command.clone(),
                enforcement: rule.enforcement,
                description: rule.description.clone(),
                score,
                keyword_score: score,
                context_score: 0,
                context_signals: Vec::new(),
                matched_terms,
                layer: 1,
            })
        })
        .collect();

    // sort_by is stable
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches.truncate(config.max_matches().saturating_mul(2));
    matches
}
