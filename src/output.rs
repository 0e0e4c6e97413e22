//! Presentation of routing results.
//!
//! `format_output` produces the hook response consumed by the agent;
//! `format_dry_run` produces the human report for `dispatch test`.

use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::rules::Enforcement;
use crate::scoring::RuleMatch;

/// Policy attached to every non-empty response
pub const INSTRUCTION: &str =
    "Present these matched skills to the user for confirmation before activating. \
Only invoke Skill tool for skills the user explicitly approves. \
If enforcement is 'block', require explicit acknowledgment. \
If enforcement is 'silent', mention the skill without requiring action.";

/// Hook response; serializes to `{}` when nothing matched
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_router: Option<RouterOutput>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterOutput {
    pub matched: bool,
    pub match_count: usize,
    pub matches: Vec<MatchSummary>,
    pub instruction: String,
}

/// Public view of a match (matched terms stay internal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub id: String,
    pub name: String,
    pub command: String,
    pub enforcement: Enforcement,
    pub description: String,
    pub score: i32,
    pub keyword_score: i32,
    pub context_score: i32,
    pub context_signals: Vec<String>,
    pub layer: u8,
}

impl From<&RuleMatch> for MatchSummary {
    fn from(m: &RuleMatch) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            command: m.command.clone(),
            enforcement: m.enforcement,
            description: m.description.clone(),
            score: m.score,
            keyword_score: m.keyword_score,
            context_score: m.context_score,
            context_signals: m.context_signals.clone(),
            layer: m.layer,
        }
    }
}

/// Enforcement level colored by severity
pub fn enforcement_label(enforcement: Enforcement) -> ColoredString {
    match enforcement {
        Enforcement::Block => enforcement.as_str().red(),
        Enforcement::Silent => enforcement.as_str().dimmed(),
        Enforcement::Suggest => enforcement.as_str().green(),
    }
}

pub fn format_output(matches: &[RuleMatch]) -> HookOutput {
    if matches.is_empty() {
        return HookOutput::default();
    }

    HookOutput {
        context_router: Some(RouterOutput {
            matched: true,
            match_count: matches.len(),
            matches: matches.iter().map(MatchSummary::from).collect(),
            instruction: INSTRUCTION.to_string(),
        }),
    }
}

/// Result of a dry run: the inputs plus the ranked matches
#[derive(Debug)]
pub struct DryRun {
    pub prompt: String,
    pub cwd: PathBuf,
    pub matches: Vec<RuleMatch>,
}

pub fn format_dry_run(result: &DryRun) -> String {
    if result.matches.is_empty() {
        let prompt = if result.prompt.is_empty() {
            "(empty)"
        } else {
            result.prompt.as_str()
        };
        return format!("No matches found for: \"{}\"", prompt);
    }

    let mut lines = vec![
        format!("Prompt: \"{}\"", result.prompt),
        format!("CWD: {}", result.cwd.display()),
        String::new(),
        "Matches:".bold().to_string(),
        "-".repeat(60),
    ];

    for (i, m) in result.matches.iter().enumerate() {
        lines.push(format!(
            "  {}. {} ({}) [{}]",
            i + 1,
            m.name.bold(),
            m.id,
            enforcement_label(m.enforcement)
        ));
        lines.push(format!("     command: {}", m.command));
        lines.push(format!(
            "     score: {} (keyword: {}, context: {})",
            m.score, m.keyword_score, m.context_score
        ));
        lines.push(format!("     layer: {}", m.layer));
        if !m.matched_terms.is_empty() {
            lines.push(format!("     matched: {}", m.matched_terms.join(", ")));
        }
        if !m.context_signals.is_empty() {
            lines.push(format!("     signals: {}", m.context_signals.join(", ")));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RuleMatch {
        RuleMatch {
            id: "deploy".into(),
            name: "Deployment".into(),
            category: "dev-workflows".into(),
            command: "deploy-checklist".into(),
            enforcement: Enforcement::Block,
            description: "Pre-deploy checklist".into(),
            score: 6,
            keyword_score: 4,
            context_score: 2,
            context_signals: vec!["dir:+2".into()],
            matched_terms: vec!["deploy".into(), "/ship/".into()],
            layer: 1,
        }
    }

    #[test]
    fn test_empty_output_is_empty_object() {
        let json = serde_json::to_string(&format_output(&[])).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_output_shape() {
        let value = serde_json::to_value(format_output(&[sample()])).unwrap();
        let router = &value["contextRouter"];
        assert_eq!(router["matched"], true);
        assert_eq!(router["matchCount"], 1);
        assert_eq!(router["instruction"], INSTRUCTION);

        let m = &router["matches"][0];
        assert_eq!(m["id"], "deploy");
        assert_eq!(m["enforcement"], "block");
        assert_eq!(m["keywordScore"], 4);
        assert_eq!(m["contextScore"], 2);
        assert_eq!(m["contextSignals"][0], "dir:+2");
        assert_eq!(m["layer"], 1);
        assert!(m.get("matchedTerms").is_none());
        assert!(m.get("category").is_none());
    }

    #[test]
    fn test_instruction_covers_enforcement_levels() {
        assert!(INSTRUCTION.contains("confirmation"));
        assert!(INSTRUCTION.contains("'block'"));
        assert!(INSTRUCTION.contains("'silent'"));
    }

    #[test]
    fn test_dry_run_report() {
        let report = format_dry_run(&DryRun {
            prompt: "ship it to production".into(),
            cwd: PathBuf::from("/project"),
            matches: vec![sample()],
        });
        assert!(report.contains("Prompt: \"ship it to production\""));
        assert!(report.contains("CWD: /project"));
        assert!(report.contains("Deployment"));
        assert!(report.contains("command: deploy-checklist"));
        assert!(report.contains("score: 6 (keyword: 4, context: 2)"));
        assert!(report.contains("matched: deploy, /ship/"));
        assert!(report.contains("signals: dir:+2"));
    }

    #[test]
    fn test_dry_run_no_matches() {
        let report = format_dry_run(&DryRun {
            prompt: String::new(),
            cwd: PathBuf::from("/"),
            matches: Vec::new(),
        });
        assert_eq!(report, "No matches found for: \"(empty)\"");
    }
}
