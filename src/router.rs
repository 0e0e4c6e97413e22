//! Routing orchestration: rejection checks, Layer 1, then Layer 1.5.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::context::{self, ContextProbe, FilesystemProbe};
use crate::output::DryRun;
use crate::rules::RuleSet;
use crate::scoring::{layer1_match, RuleMatch};

/// Prompts shorter than this, in UTF-16 code units, are never routed
pub const MIN_PROMPT_LEN: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    /// Session history used for sequence boosts; none disables them
    pub history_path: Option<PathBuf>,
}

/// Route `prompt` against `ruleset` using the real filesystem probes
pub fn route(
    prompt: &str,
    cwd: &Path,
    ruleset: &RuleSet,
    options: &RouteOptions,
) -> Vec<RuleMatch> {
    let probe = FilesystemProbe::new(options.history_path.clone());
    route_with_probe(prompt, cwd, ruleset, &probe)
}

/// Route with an explicit set of context probes
pub fn route_with_probe<P: ContextProbe + ?Sized>(
    prompt: &str,
    cwd: &Path,
    ruleset: &RuleSet,
    probe: &P,
) -> Vec<RuleMatch> {
    // measured the way the hook host measures prompt length
    if prompt.encode_utf16().count() < MIN_PROMPT_LEN {
        debug!("Prompt too short to route");
        return Vec::new();
    }
    // slash-prefixed text is a literal command
    if prompt.starts_with('/') {
        debug!("Skipping slash command");
        return Vec::new();
    }
    if ruleset.rules.is_empty() {
        debug!("Ruleset has no rules");
        return Vec::new();
    }

    let mut matches = layer1_match(&ruleset.rules, &ruleset.config, prompt);
    if matches.is_empty() {
        return matches;
    }
    debug!(candidates = matches.len(), "Layer 1 candidates");

    let signals = context::resolve_signals(probe, cwd, ruleset);
    context::apply_context_signals(&mut matches, &signals);
    context::rank_and_truncate(&mut matches, ruleset.config.max_matches());
    matches
}

/// Route without history and keep the inputs for reporting
pub fn dry_run(prompt: &str, cwd: &Path, ruleset: &RuleSet) -> DryRun {
    DryRun {
        prompt: prompt.to_string(),
        cwd: cwd.to_path_buf(),
        matches: route(prompt, cwd, ruleset, &RouteOptions::default()),
    }
}
