//! Applies resolved context signals to Layer 1 matches.
//!
//! Each candidate's adjustment is a fold over an ordered list of
//! `(source, contribution)` pairs, so the trace and the total come from the
//! same data.

use super::ResolvedSignals;
use crate::rules::Boosts;
use crate::scoring::RuleMatch;

/// Where a context contribution came from, in trace order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    Directory,
    Files,
    MarkerBoost,
    MarkerPenalty,
    Sequence,
}

impl SignalSource {
    fn label(&self) -> &'static str {
        match self {
            SignalSource::Directory => "dir",
            SignalSource::Files => "files",
            SignalSource::MarkerBoost | SignalSource::MarkerPenalty => "marker",
            SignalSource::Sequence => "seq",
        }
    }

    /// `dir:+2`, `marker:-1`
    pub fn render(&self, value: i32) -> String {
        if value > 0 {
            format!("{}:+{}", self.label(), value)
        } else {
            format!("{}:{}", self.label(), value)
        }
    }
}

/// Non-zero contributions for one candidate, in fixed source order
pub fn contributions(candidate: &RuleMatch, signals: &ResolvedSignals) -> Vec<(SignalSource, i32)> {
    let by_category = |map: &Boosts| map.get(&candidate.category).copied().unwrap_or(0);

    [
        (SignalSource::Directory, by_category(&signals.directory)),
        (SignalSource::Files, by_category(&signals.files)),
        (SignalSource::MarkerBoost, by_category(&signals.markers.boosts)),
        (SignalSource::MarkerPenalty, by_category(&signals.markers.penalties)),
        (
            SignalSource::Sequence,
            signals.sequence.get(&candidate.command).copied().unwrap_or(0),
        ),
    ]
    .into_iter()
    .filter(|(_, value)| *value != 0)
    .collect()
}

/// Add context scores and traces to every candidate, in place
pub fn apply_context_signals(matches: &mut [RuleMatch], signals: &ResolvedSignals) {
    for candidate in matches.iter_mut() {
        let (context_score, trace) = contributions(candidate, signals).into_iter().fold(
            (0i32, Vec::new()),
            |(total, mut trace), (source, value)| {
                trace.push(source.render(value));
                (total.saturating_add(value), trace)
            },
        );
        candidate.context_score = context_score;
        candidate.context_signals = trace;
        candidate.score = candidate.score.saturating_add(context_score);
    }
}

/// Stable sort by final score, descending, then keep `max_matches`
pub fn rank_and_truncate(matches: &mut Vec<RuleMatch>, max_matches: usize) {
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches.truncate(max_matches);
}
