//! Filesystem-backed context probes.
//!
//! All probing is bounded: one directory listing capped at
//! `MAX_LISTED_ENTRIES`, an ancestor walk of at most `MARKER_WALK_DEPTH`
//! directories, and a single history read. Any I/O failure yields an empty
//! signal for that probe.

use chrono::Utc;
use regex::Regex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ContextProbe, MarkerBoosts};
use crate::history::SessionHistory;
use crate::rules::{Boosts, DirectorySignal, ProjectMarker, RuleSet};

/// Directory entries examined by the file-type probe
pub const MAX_LISTED_ENTRIES: usize = 50;

/// An extension must appear this many times to count
pub const MIN_EXTENSION_COUNT: usize = 3;

/// cwd plus five ancestors
pub const MARKER_WALK_DEPTH: usize = 6;

/// Boost for the first listed successor of the last skill
const FIRST_SUCCESSOR_BOOST: i32 = 2;

/// Boost for every later successor
const LATER_SUCCESSOR_BOOST: i32 = 1;

fn accumulate(into: &mut Boosts, from: &Boosts) {
    for (key, value) in from {
        let slot = into.entry(key.clone()).or_insert(0);
        *slot = slot.saturating_add(*value);
    }
}

/// Sum the boosts of every directory signal whose pattern matches `cwd`
pub fn detect_directory(cwd: &str, signals: &[DirectorySignal]) -> Boosts {
    let mut boosts = Boosts::new();
    for signal in signals {
        match Regex::new(&signal.pattern) {
            Ok(re) if re.is_match(cwd) => accumulate(&mut boosts, &signal.boosts),
            Ok(_) => {}
            Err(e) => {
                debug!(pattern = %signal.pattern, error = %e, "Skipping invalid directory signal");
            }
        }
    }
    boosts
}

/// Count extensions among the first entries of `dir` and apply the signals
/// of those seen at least `MIN_EXTENSION_COUNT` times
pub fn detect_file_types(dir: &Path, signals: &HashMap<String, Boosts>) -> Boosts {
    let mut boosts = Boosts::new();
    if signals.is_empty() {
        return boosts;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Cannot list directory");
            return boosts;
        }
    };

    let names = entries.flatten().map(|entry| entry.file_name());
    for (ext, count) in &count_extensions(names) {
        if *count < MIN_EXTENSION_COUNT {
            continue;
        }
        if let Some(ext_boosts) = signals.get(ext) {
            accumulate(&mut boosts, ext_boosts);
        }
    }
    boosts
}

/// Lowercased `.ext` counts over the first `MAX_LISTED_ENTRIES` names
pub fn count_extensions<I>(names: I) -> HashMap<String, usize>
where
    I: IntoIterator<Item = OsString>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in names.into_iter().take(MAX_LISTED_ENTRIES) {
        if let Some(ext) = Path::new(&name).extension() {
            let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
            *counts.entry(ext).or_insert(0) += 1;
        }
    }
    counts
}

/// Whether `name` exists in `start` or one of its ancestors, looking at no
/// more than `MARKER_WALK_DEPTH` directories
pub fn exists_in_ancestors(start: &Path, name: &str) -> bool {
    start
        .ancestors()
        .take(MARKER_WALK_DEPTH)
        .any(|dir| dir.join(name).exists())
}

/// Apply marker boosts for files found near `cwd` and penalties for
/// files missing from it
pub fn detect_project_markers(cwd: &Path, markers: &[ProjectMarker]) -> MarkerBoosts {
    let mut result = MarkerBoosts::default();
    for marker in markers {
        if let (Some(file), Some(boosts)) = (&marker.file, &marker.boosts) {
            if exists_in_ancestors(cwd, file) {
                accumulate(&mut result.boosts, boosts);
            }
        }
        if let (Some(absent), Some(penalties)) = (&marker.absent, &marker.penalties) {
            if !exists_in_ancestors(cwd, absent) {
                accumulate(&mut result.penalties, penalties);
            }
        }
    }
    result
}

/// Boost the successors of the most recent skill, if it was invoked
/// recently enough
pub fn detect_session_sequence(
    sequences: &HashMap<String, Vec<String>>,
    history: &SessionHistory,
    now_ms: i64,
) -> Boosts {
    let mut boosts = Boosts::new();
    let Some(last) = history.last_recent(now_ms) else {
        return boosts;
    };
    let Some(successors) = sequences.get(&last.skill) else {
        return boosts;
    };

    for (i, command) in successors.iter().enumerate() {
        let boost = if i == 0 {
            FIRST_SUCCESSOR_BOOST
        } else {
            LATER_SUCCESSOR_BOOST
        };
        boosts.insert(command.clone(), boost);
    }
    boosts
}

/// Probes backed by the real filesystem and the session history file
#[derive(Debug, Clone, Default)]
pub struct FilesystemProbe {
    history_path: Option<PathBuf>,
    now_ms: Option<i64>,
}

impl FilesystemProbe {
    pub fn new(history_path: Option<PathBuf>) -> Self {
        Self {
            history_path,
            now_ms: None,
        }
    }

    /// Pin the clock used for the recency check
    pub fn at(mut self, now_ms: i64) -> Self {
        self.now_ms = Some(now_ms);
        self
    }
}

impl ContextProbe for FilesystemProbe {
    fn directory_boosts(&self, cwd: &str, ruleset: &RuleSet) -> Boosts {
        detect_directory(cwd, &ruleset.directory_signals)
    }

    fn file_type_boosts(&self, cwd: &str, ruleset: &RuleSet) -> Boosts {
        detect_file_types(Path::new(cwd), &ruleset.file_type_signals)
    }

    fn marker_boosts(&self, cwd: &str, ruleset: &RuleSet) -> MarkerBoosts {
        detect_project_markers(Path::new(cwd), &ruleset.project_markers)
    }

    fn sequence_boosts(&self, ruleset: &RuleSet) -> Boosts {
        let Some(path) = &self.history_path else {
            return Boosts::new();
        };
        if ruleset.skill_sequences.is_empty() {
            return Boosts::new();
        }
        let history = SessionHistory::load(path);
        let now_ms = self.now_ms.unwrap_or_else(|| Utc::now().timestamp_millis());
        detect_session_sequence(&ruleset.skill_sequences, &history, now_ms)
    }
}
