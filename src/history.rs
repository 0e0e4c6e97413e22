//! Per-session skill invocation history.
//!
//! A small JSON file `{pid, history: [{skill, ts}]}` shared by every hook
//! invocation. The session is approximated by the parent process id: when
//! it changes, prior history is discarded. Writes are read-modify-write with
//! no locking; last writer wins.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{DispatchError, Result};

/// Entries kept per session
pub const MAX_HISTORY: usize = 10;

/// Entries older than this are ignored for sequence scoring
pub const RECENT_WINDOW_MS: i64 = 2 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub skill: String,
    /// Epoch milliseconds
    pub ts: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHistory {
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl SessionHistory {
    /// Load from disk; a missing or corrupt file yields an empty history
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            debug!(path = %path.display(), error = %e, "Ignoring corrupt history file");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let persist_err = |message: String| DispatchError::Persist {
            what: "history",
            path: path.to_path_buf(),
            message,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| persist_err(e.to_string()))?;
        }
        let payload = serde_json::to_string(self).map_err(|e| persist_err(e.to_string()))?;
        fs::write(path, payload).map_err(|e| persist_err(e.to_string()))
    }

    /// Append an invocation for `session`, resetting on a session change and
    /// keeping only the newest `MAX_HISTORY` entries.
    pub fn record(&mut self, skill: &str, session: u32, now_ms: i64) {
        if self.pid.is_some_and(|pid| pid != session) {
            debug!(previous = ?self.pid, current = session, "New session, clearing history");
            self.history.clear();
        }
        self.pid = Some(session);
        self.history.push(HistoryEntry {
            skill: skill.to_string(),
            ts: now_ms,
        });
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history = self.history.split_off(excess);
        }
    }

    /// Most recent entry, if it is within the recent window of `now_ms`.
    /// A timestamp too far from `now_ms` to subtract is never recent.
    pub fn last_recent(&self, now_ms: i64) -> Option<&HistoryEntry> {
        self.history.last().filter(|entry| {
            now_ms
                .checked_sub(entry.ts)
                .is_some_and(|age| age <= RECENT_WINDOW_MS)
        })
    }
}

/// Identifier of the interactive session this process belongs to
pub fn current_session_id() -> u32 {
    #[cfg(unix)]
    {
        let ppid = std::os::unix::process::parent_id();
        if ppid != 0 {
            return ppid;
        }
    }
    std::process::id()
}

/// Record that `command` was invoked. Failures are logged and ignored.
pub fn record_match(command: &str, history_path: &Path) {
    let mut history = SessionHistory::load(history_path);
    history.record(command, current_session_id(), Utc::now().timestamp_millis());
    if let Err(e) = history.save(history_path) {
        warn!("{}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends_within_session() {
        let mut history = SessionHistory::default();
        history.record("brainstorming", 42, 1_000);
        history.record("writing-plans", 42, 2_000);
        assert_eq!(history.pid, Some(42));
        assert_eq!(history.history.len(), 2);
        assert_eq!(history.history[1].skill, "writing-plans");
    }

    #[test]
    fn test_session_change_resets_history() {
        let mut history = SessionHistory {
            pid: Some(7),
            history: vec![HistoryEntry {
                skill: "old".into(),
                ts: 1,
            }],
        };
        history.record("new", 8, 2);
        assert_eq!(history.pid, Some(8));
        assert_eq!(
            history.history,
            vec![HistoryEntry {
                skill: "new".into(),
                ts: 2
            }]
        );
    }

    #[test]
    fn test_missing_pid_keeps_history() {
        let mut history = SessionHistory {
            pid: None,
            history: vec![HistoryEntry {
                skill: "old".into(),
                ts: 1,
            }],
        };
        history.record("new", 8, 2);
        assert_eq!(history.history.len(), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = SessionHistory::default();
        for i in 0..15 {
            history.record(&format!("skill-{}", i), 1, i);
        }
        assert_eq!(history.history.len(), MAX_HISTORY);
        assert_eq!(history.history[0].skill, "skill-5");
        assert_eq!(history.history[9].skill, "skill-14");
    }

    #[test]
    fn test_last_recent_window() {
        let mut history = SessionHistory::default();
        assert!(history.last_recent(0).is_none());

        history.record("brainstorming", 1, 1_000);
        assert!(history.last_recent(1_000 + RECENT_WINDOW_MS).is_some());
        assert!(history.last_recent(1_001 + RECENT_WINDOW_MS).is_none());
    }

    #[test]
    fn test_last_recent_extreme_timestamps_are_stale() {
        let history = SessionHistory {
            pid: Some(1),
            history: vec![HistoryEntry {
                skill: "brainstorming".into(),
                ts: i64::MIN,
            }],
        };
        assert!(history.last_recent(1_700_000_000_000).is_none());

        let history = SessionHistory {
            pid: Some(1),
            history: vec![HistoryEntry {
                skill: "brainstorming".into(),
                ts: i64::MAX,
            }],
        };
        assert!(history.last_recent(-1_000).is_none());
    }

    #[test]
    fn test_load_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        assert_eq!(SessionHistory::load(&path), SessionHistory::default());

        fs::write(&path, "not json").unwrap();
        assert_eq!(SessionHistory::load(&path), SessionHistory::default());
    }

    #[test]
    fn test_record_match_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");
        record_match("writing-plans", &path);
        record_match("executing-plans", &path);

        let history = SessionHistory::load(&path);
        assert_eq!(history.pid, Some(current_session_id()));
        let skills: Vec<&str> = history.history.iter().map(|e| e.skill.as_str()).collect();
        assert_eq!(skills, vec!["writing-plans", "executing-plans"]);
    }

    #[test]
    fn test_record_match_resets_foreign_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let foreign = SessionHistory {
            pid: Some(current_session_id().wrapping_add(1)),
            history: vec![HistoryEntry {
                skill: "stale".into(),
                ts: 1,
            }],
        };
        foreign.save(&path).unwrap();

        record_match("fresh", &path);
        let history = SessionHistory::load(&path);
        assert_eq!(history.history.len(), 1);
        assert_eq!(history.history[0].skill, "fresh");
    }

    #[test]
    fn test_record_match_ignores_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the file should be makes the write fail
        let path = dir.path().join("history.json");
        fs::create_dir(&path).unwrap();
        record_match("anything", &path);
        assert!(path.is_dir());
    }
}
