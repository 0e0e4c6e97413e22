//! File locations used by the hook binary.

use std::path::{Path, PathBuf};

use crate::error::{DispatchError, Result};

/// Rules file, relative to the project directory
pub const RULES_FILE: &str = ".claude/dispatch-rules.json";

/// Cache directory name under ~/.claude/
const CACHE_DIR: &str = "cache";

const HISTORY_FILE: &str = "dispatch-history.json";

const ROUTE_CACHE_FILE: &str = "dispatch-cache.json";

/// Resolved paths for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPaths {
    pub rules: PathBuf,
    pub history: PathBuf,
    pub cache: PathBuf,
}

impl DispatchPaths {
    /// Fill unset paths with defaults: rules under `cwd`, history and cache
    /// under `~/.claude/cache/`
    pub fn resolve(
        cwd: &Path,
        rules: Option<PathBuf>,
        history: Option<PathBuf>,
        cache: Option<PathBuf>,
    ) -> Result<Self> {
        let rules = rules.unwrap_or_else(|| cwd.join(RULES_FILE));
        let (history, cache) = match (history, cache) {
            (Some(history), Some(cache)) => (history, cache),
            (history, cache) => {
                let dir = cache_dir()?;
                (
                    history.unwrap_or_else(|| dir.join(HISTORY_FILE)),
                    cache.unwrap_or_else(|| dir.join(ROUTE_CACHE_FILE)),
                )
            }
        };
        Ok(Self {
            rules,
            history,
            cache,
        })
    }
}

/// `~/.claude/cache`
pub fn cache_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(DispatchError::NoHomeDir)?;
    Ok(home.join(".claude").join(CACHE_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_paths_win() {
        let paths = DispatchPaths::resolve(
            Path::new("/project"),
            Some(PathBuf::from("/r.json")),
            Some(PathBuf::from("/h.json")),
            Some(PathBuf::from("/c.json")),
        )
        .unwrap();
        assert_eq!(paths.rules, PathBuf::from("/r.json"));
        assert_eq!(paths.history, PathBuf::from("/h.json"));
        assert_eq!(paths.cache, PathBuf::from("/c.json"));
    }

    #[test]
    fn test_rules_default_under_cwd() {
        let paths = DispatchPaths::resolve(
            Path::new("/project"),
            None,
            Some(PathBuf::from("/h.json")),
            Some(PathBuf::from("/c.json")),
        )
        .unwrap();
        assert_eq!(paths.rules, PathBuf::from("/project/.claude/dispatch-rules.json"));
    }
}
