//! Best-effort persistence of last-used filter values.
//!
//! One JSON file per dashboard under the configured cache directory, so filters
//! survive restarts. The cache is feature-optional: any read or write failure is
//! logged at debug level and otherwise ignored.

use std::path::PathBuf;

use tracing::debug;

use crate::filter::FilterState;

/// Per-dashboard key-value persistence, namespaced by dashboard name.
#[derive(Debug, Clone)]
pub struct FilterCache {
    dir: PathBuf,
}

impl FilterCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, dashboard: &str) -> PathBuf {
        self.dir.join(format!("{dashboard}.json"))
    }

    /// Load the last-used filters for a dashboard, if any were persisted.
    pub fn load(&self, dashboard: &str) -> Option<FilterState> {
        let path = self.path_for(dashboard);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) => {
                debug!(?path, %error, "filter cache read skipped");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(error) => {
                debug!(?path, %error, "filter cache entry unreadable");
                None
            }
        }
    }

    /// Persist the filters for a dashboard. Failures are tolerated silently.
    pub fn store(&self, dashboard: &str, state: &FilterState) {
        if let Err(error) = std::fs::create_dir_all(&self.dir) {
            debug!(dir = ?self.dir, %error, "filter cache dir unavailable");
            return;
        }
        let path = self.path_for(dashboard);
        let json = match serde_json::to_string_pretty(state) {
            Ok(json) => json,
            Err(error) => {
                debug!(%error, "filter state not serializable");
                return;
            }
        };
        if let Err(error) = std::fs::write(&path, json) {
            debug!(?path, %error, "filter cache write skipped");
        }
    }
}
