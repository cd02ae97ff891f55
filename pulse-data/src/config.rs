//! Environment-driven configuration for the fetch pipeline.
//!
//! Mirrors the page-level settings of the hosting product: an optional API base
//! URL override and a cache directory for persisted filter state. Absent
//! overrides fall back to defaults so dashboards run with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Default API origin when `PULSE_API_BASE` is not set.
const DEFAULT_API_BASE: &str = "http://127.0.0.1:8080";

/// Default directory for persisted per-dashboard filter state.
const DEFAULT_CACHE_DIR: &str = ".pulse-cache";

/// Default scheduler refresh interval in seconds (observed range 5s-5min).
const DEFAULT_REFRESH_SECS: u64 = 30;

/// Resolved configuration shared by all dashboard controllers.
#[derive(Debug, Clone)]
pub struct PulseConfig {
    /// Origin all `/api/<domain>/<endpoint>` paths are resolved against.
    pub api_base: Url,
    /// Directory for persisted filter state; best-effort only.
    pub cache_dir: PathBuf,
    /// Refresh scheduler tick interval.
    pub refresh_interval: Duration,
}

impl PulseConfig {
    /// Build configuration from environment variables, falling back to defaults
    /// for anything unset or unparseable.
    ///
    /// `PULSE_API_BASE` overrides the API origin, `PULSE_CACHE_DIR` the filter
    /// cache directory, `PULSE_REFRESH_SECS` the scheduler interval.
    pub fn from_env() -> Self {
        let api_base = std::env::var("PULSE_API_BASE")
            .ok()
            .and_then(|raw| Url::parse(&raw).ok())
            .unwrap_or_else(|| {
                Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL")
            });

        let cache_dir = std::env::var("PULSE_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR));

        let refresh_interval = std::env::var("PULSE_REFRESH_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_REFRESH_SECS));

        Self {
            api_base,
            cache_dir,
            refresh_interval,
        }
    }
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
        }
    }
}
