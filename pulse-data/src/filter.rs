//! User-selected filter state and the store that shares it between dashboards.
//!
//! Filters are the query parameters of every fetch cycle (symbol, exchange,
//! interval, lookback, limit). The [`SharedFilterStore`] is constructed once and
//! injected into each controller, with change notifications over a broadcast
//! channel so sibling dashboards react without direct coupling.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the filter-change broadcast channel.
const CHANGE_BUFFER_SIZE: usize = 64;

/// A single typed filter value.
///
/// Values parsed back from a query string re-acquire their type: integer first,
/// then float, then text.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Text(SmolStr),
}

impl FilterValue {
    /// Parse a raw query-string value into its typed form.
    pub fn parse(raw: &str) -> Self {
        if let Ok(int) = raw.parse::<i64>() {
            FilterValue::Int(int)
        } else if let Ok(float) = raw.parse::<f64>() {
            FilterValue::Float(float)
        } else {
            FilterValue::Text(SmolStr::new(raw))
        }
    }

    /// Serialized form used in query strings.
    pub fn to_query_value(&self) -> String {
        match self {
            FilterValue::Int(int) => int.to_string(),
            FilterValue::Float(float) => float.to_string(),
            FilterValue::Text(text) => text.to_string(),
        }
    }

    /// Empty values are dropped from query strings rather than serialized.
    pub fn is_empty(&self) -> bool {
        matches!(self, FilterValue::Text(text) if text.is_empty())
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(SmolStr::new(value))
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

/// Notification emitted when a filter value actually changes.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChange {
    pub key: SmolStr,
    pub value: FilterValue,
}

/// Mapping of named filter keys to scalar values.
///
/// Every well-known key has a default; unknown keys are accepted so newer
/// dashboards can carry filters older ones ignore.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FilterState {
    values: IndexMap<SmolStr, FilterValue>,
}

impl Default for FilterState {
    fn default() -> Self {
        let mut values = IndexMap::new();
        values.insert(SmolStr::new("symbol"), FilterValue::from("BTC"));
        values.insert(SmolStr::new("exchange"), FilterValue::from("binance"));
        values.insert(SmolStr::new("interval"), FilterValue::from("1h"));
        values.insert(SmolStr::new("days_back"), FilterValue::from(30i64));
        values.insert(SmolStr::new("limit"), FilterValue::from(500i64));
        Self { values }
    }
}

impl FilterState {
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.values.get(key)
    }

    /// Set a filter value, returning whether anything actually changed.
    ///
    /// Setting an equal value is a no-op so rapid UI echoes never trigger
    /// refresh cascades.
    pub fn set(&mut self, key: impl Into<SmolStr>, value: FilterValue) -> bool {
        let key = key.into();
        if self.values.get(&key) == Some(&value) {
            return false;
        }
        self.values.insert(key, value);
        true
    }

    /// Serialize to query parameters, dropping empty values.
    ///
    /// Keys are unique by construction, so the output never carries duplicates.
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.to_string(), value.to_query_value()))
            .collect()
    }

    /// Serialize to a URL-encoded query string.
    pub fn to_query_string(&self) -> String {
        serde_urlencoded::to_string(self.to_query_params()).unwrap_or_default()
    }

    /// Reconstruct typed filter values from a query string.
    pub fn from_query_str(query: &str) -> Self {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
        let values = pairs
            .into_iter()
            .map(|(key, raw)| (SmolStr::new(key), FilterValue::parse(&raw)))
            .collect();
        Self { values }
    }

    fn text_or(&self, key: &str, fallback: &str) -> SmolStr {
        match self.values.get(key) {
            Some(FilterValue::Text(text)) => text.clone(),
            Some(other) => SmolStr::new(other.to_query_value()),
            None => SmolStr::new(fallback),
        }
    }

    pub fn symbol(&self) -> SmolStr {
        self.text_or("symbol", "BTC")
    }

    pub fn exchange(&self) -> SmolStr {
        self.text_or("exchange", "binance")
    }

    pub fn interval(&self) -> SmolStr {
        self.text_or("interval", "1h")
    }
}

/// Filter state shared by reference between all dashboard controllers.
///
/// Reads happen on every fetch cycle; writes come from UI bindings. All
/// mutation happens between suspension points on the runtime, so a plain
/// `RwLock` is sufficient.
#[derive(Debug, Clone)]
pub struct SharedFilterStore {
    state: Arc<RwLock<FilterState>>,
    tx: broadcast::Sender<FilterChange>,
}

impl SharedFilterStore {
    pub fn new(initial: FilterState) -> Self {
        let (tx, _rx) = broadcast::channel(CHANGE_BUFFER_SIZE);
        Self {
            state: Arc::new(RwLock::new(initial)),
            tx,
        }
    }

    pub fn get(&self, key: &str) -> Option<FilterValue> {
        self.state.read().get(key).cloned()
    }

    /// Set a filter value and notify subscribers if it actually changed.
    pub fn set(&self, key: impl Into<SmolStr>, value: FilterValue) {
        let key = key.into();
        let changed = self.state.write().set(key.clone(), value.clone());
        if !changed {
            return;
        }
        debug!(%key, "filter changed");
        // Ignore send errors: no subscribers is a valid state.
        let _ = self.tx.send(FilterChange { key, value });
    }

    /// Snapshot the current state for one fetch cycle.
    pub fn snapshot(&self) -> FilterState {
        self.state.read().clone()
    }

    /// Replace the whole state (e.g. restored from the filter cache) without
    /// emitting per-key notifications.
    pub fn restore(&self, state: FilterState) {
        *self.state.write() = state;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FilterChange> {
        self.tx.subscribe()
    }
}

impl Default for SharedFilterStore {
    fn default() -> Self {
        Self::new(FilterState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_present() {
        let state = FilterState::default();
        assert_eq!(state.get("symbol"), Some(&FilterValue::from("BTC")));
        assert_eq!(state.get("limit"), Some(&FilterValue::from(500i64)));
        assert_eq!(state.symbol().as_str(), "BTC");
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut state = FilterState::default();
        assert!(state.set("symbol", FilterValue::from("ETH")));
        assert!(!state.set("symbol", FilterValue::from("ETH")));
        assert!(state.set("symbol", FilterValue::from("SOL")));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let mut state = FilterState::default();
        assert!(state.set("funding_window", FilterValue::from("8h")));
        assert_eq!(
            state.get("funding_window"),
            Some(&FilterValue::from("8h"))
        );
    }

    #[test]
    fn test_empty_values_dropped_from_query() {
        let mut state = FilterState::default();
        state.set("start_date", FilterValue::from(""));
        let params = state.to_query_params();
        assert!(params.iter().all(|(key, _)| key != "start_date"));
        assert!(params.iter().all(|(_, value)| !value.is_empty()));
    }

    #[test]
    fn test_query_round_trip() {
        let mut state = FilterState::default();
        state.set("days_back", FilterValue::from(7i64));
        state.set("threshold", FilterValue::from(0.5f64));

        let query = state.to_query_string();
        let parsed = FilterState::from_query_str(&query);

        assert_eq!(parsed.get("symbol"), Some(&FilterValue::from("BTC")));
        assert_eq!(parsed.get("days_back"), Some(&FilterValue::from(7i64)));
        assert_eq!(parsed.get("threshold"), Some(&FilterValue::from(0.5f64)));
        assert_eq!(parsed.get("interval"), Some(&FilterValue::from("1h")));
        // Serializing again yields the same query string.
        assert_eq!(parsed.to_query_string(), query);
    }

    #[test]
    fn test_store_notifies_on_change_only() {
        let store = SharedFilterStore::default();
        let mut rx = store.subscribe();

        store.set("symbol", FilterValue::from("ETH"));
        store.set("symbol", FilterValue::from("ETH"));

        let change = rx.try_recv().expect("one change expected");
        assert_eq!(change.key.as_str(), "symbol");
        assert!(rx.try_recv().is_err(), "idempotent set must not notify");
    }
}
