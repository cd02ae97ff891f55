//! Broadcast events emitted when a fetch cycle completes.
//!
//! Independently-initialized sibling components (tickers, alert strips, other
//! dashboards) subscribe to the bus and react without direct coupling to the
//! controller that produced the cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tokio::sync::broadcast;
use tracing::debug;

use crate::metrics::MetricsSummary;

/// Default broadcast buffer; slow subscribers lag rather than block producers.
const EVENT_BUFFER_SIZE: usize = 256;

/// Outcome of one panel within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelReport {
    pub panel: SmolStr,
    /// Rows that survived normalisation (0 for a degraded panel).
    pub rows: usize,
    pub summary: MetricsSummary,
    /// Pearson correlation against the overlay series, where one is configured.
    pub correlation: Option<f64>,
    /// True when this panel fell back to its documented placeholder.
    pub degraded: bool,
}

/// Detail-bearing event describing one completed fetch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleEvent {
    pub dashboard: SmolStr,
    pub symbol: SmolStr,
    pub exchange: SmolStr,
    pub interval: SmolStr,
    pub fetched_at: DateTime<Utc>,
    pub panels: Vec<PanelReport>,
    /// `(endpoint, reason)` for every branch that converged to a fallback.
    pub failures: Vec<(SmolStr, String)>,
}

impl CycleEvent {
    /// A cycle is degraded when any branch fell back; the dashboard still
    /// renders everything that succeeded.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Fan-out bus for cycle events.
#[derive(Debug, Clone)]
pub struct CycleBus {
    tx: broadcast::Sender<CycleEvent>,
}

impl CycleBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { tx }
    }

    /// Publish a cycle event. No subscribers is a valid state, not an error.
    pub fn publish(&self, event: CycleEvent) {
        let receivers = self.tx.receiver_count();
        debug!(
            dashboard = %event.dashboard,
            receivers,
            degraded = event.is_degraded(),
            "cycle event"
        );
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CycleEvent> {
        self.tx.subscribe()
    }
}

impl Default for CycleBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(failures: Vec<(SmolStr, String)>) -> CycleEvent {
        CycleEvent {
            dashboard: SmolStr::new("funding-rate"),
            symbol: SmolStr::new("BTC"),
            exchange: SmolStr::new("binance"),
            interval: SmolStr::new("1h"),
            fetched_at: Utc::now(),
            panels: Vec::new(),
            failures,
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = CycleBus::new();
        bus.publish(event(Vec::new()));
    }

    #[test]
    fn test_subscribers_receive_events() {
        let bus = CycleBus::new();
        let mut rx = bus.subscribe();

        bus.publish(event(vec![(SmolStr::new("summary"), "http 500".to_string())]));

        let received = rx.try_recv().expect("event delivered");
        assert_eq!(received.dashboard.as_str(), "funding-rate");
        assert!(received.is_degraded());
    }
}
