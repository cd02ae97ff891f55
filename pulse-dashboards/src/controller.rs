//! Dashboard controllers: one per dashboard, each composing the same five
//! leaves — filter store, fetch pipeline, metrics engine, render adapter,
//! refresh scheduling.
//!
//! A cycle never fails as a whole. Every panel degrades independently to its
//! documented fallback (empty rows, zeroed summary) and render errors leave the
//! previous chart state on screen; partial failure must never blank the page.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use smol_str::SmolStr;
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use pulse_data::fetch::normalize::primary_series;
use pulse_data::metrics::{correlation, histogram_bins};
use pulse_data::{
    ApiClient, CycleBus, CycleEvent, FilterCache, HttpTransport, MetricsSummary, NamedRequest,
    NormalizedRow, PanelReport, SharedFilterStore,
};

use crate::dashboards::{DashboardSpec, PanelKind, PanelSpec};
use crate::debounce::Debouncer;
use crate::render::{AxisSlot, CanvasId, ChartBackend, ChartSpec, NamedSeries, RenderAdapter};
use crate::scheduler::CycleFn;

/// One dashboard wired to its backend namespace and canvases.
pub struct DashboardController<T: HttpTransport, B: ChartBackend> {
    spec: &'static DashboardSpec,
    filters: SharedFilterStore,
    client: ApiClient<T>,
    adapter: Mutex<RenderAdapter<B>>,
    bus: CycleBus,
    cache: FilterCache,
}

impl<T: HttpTransport, B: ChartBackend> DashboardController<T, B> {
    pub fn new(
        spec: &'static DashboardSpec,
        filters: SharedFilterStore,
        client: ApiClient<T>,
        adapter: RenderAdapter<B>,
        bus: CycleBus,
        cache: FilterCache,
    ) -> Self {
        Self {
            spec,
            filters,
            client,
            adapter: Mutex::new(adapter),
            bus,
            cache,
        }
    }

    pub fn spec(&self) -> &'static DashboardSpec {
        self.spec
    }

    fn panel_requests(&self, params: &[(String, String)]) -> Vec<NamedRequest> {
        let mut requests = Vec::new();
        for panel in self.spec.panels {
            requests.push(NamedRequest {
                name: SmolStr::new(panel.name),
                endpoint: SmolStr::new(panel.source.endpoint),
                params: params.to_vec(),
                map: panel.source.map,
                sort: panel.source.sort,
            });
            if let Some(overlay) = panel.overlay {
                requests.push(NamedRequest {
                    name: overlay_key(panel.name),
                    endpoint: SmolStr::new(overlay.endpoint),
                    params: params.to_vec(),
                    map: overlay.map,
                    sort: overlay.sort,
                });
            }
        }
        requests
    }

    /// Run one fetch→metrics→render cycle and publish the resulting event.
    ///
    /// Idempotent by construction: every cycle recomputes summaries from
    /// scratch and fully overwrites the previous render.
    pub async fn run_cycle(&self) -> CycleEvent {
        let snapshot = self.filters.snapshot();
        let params = snapshot.to_query_params();
        debug!(dashboard = self.spec.name, query = %snapshot.to_query_string(), "cycle start");

        let results = self.client.fetch_all(self.panel_requests(&params)).await;
        let mut by_name: HashMap<SmolStr, Result<Vec<NormalizedRow>, pulse_data::FetchError>> =
            results
                .into_iter()
                .map(|partial| (partial.name, partial.result))
                .collect();

        let mut panels = Vec::with_capacity(self.spec.panels.len());
        let mut failures = Vec::new();

        for panel in self.spec.panels {
            let mut degraded = false;

            let rows = match by_name.remove(panel.name) {
                Some(Ok(rows)) => rows,
                Some(Err(error)) => {
                    warn!(
                        dashboard = self.spec.name,
                        panel = panel.name,
                        %error,
                        "panel degraded to fallback"
                    );
                    failures.push((SmolStr::new(panel.source.endpoint), error.to_string()));
                    degraded = true;
                    Vec::new()
                }
                None => Vec::new(),
            };

            let overlay_rows = match panel.overlay {
                Some(overlay) => match by_name.remove(&overlay_key(panel.name)) {
                    Some(Ok(rows)) => rows,
                    Some(Err(error)) => {
                        warn!(
                            dashboard = self.spec.name,
                            panel = panel.name,
                            %error,
                            "overlay degraded to fallback"
                        );
                        failures.push((SmolStr::new(overlay.endpoint), error.to_string()));
                        degraded = true;
                        Vec::new()
                    }
                    None => Vec::new(),
                },
                None => Vec::new(),
            };

            let values = primary_series(&rows, panel.source.map);
            let summary = MetricsSummary::compute(&values);

            let overlay_values = panel
                .overlay
                .map(|overlay| primary_series(&overlay_rows, overlay.map))
                .unwrap_or_default();
            let panel_correlation = aligned_correlation(&values, &overlay_values);

            let chart = build_chart(panel, &rows, &overlay_rows, &values);
            {
                let canvas = CanvasId::from(panel.canvas);
                let mut adapter = self.adapter.lock().await;
                if let Err(error) = adapter.update(&canvas, &chart).await {
                    // Previous chart state stays visible until the next
                    // successful cycle.
                    warn!(
                        dashboard = self.spec.name,
                        panel = panel.name,
                        %error,
                        "render failed"
                    );
                }
            }

            panels.push(PanelReport {
                panel: SmolStr::new(panel.name),
                rows: rows.len(),
                summary,
                correlation: panel_correlation,
                degraded,
            });
        }

        self.cache.store(self.spec.name, &snapshot);

        let event = CycleEvent {
            dashboard: SmolStr::new(self.spec.name),
            symbol: snapshot.symbol(),
            exchange: snapshot.exchange(),
            interval: snapshot.interval(),
            fetched_at: Utc::now(),
            panels,
            failures,
        };
        self.bus.publish(event.clone());
        event
    }

    /// Adapt this controller for the refresh scheduler.
    pub fn cycle_fn(self: &Arc<Self>) -> CycleFn {
        let controller = Arc::clone(self);
        Arc::new(move || {
            let controller = Arc::clone(&controller);
            async move {
                controller.run_cycle().await;
            }
            .boxed()
        })
    }

    /// React to filter changes: debounce, then run one cycle with the final
    /// values. Rapid UI interaction collapses to a single fetch.
    pub fn spawn_filter_listener(self: &Arc<Self>, window: Duration) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let mut rx = self.filters.subscribe();
        tokio::spawn(async move {
            let mut debouncer = Debouncer::new(window);
            loop {
                match rx.recv().await {
                    Ok(_change) => {
                        let controller = Arc::clone(&controller);
                        debouncer.call(async move {
                            controller.run_cycle().await;
                        });
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "filter change stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Destroy every chart this controller owns.
    pub async fn teardown(&self) {
        self.adapter.lock().await.teardown();
    }
}

fn overlay_key(panel: &str) -> SmolStr {
    SmolStr::new(format!("{panel}:overlay"))
}

/// Correlate the overlapping tails of two series.
fn aligned_correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.is_empty() || ys.is_empty() {
        return None;
    }
    let len = xs.len().min(ys.len());
    correlation(&xs[xs.len() - len..], &ys[ys.len() - len..])
}

fn time_series(name: &str, rows: &[NormalizedRow], field: &str, axis: AxisSlot) -> NamedSeries {
    NamedSeries {
        name: SmolStr::new(name),
        points: rows
            .iter()
            .filter_map(|row| row.get(field).map(|value| (row.time.timestamp() as f64, value)))
            .collect(),
        axis,
    }
}

fn build_chart(
    panel: &PanelSpec,
    rows: &[NormalizedRow],
    overlay_rows: &[NormalizedRow],
    values: &[f64],
) -> ChartSpec {
    let series = match panel.kind {
        PanelKind::TimeSeries => {
            let mut series = vec![time_series(
                panel.name,
                rows,
                panel.source.map.primary,
                AxisSlot::Primary,
            )];
            if let Some(overlay) = panel.overlay {
                series.push(time_series(
                    overlay.endpoint,
                    overlay_rows,
                    overlay.map.primary,
                    AxisSlot::Secondary,
                ));
            }
            series
        }
        PanelKind::Distribution { bins } => {
            let bins = histogram_bins(values, bins);
            vec![NamedSeries {
                name: SmolStr::new("distribution"),
                points: bins
                    .iter()
                    .map(|bin| ((bin.lower + bin.upper) / 2.0, bin.count as f64))
                    .collect(),
                axis: AxisSlot::Primary,
            }]
        }
    };

    ChartSpec {
        series,
        axes: panel.axes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_correlation_uses_overlapping_tail() {
        let long: Vec<f64> = vec![9.0, 9.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let short: Vec<f64> = vec![2.0, 4.0, 6.0, 8.0, 10.0];

        let aligned = aligned_correlation(&long, &short).unwrap();
        assert!((aligned - 1.0).abs() < 1e-9);
        assert_eq!(aligned_correlation(&long, &[]), None);
    }
}
