//! Run every dashboard against the configured backend, rendering through the
//! terminal sparkline backend. Filters, refresh interval, and API base come
//! from the environment.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use pulse_data::{
    ApiClient, CycleBus, FilterCache, FilterValue, PulseConfig, ReqwestTransport,
    SharedFilterStore,
};
use pulse_dashboards::dashboards;
use pulse_dashboards::dashboards::basis::BasisState;
use pulse_dashboards::{
    DEFAULT_DEBOUNCE, DashboardController, RefreshScheduler, RenderAdapter, TermChartBackend,
};

#[tokio::main]
async fn main() {
    init_logging();

    let config = PulseConfig::from_env();
    info!(api_base = %config.api_base, interval = ?config.refresh_interval, "starting pulse overview");

    let cache = FilterCache::new(config.cache_dir.clone());
    let filters = SharedFilterStore::new(cache.load("overview").unwrap_or_default());
    if let Ok(symbol) = std::env::var("PULSE_SYMBOL") {
        filters.set("symbol", FilterValue::from(symbol.as_str()));
    }

    let bus = CycleBus::new();
    spawn_event_logger(&bus);

    // Headless: the page is always "visible". The sender must stay alive for
    // the lifetime of the schedulers.
    let (_visibility_tx, visibility_rx) = watch::channel(true);

    let mut schedulers = Vec::new();
    let mut listeners = Vec::new();
    for spec in dashboards::all() {
        let client = ApiClient::new(
            ReqwestTransport::new(),
            config.api_base.clone(),
            spec.domain,
        );
        let controller = Arc::new(DashboardController::new(
            spec,
            filters.clone(),
            client,
            RenderAdapter::new(TermChartBackend::new()),
            bus.clone(),
            cache.clone(),
        ));

        listeners.push(controller.spawn_filter_listener(DEFAULT_DEBOUNCE));

        let mut scheduler = RefreshScheduler::new(config.refresh_interval, visibility_rx.clone());
        scheduler.start(controller.cycle_fn());
        schedulers.push(scheduler);

        info!(dashboard = spec.name, "controller started");
    }

    info!("all dashboards running, ctrl-c to stop");
    let _ = tokio::signal::ctrl_c().await;

    info!("shutting down");
    for scheduler in schedulers.iter_mut() {
        scheduler.stop();
    }
    for listener in listeners {
        listener.abort();
    }
}

/// Log a one-line digest per completed cycle.
fn spawn_event_logger(bus: &CycleBus) {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            for panel in &event.panels {
                if panel.degraded {
                    info!(
                        dashboard = %event.dashboard,
                        panel = %panel.panel,
                        "degraded (fallback values shown)"
                    );
                    continue;
                }
                let mut digest = format!(
                    "current {:.6} avg {:.6} z {:+.2} [{}]",
                    panel.summary.current,
                    panel.summary.average,
                    panel.summary.z_score,
                    panel.summary.signal.label(),
                );
                if event.dashboard == "basis" {
                    digest.push_str(&format!(
                        " {}",
                        BasisState::from_basis_pct(panel.summary.current).label()
                    ));
                }
                if let Some(correlation) = panel.correlation {
                    digest.push_str(&format!(" corr {correlation:+.2}"));
                }
                info!(
                    dashboard = %event.dashboard,
                    panel = %panel.panel,
                    symbol = %event.symbol,
                    rows = panel.rows,
                    "{digest}"
                );
            }
        }
    });
}

/// Initialize logging
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
