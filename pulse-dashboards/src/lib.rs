//! Presentation plane for Pulse analytics dashboards.
//!
//! Builds on `pulse-data` with the remaining pipeline leaves:
//!
//! - [`render`]: chart ownership over an external [`render::ChartBackend`].
//! - [`scheduler`]: the Stopped/Running/Paused refresh state machine.
//! - [`debounce`]: collapse rapid filter changes into one fetch cycle.
//! - [`controller`]: per-dashboard composition of the whole chain.
//! - [`dashboards`]: the per-metric descriptors (endpoints, aliases, panels).
//! - [`term`]: a terminal sparkline backend for headless runs.

pub mod controller;
pub mod dashboards;
pub mod debounce;
pub mod render;
pub mod scheduler;
pub mod term;

pub use controller::DashboardController;
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use render::{
    AxisConfig, AxisScale, AxisSlot, AxisSpec, CanvasId, ChartBackend, ChartSpec, NamedSeries,
    RenderAdapter, TickFormat,
};
pub use scheduler::{CycleFn, RefreshScheduler, SchedulerState};
pub use term::TermChartBackend;
