//! Per-metric dashboard descriptors.
//!
//! Every dashboard is the same pipeline instantiated with different endpoint
//! paths, alias tables, and panel/axis configuration; one module per dashboard
//! keeps the backend-specific quirks (field aliases, sort order, axis scales)
//! in one place each.

pub mod basis;
pub mod funding;
pub mod liquidations;
pub mod macro_overlay;
pub mod microstructure;
pub mod onchain;

use pulse_data::{FieldMap, SortOrder};

use crate::render::AxisConfig;

/// One endpoint under the dashboard's `/api/<domain>/` namespace.
#[derive(Debug, Clone, Copy)]
pub struct EndpointSpec {
    pub endpoint: &'static str,
    pub map: &'static FieldMap,
    pub sort: SortOrder,
}

/// How a panel turns normalised rows into chart content.
#[derive(Debug, Clone, Copy)]
pub enum PanelKind {
    /// Primary metric plotted over time.
    TimeSeries,
    /// Distribution of the primary metric across equal-width bins.
    Distribution { bins: usize },
}

/// One chart/card on a dashboard.
#[derive(Debug, Clone, Copy)]
pub struct PanelSpec {
    pub name: &'static str,
    pub canvas: &'static str,
    pub source: EndpointSpec,
    /// Optional series plotted against the secondary axis; configuring one
    /// also enables the correlation stat for the panel.
    pub overlay: Option<EndpointSpec>,
    pub axes: AxisConfig,
    pub kind: PanelKind,
}

/// A dashboard: a backend namespace plus its panels.
#[derive(Debug, Clone, Copy)]
pub struct DashboardSpec {
    pub name: &'static str,
    /// `<domain>` segment of `/api/<domain>/<endpoint>`.
    pub domain: &'static str,
    pub panels: &'static [PanelSpec],
}

/// Every dashboard shipped with the product.
pub fn all() -> [&'static DashboardSpec; 6] {
    [
        &funding::DASHBOARD,
        &basis::DASHBOARD,
        &liquidations::DASHBOARD,
        &microstructure::DASHBOARD,
        &onchain::DASHBOARD,
        &macro_overlay::DASHBOARD,
    ]
}
