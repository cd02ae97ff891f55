//! Funding-rate dashboard: periodic payments between perpetual longs and
//! shorts, plotted as percent with z-score signal classification.

use pulse_data::{FieldMap, SortOrder};

use super::{DashboardSpec, EndpointSpec, PanelKind, PanelSpec};
use crate::render::{AxisConfig, AxisScale, AxisSpec, TickFormat};

/// Funding history rows arrive as `fundingRate`/`rate`/`value` with epoch or
/// RFC 3339 timestamps depending on backend version.
pub static HISTORY: FieldMap = FieldMap {
    timestamp: &["timestamp", "ts", "time", "funding_time"],
    fields: &[
        ("funding_rate", &["fundingRate", "rate", "value"]),
        ("open_interest", &["openInterest", "oi"]),
    ],
    primary: "funding_rate",
};

/// Premium index samples backing the funding prints.
pub static PREMIUM_INDEX: FieldMap = FieldMap {
    timestamp: &["timestamp", "ts", "time"],
    fields: &[("premium", &["premiumIndex", "index", "value"])],
    primary: "premium",
};

const PERCENT_AXES: AxisConfig =
    AxisConfig::single(AxisSpec::new(AxisScale::Linear, TickFormat::Percent));

pub static DASHBOARD: DashboardSpec = DashboardSpec {
    name: "funding-rate",
    domain: "funding-rate",
    panels: &[
        PanelSpec {
            name: "history",
            canvas: "funding-history",
            source: EndpointSpec {
                endpoint: "history",
                map: &HISTORY,
                sort: SortOrder::Ascending,
            },
            overlay: None,
            axes: PERCENT_AXES,
            kind: PanelKind::TimeSeries,
        },
        PanelSpec {
            name: "premium-index",
            canvas: "funding-premium",
            source: EndpointSpec {
                endpoint: "premium-index",
                map: &PREMIUM_INDEX,
                sort: SortOrder::Ascending,
            },
            overlay: None,
            axes: PERCENT_AXES,
            kind: PanelKind::TimeSeries,
        },
    ],
};
