//! Liquidations dashboard: forced-closure flow over time plus the size
//! distribution of individual liquidation events.

use pulse_data::{FieldMap, SortOrder};

use super::{DashboardSpec, EndpointSpec, PanelKind, PanelSpec};
use crate::render::{AxisConfig, AxisScale, AxisSpec, TickFormat};

pub static FLOW: FieldMap = FieldMap {
    timestamp: &["timestamp", "ts", "time"],
    fields: &[
        ("notional_usd", &["notionalUsd", "usd_value", "value"]),
        ("long_notional", &["longNotional", "longs"]),
        ("short_notional", &["shortNotional", "shorts"]),
    ],
    primary: "notional_usd",
};

pub static EVENTS: FieldMap = FieldMap {
    timestamp: &["timestamp", "ts", "time"],
    fields: &[
        ("size_usd", &["sizeUsd", "quantity_usd", "value"]),
        ("price", &["px"]),
    ],
    primary: "size_usd",
};

const CURRENCY_AXES: AxisConfig =
    AxisConfig::single(AxisSpec::new(AxisScale::Linear, TickFormat::Currency));

pub static DASHBOARD: DashboardSpec = DashboardSpec {
    name: "liquidations",
    domain: "liquidations",
    panels: &[
        PanelSpec {
            name: "flow",
            canvas: "liquidation-flow",
            source: EndpointSpec {
                endpoint: "flow",
                map: &FLOW,
                sort: SortOrder::Ascending,
            },
            overlay: None,
            axes: CURRENCY_AXES,
            kind: PanelKind::TimeSeries,
        },
        PanelSpec {
            name: "size-distribution",
            canvas: "liquidation-sizes",
            source: EndpointSpec {
                endpoint: "events",
                map: &EVENTS,
                sort: SortOrder::Ascending,
            },
            overlay: None,
            axes: CURRENCY_AXES,
            kind: PanelKind::Distribution { bins: 12 },
        },
    ],
};
