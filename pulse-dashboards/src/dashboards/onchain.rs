//! On-chain dashboard: exchange reserve levels. The reserves endpoint feeds a
//! latest-first table, so rows are explicitly sorted descending.

use pulse_data::{FieldMap, SortOrder};

use super::{DashboardSpec, EndpointSpec, PanelKind, PanelSpec};
use crate::render::{AxisConfig, AxisScale, AxisSpec, TickFormat};

pub static RESERVES: FieldMap = FieldMap {
    timestamp: &["timestamp", "ts", "time", "date"],
    fields: &[
        ("reserve_usd", &["reserveUsd", "reserves", "value"]),
        ("netflow_usd", &["netflowUsd", "netflow"]),
    ],
    primary: "reserve_usd",
};

pub static DASHBOARD: DashboardSpec = DashboardSpec {
    name: "onchain",
    domain: "onchain",
    panels: &[PanelSpec {
        name: "reserves",
        canvas: "onchain-reserves",
        source: EndpointSpec {
            endpoint: "reserves",
            map: &RESERVES,
            sort: SortOrder::Descending,
        },
        overlay: None,
        axes: AxisConfig::single(AxisSpec::new(AxisScale::Linear, TickFormat::Currency)),
        kind: PanelKind::TimeSeries,
    }],
};
