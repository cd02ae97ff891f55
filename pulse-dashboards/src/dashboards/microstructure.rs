//! Spot microstructure dashboard: cumulative volume delta with a VWAP overlay
//! on the secondary axis.

use pulse_data::{FieldMap, SortOrder};

use super::{DashboardSpec, EndpointSpec, PanelKind, PanelSpec};
use crate::render::{AxisConfig, AxisScale, AxisSpec, TickFormat};

pub static CVD: FieldMap = FieldMap {
    timestamp: &["timestamp", "ts", "time"],
    fields: &[
        ("delta_quote", &["deltaQuote", "cvd_quote", "value"]),
        ("delta_base", &["deltaBase", "cvd_base"]),
    ],
    primary: "delta_quote",
};

pub static VWAP: FieldMap = FieldMap {
    timestamp: &["timestamp", "ts", "time"],
    fields: &[
        ("vwap", &["value", "price"]),
        ("volume", &["volume_quote", "vol"]),
    ],
    primary: "vwap",
};

pub static DASHBOARD: DashboardSpec = DashboardSpec {
    name: "spot-microstructure",
    domain: "spot-microstructure",
    panels: &[PanelSpec {
        name: "cvd",
        canvas: "microstructure-cvd",
        source: EndpointSpec {
            endpoint: "cvd",
            map: &CVD,
            sort: SortOrder::Ascending,
        },
        // VWAP rides the secondary currency axis so the signed delta scale
        // stays readable.
        overlay: Some(EndpointSpec {
            endpoint: "vwap",
            map: &VWAP,
            sort: SortOrder::Ascending,
        }),
        axes: AxisConfig::dual(
            AxisSpec::new(AxisScale::Linear, TickFormat::Raw),
            AxisSpec::new(AxisScale::Linear, TickFormat::Currency),
        ),
        kind: PanelKind::TimeSeries,
    }],
};
