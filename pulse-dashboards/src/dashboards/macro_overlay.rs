//! Macro overlay dashboard: a macro series (dollar index) against price on an
//! independent logarithmic currency axis, with Pearson correlation between the
//! two series.

use pulse_data::{FieldMap, SortOrder};

use super::{DashboardSpec, EndpointSpec, PanelKind, PanelSpec};
use crate::render::{AxisConfig, AxisScale, AxisSpec, TickFormat};

pub static DXY: FieldMap = FieldMap {
    timestamp: &["timestamp", "ts", "time", "date"],
    fields: &[("dxy", &["close", "value", "index"])],
    primary: "dxy",
};

pub static PRICE: FieldMap = FieldMap {
    timestamp: &["timestamp", "ts", "time"],
    fields: &[("price", &["close", "value", "px"])],
    primary: "price",
};

pub static DASHBOARD: DashboardSpec = DashboardSpec {
    name: "macro-overlay",
    domain: "macro-overlay",
    panels: &[PanelSpec {
        name: "dxy-vs-price",
        canvas: "macro-dxy",
        source: EndpointSpec {
            endpoint: "dxy",
            map: &DXY,
            sort: SortOrder::Ascending,
        },
        overlay: Some(EndpointSpec {
            endpoint: "price",
            map: &PRICE,
            sort: SortOrder::Ascending,
        }),
        axes: AxisConfig::dual(
            AxisSpec::new(AxisScale::Linear, TickFormat::Raw),
            AxisSpec::new(AxisScale::Logarithmic, TickFormat::Currency),
        ),
        kind: PanelKind::TimeSeries,
    }],
};
