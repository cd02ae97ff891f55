//! Basis dashboard: derivative-vs-spot price difference, with the
//! contango/backwardation state derived from the latest print.

use pulse_data::{FieldMap, SortOrder};

use super::{DashboardSpec, EndpointSpec, PanelKind, PanelSpec};
use crate::render::{AxisConfig, AxisScale, AxisSpec, TickFormat};

pub static HISTORY: FieldMap = FieldMap {
    timestamp: &["timestamp", "ts", "time"],
    fields: &[
        ("basis_pct", &["basisPct", "basis_percent", "value"]),
        ("basis_usd", &["basisUsd", "basis"]),
    ],
    primary: "basis_pct",
};

pub static ANNUALIZED: FieldMap = FieldMap {
    timestamp: &["timestamp", "ts", "time"],
    fields: &[("annualized_pct", &["annualizedPct", "apr", "value"])],
    primary: "annualized_pct",
};

const PERCENT_AXES: AxisConfig =
    AxisConfig::single(AxisSpec::new(AxisScale::Linear, TickFormat::Percent));

pub static DASHBOARD: DashboardSpec = DashboardSpec {
    name: "basis",
    domain: "basis",
    panels: &[
        PanelSpec {
            name: "history",
            canvas: "basis-history",
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
            name: "annualized",
            canvas: "basis-annualized",
            source: EndpointSpec {
                endpoint: "annualized",
                map: &ANNUALIZED,
                sort: SortOrder::Ascending,
            },
            overlay: None,
            axes: PERCENT_AXES,
            kind: PanelKind::TimeSeries,
        },
    ],
};

/// Futures-vs-spot market state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BasisState {
    #[default]
    Unknown,
    /// Futures above spot.
    Contango,
    /// Futures below spot.
    Backwardation,
}

impl BasisState {
    pub fn from_basis_pct(basis_pct: f64) -> Self {
        if basis_pct > 0.0 {
            BasisState::Contango
        } else if basis_pct < 0.0 {
            BasisState::Backwardation
        } else {
            BasisState::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BasisState::Unknown => "UNKNOWN",
            BasisState::Contango => "CONTANGO",
            BasisState::Backwardation => "BACKWARDATION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_state_classification() {
        assert_eq!(BasisState::from_basis_pct(0.8), BasisState::Contango);
        assert_eq!(BasisState::from_basis_pct(-0.3), BasisState::Backwardation);
        assert_eq!(BasisState::from_basis_pct(0.0), BasisState::Unknown);
    }
}
