//! Terminal chart backend.
//!
//! Stands in for the product's canvas charting library when running headless:
//! each chart renders as a unicode sparkline through the logging channel, with
//! tick labels formatted per the axis configuration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::info;

use pulse_data::RenderError;

use crate::render::{
    AxisSlot, BackendChartId, CanvasId, ChartBackend, ChartSpec, NamedSeries, TickFormat,
};

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Width of the rendered sparkline in characters.
const SPARK_WIDTH: usize = 48;

/// Compress a series into a fixed-width unicode sparkline.
pub fn sparkline(values: &[f64], width: usize) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    let step = (values.len() as f64 / width as f64).max(1.0);
    (0..width.min(values.len()))
        .map(|i| {
            let value = values[(i as f64 * step) as usize % values.len()];
            let level = if range > 0.0 {
                (((value - min) / range) * (SPARK_LEVELS.len() - 1) as f64).round() as usize
            } else {
                0
            };
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}

fn format_tick(value: f64, format: TickFormat) -> String {
    match format {
        TickFormat::Currency => format!("${value:.2}"),
        TickFormat::Percent => format!("{value:.4}%"),
        TickFormat::Raw => format!("{value:.4}"),
    }
}

#[derive(Default)]
struct TermState {
    bound: HashMap<CanvasId, BackendChartId>,
    specs: HashMap<BackendChartId, ChartSpec>,
}

/// [`ChartBackend`] rendering through `tracing` instead of a canvas.
#[derive(Default)]
pub struct TermChartBackend {
    next_id: AtomicU64,
    state: Mutex<TermState>,
}

impl TermChartBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn draw(&self, canvas: &CanvasId, spec: &ChartSpec, series: &[NamedSeries]) {
        for line in series {
            let values: Vec<f64> = line.points.iter().map(|(_, y)| *y).collect();
            let format = match line.axis {
                AxisSlot::Primary => spec.axes.primary.format,
                AxisSlot::Secondary => spec
                    .axes
                    .secondary
                    .map(|axis| axis.format)
                    .unwrap_or(spec.axes.primary.format),
            };
            let latest = values
                .last()
                .map(|value| format_tick(*value, format))
                .unwrap_or_else(|| "n/a".to_string());
            info!(
                %canvas,
                series = %line.name,
                latest = %latest,
                "{}",
                sparkline(&values, SPARK_WIDTH)
            );
        }
    }
}

impl ChartBackend for TermChartBackend {
    fn canvas_ready(&self, _canvas: &CanvasId) -> bool {
        // No layout to wait for in a terminal.
        true
    }

    fn existing_chart(&self, canvas: &CanvasId) -> Option<BackendChartId> {
        self.state.lock().bound.get(canvas).copied()
    }

    fn create(&self, canvas: &CanvasId, spec: &ChartSpec) -> Result<BackendChartId, RenderError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.lock();
            state.bound.insert(canvas.clone(), id);
            state.specs.insert(id, spec.clone());
        }
        self.draw(canvas, spec, &spec.series);
        Ok(id)
    }

    fn replace_data(
        &self,
        chart: BackendChartId,
        series: &[NamedSeries],
    ) -> Result<(), RenderError> {
        let (canvas, spec) = {
            let mut state = self.state.lock();
            let canvas = state
                .bound
                .iter()
                .find(|(_, bound)| **bound == chart)
                .map(|(canvas, _)| canvas.clone())
                .ok_or_else(|| RenderError::NoChart {
                    canvas: "unbound".to_string(),
                })?;
            let spec = state.specs.get_mut(&chart).ok_or_else(|| RenderError::NoChart {
                canvas: canvas.to_string(),
            })?;
            spec.series = series.to_vec();
            (canvas, spec.clone())
        };
        self.draw(&canvas, &spec, series);
        Ok(())
    }

    fn destroy(&self, chart: BackendChartId) {
        let mut state = self.state.lock();
        state.bound.retain(|_, bound| *bound != chart);
        state.specs.remove(&chart);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparkline_spans_levels() {
        let values: Vec<f64> = (0..48).map(|i| i as f64).collect();
        let line = sparkline(&values, 48);
        assert_eq!(line.chars().count(), 48);
        assert!(line.starts_with('▁'));
        assert!(line.ends_with('█'));
    }

    #[test]
    fn test_sparkline_flat_and_empty() {
        assert_eq!(sparkline(&[], 10), "");
        let flat = sparkline(&[5.0, 5.0, 5.0], 3);
        assert!(flat.chars().all(|c| c == '▁'));
    }

    #[test]
    fn test_tick_formats() {
        assert_eq!(format_tick(42.5, TickFormat::Currency), "$42.50");
        assert_eq!(format_tick(0.0123, TickFormat::Percent), "0.0123%");
        assert_eq!(format_tick(7.0, TickFormat::Raw), "7.0000");
    }
}
