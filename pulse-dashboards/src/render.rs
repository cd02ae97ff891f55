//! Render adapter over an external charting collaborator.
//!
//! The chart library itself is out of scope; it sits behind [`ChartBackend`].
//! What lives here is the one true resource-lifecycle invariant of the system:
//! a canvas owns at most one live chart, acquired on render and guaranteed
//! released on re-render and teardown.

use std::collections::HashMap;
use std::time::Duration;

use derive_more::{Display, From};
use pulse_data::RenderError;
use smol_str::SmolStr;
use tracing::{debug, warn};

/// Attempts to find a laid-out canvas before giving up.
pub const CANVAS_WAIT_ATTEMPTS: u32 = 10;

/// Delay between canvas readiness checks.
pub const CANVAS_WAIT_DELAY: Duration = Duration::from_millis(150);

/// Identifier of the canvas element a chart binds to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From)]
pub struct CanvasId(SmolStr);

impl CanvasId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for CanvasId {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}

/// Axis scale; secondary overlays frequently want logarithmic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisScale {
    Linear,
    Logarithmic,
}

/// Tick label formatting per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFormat {
    Currency,
    Raw,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpec {
    pub scale: AxisScale,
    pub format: TickFormat,
}

impl AxisSpec {
    pub const fn new(scale: AxisScale, format: TickFormat) -> Self {
        Self { scale, format }
    }
}

/// Axis configuration: a primary axis plus an optional independent secondary
/// axis for dual-axis overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisConfig {
    pub primary: AxisSpec,
    pub secondary: Option<AxisSpec>,
}

impl AxisConfig {
    pub const fn single(primary: AxisSpec) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    pub const fn dual(primary: AxisSpec, secondary: AxisSpec) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
        }
    }
}

/// Which axis a series plots against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSlot {
    Primary,
    Secondary,
}

/// One named series handed to the chart.
///
/// `x` is epoch seconds for time series and the bin centre for distributions;
/// the backend formats it per the axis configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: SmolStr,
    pub points: Vec<(f64, f64)>,
    pub axis: AxisSlot,
}

/// Everything the backend needs to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub series: Vec<NamedSeries>,
    pub axes: AxisConfig,
}

impl ChartSpec {
    /// Structural shape of the chart: dataset count plus axis configuration.
    /// Unchanged shape permits in-place data replacement; a changed shape
    /// forces destroy-and-recreate.
    pub fn shape(&self) -> SeriesShape {
        SeriesShape {
            datasets: self.series.len(),
            axes: self.axes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesShape {
    pub datasets: usize,
    pub axes: AxisConfig,
}

/// Backend-assigned chart identifier.
pub type BackendChartId = u64;

/// External charting collaborator.
///
/// Implementations are synchronous (chart libraries are); interior mutability
/// is the implementor's concern.
pub trait ChartBackend: Send + Sync + 'static {
    /// Whether the canvas exists and has non-zero layout.
    fn canvas_ready(&self, canvas: &CanvasId) -> bool;

    /// Any chart the backend still has bound to this canvas, tracked by this
    /// adapter or left over from a prior adapter instance.
    fn existing_chart(&self, canvas: &CanvasId) -> Option<BackendChartId>;

    fn create(&self, canvas: &CanvasId, spec: &ChartSpec) -> Result<BackendChartId, RenderError>;

    /// Replace chart data in place with a no-animation redraw.
    fn replace_data(&self, chart: BackendChartId, series: &[NamedSeries])
    -> Result<(), RenderError>;

    fn destroy(&self, chart: BackendChartId);
}

/// A live chart owned by exactly one canvas.
#[derive(Debug, Clone)]
pub struct ChartHandle {
    chart: BackendChartId,
    shape: SeriesShape,
}

/// Ownership-tracking wrapper around a [`ChartBackend`].
#[derive(Debug)]
pub struct RenderAdapter<B: ChartBackend> {
    backend: B,
    handles: HashMap<CanvasId, ChartHandle>,
}

impl<B: ChartBackend> RenderAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            handles: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of charts this adapter currently owns.
    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }

    /// Poll for the canvas instead of failing when it is not yet present or
    /// not yet laid out.
    async fn wait_for_canvas(&self, canvas: &CanvasId) -> Result<(), RenderError> {
        for attempt in 0..CANVAS_WAIT_ATTEMPTS {
            if self.backend.canvas_ready(canvas) {
                if attempt > 0 {
                    debug!(%canvas, attempt, "canvas became ready");
                }
                return Ok(());
            }
            tokio::time::sleep(CANVAS_WAIT_DELAY).await;
        }
        Err(RenderError::CanvasUnavailable {
            canvas: canvas.to_string(),
            attempts: CANVAS_WAIT_ATTEMPTS,
        })
    }

    /// Destroy whatever chart is bound to the canvas: our tracked handle and
    /// any orphan the backend still reports.
    fn release(&mut self, canvas: &CanvasId) {
        if let Some(handle) = self.handles.remove(canvas) {
            self.backend.destroy(handle.chart);
        }
        if let Some(orphan) = self.backend.existing_chart(canvas) {
            debug!(%canvas, orphan, "destroying orphaned chart");
            self.backend.destroy(orphan);
        }
    }

    /// Construct a fresh chart on the canvas, destroying any predecessor.
    ///
    /// Postcondition: exactly one live chart is bound to the canvas.
    pub async fn render(&mut self, canvas: &CanvasId, spec: &ChartSpec) -> Result<(), RenderError> {
        self.wait_for_canvas(canvas).await?;
        self.release(canvas);

        let chart = self.backend.create(canvas, spec)?;
        self.handles.insert(
            canvas.clone(),
            ChartHandle {
                chart,
                shape: spec.shape(),
            },
        );
        Ok(())
    }

    /// Refresh an existing chart, preferring in-place data replacement.
    ///
    /// Falls back to destroy-and-recreate when the series shape changed or no
    /// chart exists yet.
    pub async fn update(&mut self, canvas: &CanvasId, spec: &ChartSpec) -> Result<(), RenderError> {
        match self.handles.get(canvas) {
            Some(handle) if handle.shape == spec.shape() => {
                self.backend.replace_data(handle.chart, &spec.series)
            }
            Some(_) => {
                debug!(%canvas, "series shape changed, recreating chart");
                self.render(canvas, spec).await
            }
            None => self.render(canvas, spec).await,
        }
    }

    /// Destroy every chart this adapter owns.
    pub fn teardown(&mut self) {
        for (canvas, handle) in self.handles.drain() {
            debug!(%canvas, "destroying chart on teardown");
            self.backend.destroy(handle.chart);
        }
    }
}

impl<B: ChartBackend> Drop for RenderAdapter<B> {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            warn!(live = self.handles.len(), "adapter dropped with live charts");
            self.teardown();
        }
    }
}
