//! Pure statistics over ordered numeric series.
//!
//! No I/O, no side effects: everything here is a function of its inputs so the
//! whole module is unit-testable in isolation. Summaries are recomputed
//! wholesale on every fetch cycle rather than incrementally mutated, which
//! rules out stale-state bugs by construction.

use itertools::Itertools;
use itertools::MinMaxResult;
use serde::{Deserialize, Serialize};

/// Arithmetic mean; 0.0 for an empty series.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Median of the series: single middle element for odd lengths, average of the
/// two middles for even lengths.
pub fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation: sqrt of the mean squared deviation.
///
/// Returns 0.0 for series of length <= 1; that is the degenerate-case policy,
/// not an error.
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.len() <= 1 {
        return 0.0;
    }
    let mu = mean(xs);
    let variance = xs.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / xs.len() as f64;
    variance.sqrt()
}

/// Standard score of `current` against the series.
///
/// Guarded against zero deviation: a flat series yields exactly 0.0, never NaN
/// or infinity.
pub fn z_score(current: f64, xs: &[f64]) -> f64 {
    let sigma = std_dev(xs);
    if sigma == 0.0 {
        return 0.0;
    }
    (current - mean(xs)) / sigma
}

/// Strict N-period simple moving average.
///
/// Positions before the window fills are `None` (insufficient window). This is
/// the policy for summary statistics and trend classification; use
/// [`moving_average_expanding`] where chart continuity matters.
pub fn moving_average(xs: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; xs.len()];
    }
    xs.iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < period {
                None
            } else {
                Some(mean(&xs[i + 1 - period..=i]))
            }
        })
        .collect()
}

/// Moving average with an expanding warm-up window.
///
/// Positions before the window fills average whatever data is available, so
/// chart series start at the first sample instead of a gap.
pub fn moving_average_expanding(xs: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return Vec::new();
    }
    xs.iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(period);
            mean(&xs[start..=i])
        })
        .collect()
}

/// One equal-width histogram bin over `[lower, upper)` (the last bin is
/// closed above).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width bins from min to max.
///
/// Degenerate input where all values coincide yields a single bin holding
/// everything rather than dividing by a zero bin width. Bin counts always sum
/// to `xs.len()`.
pub fn histogram_bins(xs: &[f64], bin_count: usize) -> Vec<HistogramBin> {
    if xs.is_empty() || bin_count == 0 {
        return Vec::new();
    }

    let (min, max) = match xs
        .iter()
        .copied()
        .minmax_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    {
        MinMaxResult::NoElements => return Vec::new(),
        MinMaxResult::OneElement(only) => (only, only),
        MinMaxResult::MinMax(min, max) => (min, max),
    };

    if min == max {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: xs.len(),
        }];
    }

    let width = (max - min) / bin_count as f64;
    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();

    for &x in xs {
        let index = (((x - min) / width) as usize).min(bin_count - 1);
        bins[index].count += 1;
    }

    bins
}

/// Percentage change from the first to the last element; 0.0 when undefined.
pub fn change_pct(xs: &[f64]) -> f64 {
    match (xs.first(), xs.last()) {
        (Some(&first), Some(&last)) if first != 0.0 => (last - first) / first * 100.0,
        _ => 0.0,
    }
}

/// Count of elements further than `sigmas` standard deviations from the mean.
pub fn outlier_count(xs: &[f64], sigmas: f64) -> usize {
    let sigma = std_dev(xs);
    if sigma == 0.0 {
        return 0;
    }
    let mu = mean(xs);
    xs.iter().filter(|&&x| (x - mu).abs() > sigmas * sigma).count()
}

/// Signal strength derived from a z-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalStrength {
    Neutral,
    Moderate,
    Strong,
    Extreme,
}

impl SignalStrength {
    pub fn label(&self) -> &'static str {
        match self {
            SignalStrength::Neutral => "NEUTRAL",
            SignalStrength::Moderate => "MODERATE",
            SignalStrength::Strong => "STRONG",
            SignalStrength::Extreme => "EXTREME",
        }
    }
}

impl Default for SignalStrength {
    fn default() -> Self {
        SignalStrength::Neutral
    }
}

/// Threshold table shared verbatim by every dashboard:
/// |z| > 3 extreme, > 2 strong, > 1 moderate, else neutral.
pub fn classify_signal(z: f64) -> SignalStrength {
    let magnitude = z.abs();
    if magnitude > 3.0 {
        SignalStrength::Extreme
    } else if magnitude > 2.0 {
        SignalStrength::Strong
    } else if magnitude > 1.0 {
        SignalStrength::Moderate
    } else {
        SignalStrength::Neutral
    }
}

/// Pearson correlation coefficient on aligned series.
///
/// Mismatched lengths or fewer than 5 points yield `None`, as does a series
/// with near-zero variance.
pub fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 5 {
        return None;
    }

    let mean_x = mean(xs);
    let mean_y = mean(ys);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x < 1e-10 || var_y < 1e-10 {
        return None;
    }

    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Derived read-only snapshot over one metric series.
///
/// Recomputed fully on every fetch cycle; a zeroed summary is the documented
/// fallback when an endpoint fails or returns nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub current: f64,
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub change_pct: f64,
    pub z_score: f64,
    /// Strict 7-period moving average; None until 7 samples exist.
    pub ma_7: Option<f64>,
    /// Strict 30-period moving average; None until 30 samples exist.
    pub ma_30: Option<f64>,
    pub outliers_2sd: usize,
    pub outliers_3sd: usize,
    pub signal: SignalStrength,
}

impl MetricsSummary {
    /// Fallback snapshot used when a metric fails to load.
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Compute the full snapshot over a series ordered oldest to newest.
    pub fn compute(xs: &[f64]) -> Self {
        let Some(&current) = xs.last() else {
            return Self::zeroed();
        };

        let trailing = |period: usize| {
            if xs.len() < period {
                None
            } else {
                Some(mean(&xs[xs.len() - period..]))
            }
        };

        let z = z_score(current, xs);

        Self {
            current,
            average: mean(xs),
            median: median(xs),
            min: xs.iter().copied().fold(f64::INFINITY, f64::min),
            max: xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std_dev: std_dev(xs),
            change_pct: change_pct(xs),
            z_score: z,
            ma_7: trailing(7),
            ma_30: trailing(30),
            outliers_2sd: outlier_count(xs, 2.0),
            outliers_3sd: outlier_count(xs, 3.0),
            signal: classify_signal(z),
        }
    }
}
