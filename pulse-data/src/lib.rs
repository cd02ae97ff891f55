//! Data plane for Pulse derivatives/on-chain analytics dashboards.
//!
//! Every dashboard is an instance of one pipeline: read user-selected filters,
//! fetch JSON from the backend REST API, normalise heterogeneous payload shapes
//! into canonical rows, derive summary statistics, and hand the results to a
//! render layer. This crate owns the data side of that pipeline:
//!
//! - [`filter`]: typed filter state plus the injected [`filter::SharedFilterStore`]
//!   that sibling dashboards share.
//! - [`fetch`]: the HTTP pipeline — transport seam, retry combinator, fan-out/
//!   fan-in, and the single normalisation seam with per-endpoint alias tables.
//! - [`metrics`]: pure statistics (summaries, moving averages, histograms,
//!   z-score signal classification, Pearson correlation).
//! - [`event`]: broadcast bus carrying cycle-completion events.
//! - [`cache`]: best-effort persistence of last-used filters.
//! - [`config`]: environment-driven configuration.
//! - [`error`]: the recoverable failure taxonomy.

pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod fetch;
pub mod filter;
pub mod metrics;

pub use cache::FilterCache;
pub use config::PulseConfig;
pub use error::{FetchError, RenderError};
pub use event::{CycleBus, CycleEvent, PanelReport};
pub use fetch::normalize::{FieldMap, NormalizedRow, SortOrder};
pub use fetch::{ApiClient, HttpTransport, NamedRequest, PartialResult, ReqwestTransport};
pub use filter::{FilterChange, FilterState, FilterValue, SharedFilterStore};
pub use metrics::{MetricsSummary, SignalStrength};
