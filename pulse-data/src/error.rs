use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated by the fetch pipeline.
///
/// Every variant is recoverable at the controller boundary: callers substitute a
/// documented fallback value (empty row set, zeroed summary) rather than
/// propagating the failure into the render layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("http status {status} {status_text}")]
    Http { status: u16, status_text: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("backend reported failure for {endpoint}")]
    Backend { endpoint: String },
}

impl FetchError {
    /// Determine if an error is worth retrying.
    ///
    /// Network failures, timeouts, and 5xx statuses are transient. 4xx statuses,
    /// unparseable bodies, and backend-reported failures (`success: false` with a
    /// 2xx status) are deliberate answers and retrying them only delays the
    /// fallback.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Timeout { .. } => true,
            FetchError::Http { status, .. } => *status >= 500,
            FetchError::MalformedResponse(_) => false,
            FetchError::Backend { .. } => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            FetchError::Timeout {
                timeout_secs: crate::fetch::REQUEST_TIMEOUT.as_secs(),
            }
        } else if let Some(status) = value.status() {
            FetchError::Http {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            }
        } else {
            FetchError::Network(value.to_string())
        }
    }
}

/// Errors generated by the chart render layer.
///
/// Caught and logged at the adapter boundary; a failed render leaves the previous
/// chart state visible until the next successful cycle and must never crash the
/// scheduler loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Error)]
pub enum RenderError {
    #[error("canvas {canvas} not available after {attempts} attempts")]
    CanvasUnavailable { canvas: String, attempts: u32 },

    #[error("chart construction failed on canvas {canvas}: {reason}")]
    Construction { canvas: String, reason: String },

    #[error("no chart bound to canvas {canvas}")]
    NoChart { canvas: String },
}
