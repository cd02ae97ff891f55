//! HTTP fetch pipeline: build a query from filter state, issue GET requests
//! (optionally fanned out), and normalise heterogeneous response shapes into
//! canonical rows.
//!
//! The transport sits behind [`HttpTransport`] so the pipeline is testable with
//! doubles; production uses [`ReqwestTransport`] with a bounded request timeout.

pub mod normalize;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use smol_str::SmolStr;
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use normalize::{FieldMap, NormalizedRow, SortOrder, normalize_rows, parse_envelope};
use retry::RetryPolicy;

/// Bound on every individual request; a timed-out request is treated
/// identically to a network failure.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal response surface the pipeline needs from a transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam for issuing GET requests.
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError>;
}

/// Production transport backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("unknown status").to_string(),
            body,
        })
    }
}

/// One request in a fan-out batch.
#[derive(Debug, Clone)]
pub struct NamedRequest {
    /// Name the result is keyed by (usually the panel name).
    pub name: SmolStr,
    /// Endpoint leaf under `/api/<domain>/`.
    pub endpoint: SmolStr,
    pub params: Vec<(String, String)>,
    pub map: &'static FieldMap,
    pub sort: SortOrder,
}

/// Per-branch result of a fan-out; the batch itself never fails.
#[derive(Debug, Clone)]
pub struct PartialResult {
    pub name: SmolStr,
    pub result: Result<Vec<NormalizedRow>, FetchError>,
}

/// Client for one dashboard's backend namespace (`/api/<domain>/...`).
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    transport: Arc<T>,
    base: Url,
    domain: SmolStr,
    retry: RetryPolicy,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(transport: T, base: Url, domain: impl Into<SmolStr>) -> Self {
        Self {
            transport: Arc::new(transport),
            base,
            domain: domain.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Assemble `<base>/api/<domain>/<endpoint>?<params>`.
    pub fn endpoint_url(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Url, FetchError> {
        let path = format!("/api/{}/{}", self.domain, endpoint);
        let mut url = self
            .base
            .join(&path)
            .map_err(|error| FetchError::Network(format!("invalid endpoint url {path}: {error}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// Fetch one endpoint and return the raw `data` payload.
    ///
    /// Transient failures are retried per the policy; non-2xx statuses and
    /// unparseable bodies surface as their respective error variants.
    pub async fn fetch_raw(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Value, FetchError> {
        let url = self.endpoint_url(endpoint, params)?;
        debug!(%url, "fetching");

        self.retry
            .run(endpoint, || {
                let transport = Arc::clone(&self.transport);
                let url = url.clone();
                let endpoint = endpoint.to_string();
                async move {
                    let response = transport.get(&url).await?;
                    if !response.is_success() {
                        return Err(FetchError::Http {
                            status: response.status,
                            status_text: response.status_text,
                        });
                    }
                    parse_envelope(&response.body, &endpoint)
                }
            })
            .await
    }

    /// Fetch one endpoint and normalise its payload into canonical rows.
    pub async fn fetch_rows(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        map: &FieldMap,
        sort: SortOrder,
    ) -> Result<Vec<NormalizedRow>, FetchError> {
        let data = self.fetch_raw(endpoint, params).await?;
        Ok(normalize_rows(&data, map, sort))
    }

    /// Fan out a batch of independent requests and collect every branch's
    /// outcome.
    ///
    /// Successes and failures are captured per branch: one failing metric never
    /// blanks out metrics that succeeded, and the batch itself cannot fail.
    pub async fn fetch_all(&self, requests: Vec<NamedRequest>) -> Vec<PartialResult> {
        let branches = requests.into_iter().map(|request| async move {
            let result = self
                .fetch_rows(&request.endpoint, &request.params, request.map, request.sort)
                .await;
            PartialResult {
                name: request.name,
                result,
            }
        });

        futures::future::join_all(branches).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    const TEST_MAP: FieldMap = FieldMap {
        timestamp: &["ts", "timestamp"],
        fields: &[("value", &["close"])],
        primary: "value",
    };

    /// Transport double routing by endpoint leaf, recording every request.
    struct MockTransport {
        routes: HashMap<&'static str, Result<HttpResponse, FetchError>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockTransport {
        fn new(routes: Vec<(&'static str, Result<HttpResponse, FetchError>)>) -> Self {
            Self {
                routes: routes.into_iter().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn ok(body: &str) -> Result<HttpResponse, FetchError> {
            Ok(HttpResponse {
                status: 200,
                status_text: "OK".to_string(),
                body: body.to_string(),
            })
        }

        fn status(status: u16, status_text: &str) -> Result<HttpResponse, FetchError> {
            Ok(HttpResponse {
                status,
                status_text: status_text.to_string(),
                body: String::new(),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
            self.calls.lock().push(url.to_string());
            let leaf = url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or_default()
                .to_string();
            self.routes
                .get(leaf.as_str())
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Network(format!("no route for {leaf}"))))
        }
    }

    fn client(transport: MockTransport) -> ApiClient<MockTransport> {
        ApiClient::new(
            transport,
            Url::parse("http://api.test").unwrap(),
            "funding-rate",
        )
    }

    #[test]
    fn test_endpoint_url_shape() {
        let client = client(MockTransport::new(vec![]));
        let url = client
            .endpoint_url("history", &[("symbol".to_string(), "BTC".to_string())])
            .unwrap();
        assert_eq!(url.as_str(), "http://api.test/api/funding-rate/history?symbol=BTC");
    }

    #[tokio::test]
    async fn test_fetch_rows_normalises_payload() {
        let transport = MockTransport::new(vec![(
            "history",
            MockTransport::ok(
                r#"{"success": true, "data": [
                    {"ts": 1700003600, "close": "2.5"},
                    {"ts": 1700000000, "value": 1.5}
                ]}"#,
            ),
        )]);

        let rows = client(transport)
            .fetch_rows("history", &[], &TEST_MAP, SortOrder::Ascending)
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("value"), Some(1.5));
        assert_eq!(rows[1].get("value"), Some(2.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_in_collects_failures_independently() {
        let transport = MockTransport::new(vec![
            (
                "history",
                MockTransport::ok(r#"{"success": true, "data": [{"ts": 1700000000, "value": 1.0}]}"#),
            ),
            ("summary", MockTransport::status(500, "Internal Server Error")),
            (
                "extremes",
                MockTransport::ok(r#"{"success": true, "data": [{"ts": 1700000000, "value": 3.0}]}"#),
            ),
        ]);

        let request = |name: &str, endpoint: &str| NamedRequest {
            name: SmolStr::new(name),
            endpoint: SmolStr::new(endpoint),
            params: Vec::new(),
            map: &TEST_MAP,
            sort: SortOrder::Ascending,
        };

        let results = client(transport)
            .fetch_all(vec![
                request("history", "history"),
                request("summary", "summary"),
                request("extremes", "extremes"),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].result.as_ref().unwrap().len(), 1);
        assert!(matches!(
            results[1].result,
            Err(FetchError::Http { status: 500, .. })
        ));
        assert_eq!(results[2].result.as_ref().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_retried_then_surfaced() {
        let transport = MockTransport::new(vec![(
            "history",
            MockTransport::status(503, "Service Unavailable"),
        )]);
        let client = client(transport);

        let result = client.fetch_raw("history", &[]).await;

        assert!(matches!(result, Err(FetchError::Http { status: 503, .. })));
        // Initial attempt plus two retries.
        assert_eq!(client.transport.calls.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let transport = MockTransport::new(vec![("history", MockTransport::status(404, "Not Found"))]);
        let client = client(transport);

        let result = client.fetch_raw("history", &[]).await;

        assert!(matches!(result, Err(FetchError::Http { status: 404, .. })));
        assert_eq!(client.transport.calls.lock().len(), 1);
    }
}
