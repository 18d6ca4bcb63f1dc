//! HTTP client for the index service with timeout, retry and paging.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use futures::stream::{self, Stream, TryStreamExt};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use reindex_types::{DocumentBatch, IndexEndpointConfig, RetryPolicy, Settings};

use crate::delay::{Delay, TokioDelay};
use crate::error::RequestError;
use crate::request::{Method, RequestSpec};
use crate::retry::AttemptBackoff;

/// `limit`/`offset` pair appended to a paged read.
#[derive(Debug, Clone, Copy)]
struct Page {
    limit: usize,
    offset: usize,
}

/// Client for the index service.
///
/// Holds one keep-alive connection pool for the whole run. A semaphore
/// bounds concurrent in-flight requests to `max_connections`.
pub struct RequestClient {
    http: Client,
    endpoint: IndexEndpointConfig,
    policy: RetryPolicy,
    permits: Arc<Semaphore>,
    delay: Arc<dyn Delay>,
}

impl RequestClient {
    /// Create a new client.
    pub fn new(
        endpoint: IndexEndpointConfig,
        policy: RetryPolicy,
        max_connections: usize,
    ) -> Result<Self, RequestError> {
        let max_connections = max_connections.max(1);
        let http = Client::builder()
            .pool_max_idle_per_host(max_connections)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            policy,
            permits: Arc::new(Semaphore::new(max_connections)),
            delay: Arc::new(TokioDelay),
        })
    }

    /// Create a client from loaded settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, RequestError> {
        Self::new(
            IndexEndpointConfig::from_settings(settings),
            RetryPolicy::from_settings(&settings.request),
            settings.request.max_connections,
        )
    }

    /// Replace the wait used between attempts.
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    /// Issue one logical request, retrying failed attempts with backoff.
    ///
    /// Returns the decoded JSON body (`Value::Null` for an empty body).
    /// After the last attempt fails the error is `Exhausted`, carrying the
    /// attempt count and the last failure.
    pub async fn send(&self, spec: &RequestSpec) -> Result<Value, RequestError> {
        let mut backoff = AttemptBackoff::new(self.policy);
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(method = %spec.method, path = %spec.path, attempt = attempts, "Sending index request");

            match self.attempt(spec, None).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        method = %spec.method,
                        path = %spec.path,
                        attempt = attempts,
                        kind = e.kind(),
                        error = %e,
                        "Index request attempt failed"
                    );

                    if !e.is_retryable() {
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            debug!(retry_in_ms = duration.as_millis() as u64, "Backing off");
                            self.delay.wait(duration).await;
                        }
                        None => {
                            error!(
                                method = %spec.method,
                                path = %spec.path,
                                attempts,
                                "Index request attempts exhausted"
                            );
                            return Err(RequestError::Exhausted {
                                method: spec.method.to_string(),
                                path: spec.path.clone(),
                                attempts,
                                source: Box::new(e),
                            });
                        }
                    }
                }
            }
        }
    }

    /// Lazily fetch the pages of a paged read.
    ///
    /// Pages start at offset 0 and advance by the number of documents each
    /// page returned. The stream ends at the first empty page or the first
    /// response that is not a document list. Each page is a single
    /// time-bounded attempt; a failed page ends the stream with
    /// `RequestError::Page` and nothing is resumed.
    pub fn pages<'a>(
        &'a self,
        spec: &'a RequestSpec,
        page_size: usize,
    ) -> impl Stream<Item = Result<DocumentBatch, RequestError>> + 'a {
        stream::try_unfold(0usize, move |offset| async move {
            let page = Page {
                limit: page_size,
                offset,
            };
            let value = self
                .attempt(spec, Some(page))
                .await
                .map_err(|e| RequestError::Page {
                    offset,
                    source: Box::new(e),
                })?;

            match into_documents(value) {
                Some(docs) if !docs.is_empty() => {
                    let next = offset + docs.len();
                    debug!(path = %spec.path, offset, count = docs.len(), "Fetched page");
                    Ok(Some((docs, next)))
                }
                _ => Ok(None),
            }
        })
    }

    /// Stream a paged read into `on_batch`, one call per non-empty page.
    ///
    /// The next page is not fetched until `on_batch` resolves. A page body
    /// may be a JSON array or an object with a `results` array; any other
    /// body ends the read. Only GET requests can be paged. Returns the
    /// number of documents delivered.
    pub async fn send_paged<F, Fut, E>(
        &self,
        spec: &RequestSpec,
        page_size: usize,
        mut on_batch: F,
    ) -> Result<usize, E>
    where
        F: FnMut(DocumentBatch) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: From<RequestError>,
    {
        if spec.method != Method::Get {
            return Err(RequestError::InvalidRequest(format!(
                "paged reads require GET, got {}",
                spec.method
            ))
            .into());
        }
        if page_size == 0 {
            return Err(RequestError::InvalidRequest("page size must be > 0".to_string()).into());
        }

        let pages = self.pages(spec, page_size);
        futures::pin_mut!(pages);

        let mut total = 0;
        while let Some(batch) = pages.try_next().await? {
            total += batch.len();
            on_batch(batch).await?;
        }

        debug!(path = %spec.path, total, "Paged read complete");
        Ok(total)
    }

    /// One time-bounded attempt. Dropping the in-flight future on timeout
    /// cancels the underlying request.
    async fn attempt(&self, spec: &RequestSpec, page: Option<Page>) -> Result<Value, RequestError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RequestError::Transport("connection pool closed".to_string()))?;

        let request = self.build_request(spec, page);
        match tokio::time::timeout(self.policy.timeout, execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(RequestError::Timeout {
                timeout_ms: self.policy.timeout.as_millis() as u64,
            }),
        }
    }

    fn build_request(&self, spec: &RequestSpec, page: Option<Page>) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .request(spec.method.as_reqwest(), self.endpoint.url(&spec.path))
            .header("Content-Type", "application/json");

        if let Some(key) = &self.endpoint.api_key {
            request = request.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }
        if let Some(page) = page {
            request = request.query(&[("limit", page.limit), ("offset", page.offset)]);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }
        request
    }
}

async fn execute(request: reqwest::RequestBuilder) -> Result<Value, RequestError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(RequestError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| RequestError::Decode(e.to_string()))
}

/// Documents in a page body: a bare array, or an object with a `results` array.
fn into_documents(value: Value) -> Option<DocumentBatch> {
    match value {
        Value::Array(docs) => Some(docs),
        Value::Object(mut fields) => match fields.remove("results") {
            Some(Value::Array(docs)) => Some(docs),
            _ => None,
        },
        _ => None,
    }
}
