//! End-to-end test infrastructure for the reindex pipeline.
//!
//! Provides a shared TestHarness (RocksDB source store in a temp dir plus
//! a mock index service) and helpers for seeding documents and inspecting
//! the requests a run issued.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use reindex_client::{RecordingDelay, RequestClient};
use reindex_indexing::{IndexLifecycle, OrchestratorConfig, ReindexOrchestrator};
use reindex_storage::Storage;
use reindex_types::{Document, IndexEndpointConfig, RetryPolicy};

/// Timestamp field used by every seeded document.
pub const TIMESTAMP_FIELD: &str = "createdAt";

/// Reference "now" for runs, 2024-01-29T15:00:00Z.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 29, 15, 0, 0).unwrap()
}

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Source store, shared with the orchestrator
    pub storage: Arc<Storage>,
    /// Mock index service
    pub server: MockServer,
    /// Records backoff waits instead of sleeping
    pub delay: Arc<RecordingDelay>,
}

impl TestHarness {
    /// Create a harness with an empty store and a mock service with no routes.
    pub async fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage = Arc::new(
            Storage::open(temp_dir.path(), TIMESTAMP_FIELD).expect("Failed to open test storage"),
        );

        Self {
            _temp_dir: temp_dir,
            storage,
            server: MockServer::start().await,
            delay: Arc::new(RecordingDelay::new()),
        }
    }

    /// Request client against the mock service, with the default retry policy.
    pub fn client(&self) -> RequestClient {
        RequestClient::new(
            IndexEndpointConfig::new(self.server.uri(), Some("test-key".to_string())),
            RetryPolicy::default(),
            4,
        )
        .expect("Failed to build client")
        .with_delay(self.delay.clone())
    }

    /// Orchestrator over the harness store for `collections`.
    pub fn orchestrator(&self, collections: &[&str], batch_size: usize) -> ReindexOrchestrator {
        let lifecycle = IndexLifecycle::new(Arc::new(self.client()), "_temp");
        let config = OrchestratorConfig::default()
            .with_collections(collections.iter().copied())
            .with_batch_size(batch_size);
        ReindexOrchestrator::new(self.storage.clone(), lifecycle, config)
    }

    /// Requests received so far, in arrival order.
    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Paths of requests received so far, in arrival order.
    pub async fn request_paths(&self) -> Vec<String> {
        self.requests()
            .await
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }

    /// Backoff waits recorded so far.
    pub fn waits(&self) -> Vec<Duration> {
        self.delay.waits()
    }
}

/// Mount healthy staging-creation and add-documents routes.
pub async fn mount_staging_routes(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/indexes/[a-z]+_temp$"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskUid": 1})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/indexes/[a-z]+_temp/documents$"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskUid": 2})))
        .mount(server)
        .await;
}

/// Mount the swap route, expecting exactly `times` calls.
pub async fn mount_swap_route(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/indexes/[a-z]+/swap$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskUid": 3})))
        .expect(times)
        .mount(server)
        .await;
}

/// Create `count` documents one second apart, newest at `newest`.
pub fn create_test_documents(prefix: &str, count: usize, newest: DateTime<Utc>) -> Vec<Document> {
    (0..count)
        .map(|i| {
            let ts = newest - chrono::Duration::seconds(i as i64);
            json!({
                "id": format!("{}-{}", prefix, i),
                TIMESTAMP_FIELD: ts.to_rfc3339(),
                "text": format!("{} document {}", prefix, i),
            })
        })
        .collect()
}

/// Store documents in a collection.
pub fn ingest_documents(storage: &Storage, collection: &str, docs: Vec<Document>) {
    storage
        .put_documents(collection, docs)
        .expect("Failed to put documents");
}

/// Decode a request body as a JSON array of documents.
pub fn body_documents(request: &Request) -> Vec<Value> {
    serde_json::from_slice::<Value>(&request.body)
        .ok()
        .and_then(|body| body.as_array().cloned())
        .unwrap_or_default()
}
