//! Staging index lifecycle: create, load, swap.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use reindex_client::{RequestClient, RequestError, RequestSpec};
use reindex_types::DocumentBatch;

/// Manages staging indexes on the index service.
///
/// Promotion is a single `swap` call on the service. Production is never
/// deleted and recreated.
#[derive(Clone)]
pub struct IndexLifecycle {
    client: Arc<RequestClient>,
    staging_suffix: String,
}

impl IndexLifecycle {
    pub fn new(client: Arc<RequestClient>, staging_suffix: impl Into<String>) -> Self {
        Self {
            client,
            staging_suffix: staging_suffix.into(),
        }
    }

    /// Staging index name for a collection.
    pub fn staging_name(&self, collection: &str) -> String {
        format!("{}{}", collection, self.staging_suffix)
    }

    /// Create (or reset) the staging index for `collection` with the given
    /// settings payload. Returns the staging index name.
    pub async fn create_staging(
        &self,
        collection: &str,
        settings: &Value,
    ) -> Result<String, RequestError> {
        let staging = self.staging_name(collection);
        self.client
            .send(&RequestSpec::post(
                format!("/indexes/{}", staging),
                settings.clone(),
            ))
            .await?;

        info!(collection, staging = %staging, "Created staging index");
        Ok(staging)
    }

    /// Push one batch into a staging index.
    pub async fn add_documents(
        &self,
        staging: &str,
        batch: DocumentBatch,
    ) -> Result<(), RequestError> {
        self.client
            .send(&RequestSpec::post(
                format!("/indexes/{}/documents", staging),
                Value::Array(batch),
            ))
            .await?;
        Ok(())
    }

    /// Atomically exchange `production` and `staging`.
    pub async fn swap(&self, production: &str, staging: &str) -> Result<(), RequestError> {
        self.client
            .send(&RequestSpec::post(
                format!("/indexes/{}/swap", production),
                json!({ "with": staging }),
            ))
            .await?;

        info!(production, staging, "Swapped index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reindex_client::RecordingDelay;
    use reindex_types::{IndexEndpointConfig, RetryPolicy};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn lifecycle(server: &MockServer) -> IndexLifecycle {
        let client = RequestClient::new(
            IndexEndpointConfig::new(server.uri(), None),
            RetryPolicy::default(),
            4,
        )
        .unwrap()
        .with_delay(Arc::new(RecordingDelay::new()));
        IndexLifecycle::new(Arc::new(client), "_temp")
    }

    #[tokio::test]
    async fn test_create_staging_posts_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/messages_temp"))
            .and(body_json(json!({"primaryKey": "id"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"taskUid": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let name = lifecycle(&server)
            .create_staging("messages", &json!({"primaryKey": "id"}))
            .await
            .unwrap();
        assert_eq!(name, "messages_temp");
    }

    #[tokio::test]
    async fn test_add_documents_posts_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/messages_temp/documents"))
            .and(body_json(json!([{"id": "a", "indexed": true}])))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        lifecycle(&server)
            .add_documents("messages_temp", vec![json!({"id": "a", "indexed": true})])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_swap_is_single_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/messages/swap"))
            .and(body_json(json!({"with": "messages_temp"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        lifecycle(&server)
            .swap("messages", "messages_temp")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_failure_surfaces_exhaustion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/messages_temp"))
            .respond_with(ResponseTemplate::new(503))
            .expect(5)
            .mount(&server)
            .await;

        let err = lifecycle(&server)
            .create_staging("messages", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), Some(5));
    }
}
