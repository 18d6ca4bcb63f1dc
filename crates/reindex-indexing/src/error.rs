//! Error types for extraction and orchestration.

use reindex_client::RequestError;
use reindex_storage::StorageError;
use reindex_types::ConfigError;
use thiserror::Error;

/// Errors raised while streaming one collection into its staging index.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The source cursor could not be opened or advanced
    #[error("Failed to read {collection} from the source store")]
    Source {
        collection: String,
        #[source]
        source: StorageError,
    },

    /// The sink rejected a batch; later batches were not pulled
    #[error("Failed to deliver batch {batch} of {collection}")]
    Delivery {
        collection: String,
        batch: usize,
        #[source]
        source: RequestError,
    },
}

/// Errors that end a reindex run. Each variant names the stage it came from.
#[derive(Error, Debug)]
pub enum OrchestrationError {
    /// The sync window could not be resolved from the request
    #[error("Invalid sync window")]
    Configuration(#[from] ConfigError),

    /// A previous run already released the source store
    #[error("Source store already released by a previous run")]
    StoreReleased,

    #[error("Failed to create staging index {index} for {collection}")]
    StagingCreation {
        collection: String,
        index: String,
        #[source]
        source: RequestError,
    },

    #[error("Failed to reindex collection {collection}")]
    Extraction {
        collection: String,
        #[source]
        source: ExtractionError,
    },

    #[error("Failed to swap {production} with {staging}")]
    Swap {
        production: String,
        staging: String,
        #[source]
        source: RequestError,
    },

    /// The run succeeded but the source store could not be released
    #[error("Failed to release the source store")]
    Cleanup(#[source] StorageError),
}

impl OrchestrationError {
    /// Pipeline stage the run was in when it failed.
    pub fn stage(&self) -> &'static str {
        match self {
            OrchestrationError::StoreReleased => "start",
            OrchestrationError::Configuration(_) => "resolve_range",
            OrchestrationError::StagingCreation { .. } => "create_staging",
            OrchestrationError::Extraction { .. } => "extract",
            OrchestrationError::Swap { .. } => "swap",
            OrchestrationError::Cleanup(_) => "cleanup",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = OrchestrationError::Swap {
            production: "messages".to_string(),
            staging: "messages_temp".to_string(),
            source: RequestError::Status {
                status: 500,
                body: "boom".to_string(),
            },
        };
        assert_eq!(err.to_string(), "Failed to swap messages with messages_temp");
        assert_eq!(err.stage(), "swap");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("HTTP 500: boom"));
    }

    #[test]
    fn test_configuration_error_keeps_flag() {
        let err: OrchestrationError = ConfigError::MissingArgument {
            flag: "start-time".to_string(),
        }
        .into();
        assert_eq!(err.stage(), "resolve_range");
        let cause = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(cause.contains("--start-time"));
    }

    #[test]
    fn test_extraction_chain() {
        let err = OrchestrationError::Extraction {
            collection: "messages".to_string(),
            source: ExtractionError::Delivery {
                collection: "messages".to_string(),
                batch: 2,
                source: RequestError::Timeout { timeout_ms: 5000 },
            },
        };
        assert_eq!(err.stage(), "extract");
        let inner = err.source().and_then(|s| s.source()).map(|s| s.to_string());
        assert_eq!(inner.as_deref(), Some("Request timed out after 5000ms"));
    }
}
