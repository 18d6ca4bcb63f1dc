//! Reindex pipeline for the search index service.
//!
//! ## Key Components
//!
//! - [`resolve_window`]: full (one year) or incremental (explicit or 12h) sync window
//! - [`BatchExtractor`]: streams window-filtered source documents in marked batches
//! - [`IndexLifecycle`]: staging index creation, bulk loads and atomic swap
//! - [`ReindexOrchestrator`]: the run state machine tying it together
//!
//! ## Run Order
//!
//! 1. Resolve the sync window once
//! 2. Create every staging index (any failure aborts before extraction)
//! 3. Extract and load each collection, one after another
//! 4. Swap every collection only after all loads succeeded
//! 5. Release the source store, on success and on failure
//!
//! ## Example
//!
//! ```ignore
//! use reindex_indexing::{IndexLifecycle, OrchestratorConfig, ReindexOrchestrator, SyncRequest};
//!
//! let lifecycle = IndexLifecycle::new(client, &settings.staging_suffix);
//! let orchestrator =
//!     ReindexOrchestrator::new(store, lifecycle, OrchestratorConfig::from_settings(&settings));
//! let report = orchestrator.run(&SyncRequest::incremental(None, None)).await?;
//! ```

pub mod error;
pub mod extractor;
pub mod lifecycle;
pub mod orchestrator;
pub mod range;

pub use error::{ExtractionError, OrchestrationError};
pub use extractor::{BatchExtractor, ExtractionStats, DEFAULT_BATCH_SIZE};
pub use lifecycle::IndexLifecycle;
pub use orchestrator::{
    CollectionPlan, CollectionReport, OrchestratorConfig, ReindexOrchestrator, RunReport,
    RunState, SyncRequest,
};
pub use range::{resolve_window, resolve_window_at};
