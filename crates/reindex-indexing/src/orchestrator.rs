//! Reindex run orchestration.
//!
//! A run walks `Idle -> RangeResolved -> StagingCreated ->
//! Extracting(collection)... -> Swapped -> Done`, or ends in `Failed`.
//! The source store is released after every run, whatever the outcome.
//! No swap is issued unless every collection was fully loaded.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use reindex_storage::SourceStore;
use reindex_types::{Settings, SyncWindow};

use crate::error::OrchestrationError;
use crate::extractor::{BatchExtractor, DEFAULT_BATCH_SIZE};
use crate::lifecycle::IndexLifecycle;
use crate::range::resolve_window_at;

/// Position of a run in its state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    RangeResolved,
    StagingCreated,
    Extracting(String),
    Swapped,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::RangeResolved => write!(f, "range_resolved"),
            RunState::StagingCreated => write!(f, "staging_created"),
            RunState::Extracting(collection) => write!(f, "extracting({})", collection),
            RunState::Swapped => write!(f, "swapped"),
            RunState::Done => write!(f, "done"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// Records state transitions and logs each one.
#[derive(Debug)]
struct StateLog {
    history: Vec<RunState>,
}

impl StateLog {
    fn new() -> Self {
        Self {
            history: vec![RunState::Idle],
        }
    }

    fn enter(&mut self, next: RunState) {
        let from = self
            .history
            .last()
            .map(ToString::to_string)
            .unwrap_or_default();
        info!(from = %from, to = %next, "Reindex state transition");
        self.history.push(next);
    }

    fn into_history(self) -> Vec<RunState> {
        self.history
    }
}

/// Flags of one sync invocation.
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub incremental: bool,
}

impl SyncRequest {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn incremental(start_time: Option<String>, end_time: Option<String>) -> Self {
        Self {
            start_time,
            end_time,
            incremental: true,
        }
    }
}

/// A source collection and the settings its staging index is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionPlan {
    pub name: String,
    pub settings: Value,
}

impl CollectionPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: json!({}),
        }
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }
}

/// Configuration for reindex runs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Collections, reindexed sequentially in this order.
    pub collections: Vec<CollectionPlan>,
    /// Documents per add-documents call.
    pub batch_size: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            collections: vec![
                CollectionPlan::new("conversations"),
                CollectionPlan::new("messages"),
            ],
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            collections: settings
                .collections
                .iter()
                .map(|name| {
                    CollectionPlan::new(name.as_str())
                        .with_settings(settings.index_settings_for(name))
                })
                .collect(),
            batch_size: settings.batch_size,
        }
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Replace the collection list, using empty index settings.
    pub fn with_collections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = names.into_iter().map(CollectionPlan::new).collect();
        self
    }
}

/// Outcome for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub collection: String,
    pub staging_index: String,
    pub documents: usize,
    pub batches: usize,
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub window: SyncWindow,
    pub collections: Vec<CollectionReport>,
    /// Every state the run passed through, from `Idle` to `Done`.
    pub states: Vec<RunState>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn total_documents(&self) -> usize {
        self.collections.iter().map(|c| c.documents).sum()
    }
}

/// Sequences range resolution, staging, extraction and swap.
pub struct ReindexOrchestrator {
    store: Arc<dyn SourceStore>,
    lifecycle: IndexLifecycle,
    extractor: BatchExtractor,
    config: OrchestratorConfig,
}

impl ReindexOrchestrator {
    /// The orchestrator owns `store` and closes it at the end of each run.
    pub fn new(
        store: Arc<dyn SourceStore>,
        lifecycle: IndexLifecycle,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            extractor: BatchExtractor::new(Arc::clone(&store)),
            store,
            lifecycle,
            config,
        }
    }

    /// Run a reindex against the current time.
    pub async fn run(&self, request: &SyncRequest) -> Result<RunReport, OrchestrationError> {
        self.run_at(Utc::now(), request).await
    }

    /// Run a reindex, resolving the window against `now`.
    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        request: &SyncRequest,
    ) -> Result<RunReport, OrchestrationError> {
        if self.store.is_closed() {
            error!("Source store already released; refusing to start a run");
            return Err(OrchestrationError::StoreReleased);
        }

        let started = Instant::now();
        let mut states = StateLog::new();

        let outcome = self.execute(now, request, &mut states).await;
        let released = self.store.close().await;

        match (outcome, released) {
            (Ok((window, collections)), Ok(())) => {
                states.enter(RunState::Done);
                let report = RunReport {
                    window,
                    collections,
                    states: states.into_history(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                };
                info!(
                    documents = report.total_documents(),
                    elapsed_ms = report.elapsed_ms,
                    "Reindex complete"
                );
                Ok(report)
            }
            (Ok(_), Err(e)) => {
                states.enter(RunState::Failed);
                error!(error = %e, "Failed to release source store");
                Err(OrchestrationError::Cleanup(e))
            }
            (Err(e), released) => {
                if let Err(close_err) = released {
                    warn!(error = %close_err, "Failed to release source store after failed run");
                }
                states.enter(RunState::Failed);
                error!(stage = e.stage(), error = %e, "Reindex failed");
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        now: DateTime<Utc>,
        request: &SyncRequest,
        states: &mut StateLog,
    ) -> Result<(SyncWindow, Vec<CollectionReport>), OrchestrationError> {
        let window = resolve_window_at(
            now,
            request.start_time.as_deref(),
            request.end_time.as_deref(),
            request.incremental,
        )?;
        info!(window = %window, incremental = request.incremental, "Resolved sync window");
        states.enter(RunState::RangeResolved);

        // All staging indexes exist before any document is read
        let mut staged = Vec::with_capacity(self.config.collections.len());
        for plan in &self.config.collections {
            let staging = self
                .lifecycle
                .create_staging(&plan.name, &plan.settings)
                .await
                .map_err(|source| OrchestrationError::StagingCreation {
                    collection: plan.name.clone(),
                    index: self.lifecycle.staging_name(&plan.name),
                    source,
                })?;
            staged.push((plan.name.clone(), staging));
        }
        states.enter(RunState::StagingCreated);

        let mut reports = Vec::with_capacity(staged.len());
        for (collection, staging) in staged {
            states.enter(RunState::Extracting(collection.clone()));

            let lifecycle = &self.lifecycle;
            let target = staging.as_str();
            let stats = self
                .extractor
                .extract(&collection, &window, self.config.batch_size, |batch| {
                    lifecycle.add_documents(target, batch)
                })
                .await
                .map_err(|source| OrchestrationError::Extraction {
                    collection: collection.clone(),
                    source,
                })?;

            reports.push(CollectionReport {
                collection,
                staging_index: staging,
                documents: stats.documents,
                batches: stats.batches,
            });
        }

        for report in &reports {
            self.lifecycle
                .swap(&report.collection, &report.staging_index)
                .await
                .map_err(|source| OrchestrationError::Swap {
                    production: report.collection.clone(),
                    staging: report.staging_index.clone(),
                    source,
                })?;
        }
        states.enter(RunState::Swapped);

        Ok((window, reports))
    }
}
