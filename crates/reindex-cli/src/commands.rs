//! Command implementations for the reindex tool.
//!
//! Handles:
//! - sync: resolve the window, rebuild staging indexes, swap
//! - import: load JSON Lines documents into the source store
//! - export: stream an index to JSON Lines via paged reads

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use reindex_client::{RequestClient, RequestSpec};
use reindex_indexing::{
    IndexLifecycle, OrchestratorConfig, ReindexOrchestrator, RunReport, SyncRequest,
};
use reindex_storage::Storage;
use reindex_types::{Document, Settings};

/// Overrides shared by every command (highest precedence).
#[derive(Debug, Default, Clone)]
pub struct GlobalOverrides {
    pub config_path: Option<String>,
    pub log_level: Option<String>,
    pub source_path: Option<String>,
}

/// Load configuration (defaults -> file -> env) and apply CLI overrides.
pub fn load_settings(overrides: &GlobalOverrides) -> Result<Settings> {
    let mut settings = Settings::load(overrides.config_path.as_deref())
        .context("Failed to load configuration")?;

    if let Some(log_level) = &overrides.log_level {
        settings.log_level = log_level.clone();
    }
    if let Some(source_path) = &overrides.source_path {
        settings.source_path = source_path.clone();
    }
    Ok(settings)
}

/// Initialize logging. Output goes to stderr so stdout stays clean for
/// exported documents.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Open the RocksDB source store, creating its directory if needed.
pub fn open_source(settings: &Settings) -> Result<Storage> {
    let path = PathBuf::from(&settings.source_path);
    fs::create_dir_all(&path).context("Failed to create source store directory")?;
    info!("Opening source store at {:?}", path);
    Storage::open(&path, settings.timestamp_field.clone()).context("Failed to open source store")
}

/// Run one reindex with already-loaded settings.
pub async fn sync(settings: &Settings, request: &SyncRequest) -> Result<RunReport> {
    let storage = Arc::new(open_source(settings)?);
    let client = RequestClient::from_settings(settings).context("Failed to build index client")?;
    let lifecycle = IndexLifecycle::new(Arc::new(client), settings.staging_suffix.clone());
    let orchestrator = ReindexOrchestrator::new(
        storage,
        lifecycle,
        OrchestratorConfig::from_settings(settings),
    );

    let report = orchestrator.run(request).await.context("Reindex failed")?;
    Ok(report)
}

/// Handle `reindex sync`.
pub async fn handle_sync(
    overrides: &GlobalOverrides,
    request: SyncRequest,
    batch_size: Option<usize>,
) -> Result<()> {
    let mut settings = load_settings(overrides)?;
    if let Some(size) = batch_size {
        settings.batch_size = size;
    }
    settings.validate().context("Invalid configuration")?;
    init_logging(&settings)?;

    info!("Reindex starting...");
    info!("  Index service: {}", settings.index_url);
    info!("  Collections: {}", settings.collections.join(", "));
    info!("  Batch size: {}", settings.batch_size);

    let report = sync(&settings, &request).await?;

    println!("Reindex complete");
    println!("  Window: {}", report.window);
    for collection in &report.collections {
        println!(
            "  {} -> {}: {} documents in {} batches",
            collection.collection,
            collection.staging_index,
            collection.documents,
            collection.batches
        );
    }
    println!("  Elapsed: {}ms", report.elapsed_ms);
    Ok(())
}

/// Read JSON Lines documents into `storage`, writing `batch_size` at a time.
///
/// Blank lines are skipped. A malformed line aborts the import; batches
/// already written stay in the store.
pub fn import_documents<R: BufRead>(
    storage: &Storage,
    collection: &str,
    reader: R,
    batch_size: usize,
) -> Result<usize> {
    let batch_size = batch_size.max(1);
    let mut pending: Vec<Document> = Vec::with_capacity(batch_size);
    let mut imported = 0;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Failed to read line {}", line_no))?;
        if line.trim().is_empty() {
            continue;
        }

        let doc: Document = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON on line {}", line_no))?;
        pending.push(doc);

        if pending.len() == batch_size {
            imported += storage
                .put_documents(collection, std::mem::take(&mut pending))
                .with_context(|| format!("Failed to store batch ending at line {}", line_no))?;
        }
    }

    if !pending.is_empty() {
        imported += storage
            .put_documents(collection, pending)
            .context("Failed to store final batch")?;
    }
    storage.flush().context("Failed to flush source store")?;
    Ok(imported)
}

/// Handle `reindex import`.
pub fn handle_import(overrides: &GlobalOverrides, collection: &str, file: &Path) -> Result<()> {
    let settings = load_settings(overrides)?;
    init_logging(&settings)?;

    let storage = open_source(&settings)?;
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );
    let imported = import_documents(&storage, collection, reader, settings.batch_size)?;

    info!(collection, imported, "Import complete");
    println!("Imported {} documents into {}", imported, collection);
    Ok(())
}

/// Stream every document of `index` into `out`, one JSON document per line.
pub async fn export_documents<W: Write>(
    client: &RequestClient,
    index: &str,
    page_size: usize,
    out: &mut W,
) -> Result<usize> {
    let spec = RequestSpec::get(format!("/indexes/{}/documents", index));
    let total = client
        .send_paged(&spec, page_size, |batch| {
            let written = write_lines(out, &batch);
            async move { written }
        })
        .await
        .with_context(|| format!("Failed to export index {}", index))?;
    out.flush().context("Failed to flush output")?;
    Ok(total)
}

fn write_lines<W: Write>(out: &mut W, batch: &[Document]) -> Result<()> {
    for doc in batch {
        serde_json::to_writer(&mut *out, doc).context("Failed to encode document")?;
        out.write_all(b"\n").context("Failed to write output")?;
    }
    Ok(())
}

/// Handle `reindex export`.
pub async fn handle_export(
    overrides: &GlobalOverrides,
    index: &str,
    page_size: Option<usize>,
) -> Result<()> {
    let settings = load_settings(overrides)?;
    init_logging(&settings)?;

    let client = RequestClient::from_settings(&settings).context("Failed to build index client")?;
    let page_size = page_size.unwrap_or(settings.page_size);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let total = export_documents(&client, index, page_size, &mut out).await?;

    info!(index, total, "Export complete");
    Ok(())
}
