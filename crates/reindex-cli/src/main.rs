//! Search index rebuild tool
//!
//! Rebuilds search indexes from the source store without interrupting
//! reads: documents load into staging indexes which are swapped into
//! production only after every collection succeeded.
//!
//! # Usage
//!
//! ```bash
//! reindex sync [--incremental] [--start-time TS] [--end-time TS] [--batch-size N]
//! reindex import --collection NAME --file docs.jsonl
//! reindex export --index NAME [--page-size N]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (<config dir>/reindex/config.toml)
//! 3. Environment variables (REINDEX_*)
//! 4. CLI flags
//!
//! Exits 0 on success. Any error is written to stderr with its cause
//! chain and the process exits 1.

use anyhow::Result;
use clap::Parser;

use reindex_cli::{handle_export, handle_import, handle_sync, Cli, Commands, GlobalOverrides};
use reindex_indexing::SyncRequest;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let overrides = GlobalOverrides {
        config_path: cli.config,
        log_level: cli.log_level,
        source_path: cli.source_path,
    };

    match cli.command {
        Commands::Sync {
            start_time,
            end_time,
            incremental,
            batch_size,
        } => {
            let request = SyncRequest {
                start_time,
                end_time,
                incremental,
            };
            handle_sync(&overrides, request, batch_size).await?;
        }
        Commands::Import { collection, file } => {
            handle_import(&overrides, &collection, &file)?;
        }
        Commands::Export { index, page_size } => {
            handle_export(&overrides, &index, page_size).await?;
        }
    }

    Ok(())
}
