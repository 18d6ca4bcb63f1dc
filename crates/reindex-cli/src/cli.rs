//! CLI argument parsing for the reindex tool.
//!
//! CLI flags override all other config sources.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Search index rebuild tool
///
/// Rebuilds search indexes from the source store into staging indexes
/// and swaps them into production in one step.
#[derive(Parser, Debug)]
#[command(name = "reindex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default <config dir>/reindex/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override source store path
    #[arg(long, global = true)]
    pub source_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Reindex commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild every configured index and swap it into production
    Sync {
        /// Window start, ISO 8601 (incremental only)
        #[arg(long)]
        start_time: Option<String>,

        /// Window end, ISO 8601 (incremental only)
        #[arg(long)]
        end_time: Option<String>,

        /// Sync a recent window instead of the past year
        #[arg(long)]
        incremental: bool,

        /// Override documents per batch
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Load JSON Lines documents into the source store
    Import {
        /// Target collection
        #[arg(long)]
        collection: String,

        /// JSON Lines file, one document per line
        #[arg(long)]
        file: PathBuf,
    },

    /// Write every document of an index to stdout as JSON Lines
    Export {
        /// Index to read
        #[arg(long)]
        index: String,

        /// Override documents per page
        #[arg(long)]
        page_size: Option<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_sync_defaults_to_full() {
        let cli = Cli::parse_from(["reindex", "sync"]);
        match cli.command {
            Commands::Sync {
                start_time,
                end_time,
                incremental,
                batch_size,
            } => {
                assert_eq!(start_time, None);
                assert_eq!(end_time, None);
                assert!(!incremental);
                assert_eq!(batch_size, None);
            }
            _ => panic!("Expected Sync command"),
        }
    }

    #[test]
    fn test_cli_sync_incremental_with_bounds() {
        let cli = Cli::parse_from([
            "reindex",
            "sync",
            "--incremental",
            "--start-time",
            "2024-01-01T00:00:00Z",
            "--end-time",
            "2024-01-02T00:00:00Z",
            "--batch-size",
            "250",
        ]);
        match cli.command {
            Commands::Sync {
                start_time,
                end_time,
                incremental,
                batch_size,
            } => {
                assert!(incremental);
                assert_eq!(start_time.as_deref(), Some("2024-01-01T00:00:00Z"));
                assert_eq!(end_time.as_deref(), Some("2024-01-02T00:00:00Z"));
                assert_eq!(batch_size, Some(250));
            }
            _ => panic!("Expected Sync command"),
        }
    }

    #[test]
    fn test_cli_sync_keeps_empty_value() {
        let cli = Cli::parse_from(["reindex", "sync", "--incremental", "--start-time", ""]);
        match cli.command {
            Commands::Sync { start_time, .. } => assert_eq!(start_time.as_deref(), Some("")),
            _ => panic!("Expected Sync command"),
        }
    }

    #[test]
    fn test_cli_import() {
        let cli = Cli::parse_from([
            "reindex",
            "import",
            "--collection",
            "messages",
            "--file",
            "/tmp/messages.jsonl",
        ]);
        match cli.command {
            Commands::Import { collection, file } => {
                assert_eq!(collection, "messages");
                assert_eq!(file, PathBuf::from("/tmp/messages.jsonl"));
            }
            _ => panic!("Expected Import command"),
        }
    }

    #[test]
    fn test_cli_export() {
        let cli = Cli::parse_from(["reindex", "export", "--index", "messages", "--page-size", "50"]);
        match cli.command {
            Commands::Export { index, page_size } => {
                assert_eq!(index, "messages");
                assert_eq!(page_size, Some(50));
            }
            _ => panic!("Expected Export command"),
        }
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::parse_from([
            "reindex",
            "--config",
            "/path/to/config.toml",
            "--log-level",
            "debug",
            "sync",
            "--source-path",
            "/data/source",
        ]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert_eq!(cli.source_path, Some("/data/source".to_string()));
    }
}
