//! Reindex CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (sync, import, export)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    export_documents, handle_export, handle_import, handle_sync, import_documents, init_logging,
    load_settings, open_source, sync, GlobalOverrides,
};
