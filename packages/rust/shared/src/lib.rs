//! Shared types, error model, and configuration for docsync.
//!
//! This crate is the foundation depended on by all other docsync crates.
//! It provides:
//! - [`DocSyncError`] — the unified error type
//! - Run accounting ([`RunStats`], [`FailurePolicy`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CONFIG_FILE_NAME, ContentConfig, ImagesConfig, RunPolicyConfig, SnapshotsConfig,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{DocSyncError, Result, SourceLocation};
pub use types::{FailurePolicy, RunStats};
