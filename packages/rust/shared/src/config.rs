//! Application configuration for docsync.
//!
//! Project config lives at `./docsync.toml` (or wherever `--config` points).
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocSyncError, Result};
use crate::types::FailurePolicy;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "docsync.toml";

// ---------------------------------------------------------------------------
// Config structs (matching docsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which documents to process.
    #[serde(default)]
    pub content: ContentConfig,

    /// Code snapshot transform settings.
    #[serde(default)]
    pub snapshots: SnapshotsConfig,

    /// Image reference transform settings.
    #[serde(default)]
    pub images: ImagesConfig,

    /// Failure handling.
    #[serde(default)]
    pub run: RunPolicyConfig,
}

/// `[content]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Directory the documentation lives in.
    #[serde(default = "default_content_root")]
    pub root: PathBuf,

    /// Glob pattern, relative to `root`.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Glob patterns (relative to `root`) to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: default_content_root(),
            pattern: default_pattern(),
            exclude: Vec::new(),
        }
    }
}

fn default_content_root() -> PathBuf {
    PathBuf::from("content")
}
fn default_pattern() -> String {
    "**/*.mdx".into()
}

/// `[snapshots]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotsConfig {
    /// Whether the code snapshot transform runs.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory that `file=` references resolve against.
    #[serde(default = "default_snippets_base")]
    pub base_path: PathBuf,
}

impl Default for SnapshotsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_path: default_snippets_base(),
        }
    }
}

fn default_snippets_base() -> PathBuf {
    PathBuf::from("snippets")
}

/// `[images]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Whether the image reference transform runs.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory that absolute (`/images/...`) references resolve against.
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Name of the MDX image component whose `width`/`height` are maintained.
    #[serde(default = "default_component")]
    pub component: String,

    /// Convert markdown images into the image component in MDX documents.
    #[serde(default = "default_true")]
    pub convert_markdown: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            public_dir: default_public_dir(),
            component: default_component(),
            convert_markdown: true,
        }
    }
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}
fn default_component() -> String {
    "Image".into()
}
fn default_true() -> bool {
    true
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunPolicyConfig {
    /// `abort` stops at the first failing document, `continue` reports all.
    #[serde(default)]
    pub on_error: FailurePolicy,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the config file in the current working directory.
pub fn config_file_path() -> Result<PathBuf> {
    let cwd = std::env::current_dir()
        .map_err(|e| DocSyncError::config(format!("cannot determine working directory: {e}")))?;
    Ok(cwd.join(CONFIG_FILE_NAME))
}

/// Load the project config. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocSyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocSyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file into `dir`. Refuses to overwrite an existing one.
/// Returns the path to the created file.
pub fn init_config(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(DocSyncError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DocSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocSyncError::write(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("pattern"));
        assert!(toml_str.contains("on_error = \"abort\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.content.pattern, "**/*.mdx");
        assert_eq!(parsed.images.component, "Image");
        assert!(parsed.snapshots.enabled);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[content]
root = "docs/content"
exclude = ["drafts/**"]

[images]
enabled = false

[run]
on_error = "continue"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.content.root, PathBuf::from("docs/content"));
        assert_eq!(config.content.pattern, "**/*.mdx");
        assert_eq!(config.content.exclude, vec!["drafts/**"]);
        assert!(!config.images.enabled);
        assert!(config.images.convert_markdown);
        assert_eq!(config.snapshots.base_path, PathBuf::from("snippets"));
        assert_eq!(config.run.on_error, FailurePolicy::Continue);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[run]\non_error = \"retry\"\n").expect("write");

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn init_writes_loadable_defaults_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = init_config(dir.path()).expect("init");
        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded.images.public_dir, PathBuf::from("public"));

        assert!(init_config(dir.path()).is_err());
    }
}
