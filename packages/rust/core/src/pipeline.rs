//! End-to-end run: discover → read → parse → transform → print → write.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use docsync_discovery::DiscoveryOptions;
use docsync_markdown::Document;
use docsync_shared::{AppConfig, DocSyncError, FailurePolicy, Result, RunStats};

use crate::images::ImageOptions;
use crate::snapshot::SnapshotOptions;
use crate::transform::Transform;

/// Runtime configuration for a sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory documents are enumerated under.
    pub content_root: PathBuf,
    /// Include glob, relative to `content_root`.
    pub pattern: String,
    /// Exclude globs, relative to `content_root`.
    pub exclude: Vec<String>,
    /// Code snapshot transform, `None` when disabled.
    pub snapshots: Option<SnapshotOptions>,
    /// Image reference transform, `None` when disabled.
    pub images: Option<ImageOptions>,
    /// What to do when a document fails.
    pub on_error: FailurePolicy,
    /// Write updated documents back (`false` for check mode).
    pub write: bool,
}

impl From<&AppConfig> for SyncConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            content_root: config.content.root.clone(),
            pattern: config.content.pattern.clone(),
            exclude: config.content.exclude.clone(),
            snapshots: config.snapshots.enabled.then(|| SnapshotOptions {
                base_path: config.snapshots.base_path.clone(),
            }),
            images: config.images.enabled.then(|| ImageOptions {
                public_dir: config.images.public_dir.clone(),
                component: config.images.component.clone(),
                convert_markdown: config.images.convert_markdown,
            }),
            on_error: config.run.on_error,
            write: true,
        }
    }
}

impl SyncConfig {
    /// Enabled transforms, in the order they run.
    pub fn transforms(&self) -> Vec<Transform> {
        let mut transforms = Vec::with_capacity(2);
        if let Some(opts) = &self.snapshots {
            transforms.push(Transform::CodeSnapshots(opts.clone()));
        }
        if let Some(opts) = &self.images {
            transforms.push(Transform::ImageReferences(opts.clone()));
        }
        transforms
    }

    pub fn discovery(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            root: self.content_root.clone(),
            pattern: self.pattern.clone(),
            exclude: self.exclude.clone(),
        }
    }
}

/// A document that could not be processed under [`FailurePolicy::Continue`].
#[derive(Debug)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: DocSyncError,
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Stats merged over every successfully processed document.
    pub stats: RunStats,
    /// Documents processed successfully.
    pub documents: usize,
    /// Documents whose printed text differs from what was read.
    pub changed: usize,
    /// Documents written back to disk.
    pub written: usize,
    pub failures: Vec<DocumentFailure>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a document is read.
    fn document_started(&self, path: &Path, index: usize);
    /// Called after a document has been processed (successfully or not).
    fn document_finished(
        &self,
        path: &Path,
        outcome: std::result::Result<&RunStats, &DocSyncError>,
    );
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn document_started(&self, _path: &Path, _index: usize) {}
    fn document_finished(
        &self,
        _path: &Path,
        _outcome: std::result::Result<&RunStats, &DocSyncError>,
    ) {
    }
    fn done(&self, _report: &RunReport) {}
}

/// Result of processing one document.
#[derive(Debug)]
struct DocumentOutcome {
    stats: RunStats,
    changed: bool,
    written: bool,
}

/// Run every enabled transform over every enumerated document, one document
/// at a time.
///
/// Under [`FailurePolicy::Abort`] the first failing document ends the run with
/// its error; nothing of that document is written. Under
/// [`FailurePolicy::Continue`] the failure is recorded and the run moves on.
#[instrument(skip_all, fields(root = %config.content_root.display(), pattern = %config.pattern))]
pub async fn run(config: &SyncConfig, progress: &dyn ProgressReporter) -> Result<RunReport> {
    let start = Instant::now();
    let transforms = config.transforms();
    let documents = docsync_discovery::enumerate(&config.discovery())?;

    info!(
        transforms = ?transforms.iter().map(Transform::name).collect::<Vec<_>>(),
        write = config.write,
        "starting sync"
    );

    let mut report = RunReport::default();

    for (index, path) in documents.enumerate() {
        let path = path?;
        progress.document_started(&path, index);

        match process_document(&path, &transforms, config.write).await {
            Ok(outcome) => {
                progress.document_finished(&path, Ok(&outcome.stats));
                report.stats.merge(outcome.stats);
                report.documents += 1;
                report.changed += usize::from(outcome.changed);
                report.written += usize::from(outcome.written);
            }
            Err(error) => {
                progress.document_finished(&path, Err(&error));
                match config.on_error {
                    FailurePolicy::Abort => return Err(error),
                    FailurePolicy::Continue => {
                        warn!(
                            path = %path.display(),
                            stage = error.stage(),
                            error = %error,
                            "document failed, continuing"
                        );
                        report.failures.push(DocumentFailure { path, error });
                    }
                }
            }
        }
    }

    report.elapsed = start.elapsed();
    progress.done(&report);

    info!(
        documents = report.documents,
        changed = report.changed,
        written = report.written,
        failures = report.failures.len(),
        total_snapshots = report.stats.total_snapshots,
        updated_snapshots = report.stats.updated_snapshots.len(),
        total_images = report.stats.total_images,
        updated_images = report.stats.updated_images.len(),
        elapsed_ms = report.elapsed.as_millis(),
        "sync complete"
    );

    Ok(report)
}

#[instrument(skip(path, transforms), fields(path = %path.display()))]
async fn process_document(
    path: &Path,
    transforms: &[Transform],
    write: bool,
) -> Result<DocumentOutcome> {
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DocSyncError::io(path, e))?;

    let mut doc = Document::parse(path, source)?;

    let mut stats = RunStats::default();
    for transform in transforms {
        let partial = transform.apply(&mut doc).await?;
        debug!(
            transform = transform.name(),
            snapshots = partial.total_snapshots,
            images = partial.total_images,
            "transform applied"
        );
        stats.merge(partial);
    }

    let printed = doc.print()?;
    let changed = printed != doc.source();

    // Unchanged documents are still rewritten in place; the bytes are identical.
    if write {
        tokio::fs::write(path, printed)
            .await
            .map_err(|e| DocSyncError::write(path, e))?;
    }

    Ok(DocumentOutcome {
        stats,
        changed,
        written: write,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_follow_enable_flags_in_order() {
        let mut app = AppConfig::default();
        let config = SyncConfig::from(&app);
        let names: Vec<_> = config.transforms().iter().map(Transform::name).collect();
        assert_eq!(names, vec!["code-snapshots", "image-references"]);

        app.snapshots.enabled = false;
        let config = SyncConfig::from(&app);
        let names: Vec<_> = config.transforms().iter().map(Transform::name).collect();
        assert_eq!(names, vec!["image-references"]);
    }

    #[test]
    fn config_carries_policy_and_paths() {
        let mut app = AppConfig::default();
        app.run.on_error = FailurePolicy::Continue;
        app.images.component = "Figure".into();

        let config = SyncConfig::from(&app);
        assert_eq!(config.on_error, FailurePolicy::Continue);
        assert_eq!(config.content_root, PathBuf::from("content"));
        assert_eq!(config.images.unwrap().component, "Figure");
        assert!(config.write);
    }

    #[tokio::test]
    async fn unreadable_document_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = process_document(&dir.path().join("gone.mdx"), &[], true)
            .await
            .unwrap_err();
        assert_eq!(err.stage(), "read");
    }
}
