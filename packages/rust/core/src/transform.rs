//! The ordered list of document transforms.

use docsync_markdown::Document;
use docsync_shared::{Result, RunStats};

use crate::images::{self, ImageOptions};
use crate::snapshot::{self, SnapshotOptions};

/// A single rewrite pass over a parsed document.
#[derive(Debug, Clone)]
pub enum Transform {
    CodeSnapshots(SnapshotOptions),
    ImageReferences(ImageOptions),
}

impl Transform {
    /// Stage name used in logs and error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CodeSnapshots(_) => "code-snapshots",
            Self::ImageReferences(_) => "image-references",
        }
    }

    /// Run this transform over `doc`, returning the stats for this document only.
    pub async fn apply(&self, doc: &mut Document) -> Result<RunStats> {
        match self {
            Self::CodeSnapshots(opts) => snapshot::sync_snapshots(doc, opts).await,
            Self::ImageReferences(opts) => images::sync_images(doc, opts).await,
        }
    }
}
