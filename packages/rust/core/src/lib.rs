//! Document transforms and the sync pipeline for docsync.
//!
//! Ties discovery, parsing and printing together: every enumerated document
//! goes through the code snapshot and image reference transforms, in that
//! order, and is written back (see [`pipeline::run`]).

pub mod images;
pub mod pipeline;
pub mod report;
pub mod snapshot;
pub mod transform;

pub use pipeline::{
    DocumentFailure, ProgressReporter, RunReport, SilentProgress, SyncConfig, run,
};
pub use transform::Transform;
