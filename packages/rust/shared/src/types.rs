//! Core domain types for a docsync run.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RunStats
// ---------------------------------------------------------------------------

/// Counts of snapshot blocks and images seen, plus the identifiers of the ones
/// that were rewritten.
///
/// Every transform returns its own `RunStats`; the pipeline merges them in
/// document order. An identifier only lands in an `updated_*` list for a node
/// that was also counted in the matching total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_snapshots: usize,
    pub updated_snapshots: Vec<String>,
    pub total_images: usize,
    pub updated_images: Vec<String>,
}

impl RunStats {
    /// Additively merge `other` into `self` (counts summed, identifiers appended).
    pub fn merge(&mut self, other: RunStats) {
        self.total_snapshots += other.total_snapshots;
        self.updated_snapshots.extend(other.updated_snapshots);
        self.total_images += other.total_images;
        self.updated_images.extend(other.updated_images);
        debug_assert!(self.is_consistent());
    }

    /// Count a snapshot block, recording `id` when it was rewritten.
    pub fn record_snapshot(&mut self, id: impl Into<String>, updated: bool) {
        self.total_snapshots += 1;
        if updated {
            self.updated_snapshots.push(id.into());
        }
    }

    /// Count an image reference, recording `id` when it was rewritten.
    pub fn record_image(&mut self, id: impl Into<String>, updated: bool) {
        self.total_images += 1;
        if updated {
            self.updated_images.push(id.into());
        }
    }

    /// Whether anything was rewritten.
    pub fn has_updates(&self) -> bool {
        !self.updated_snapshots.is_empty() || !self.updated_images.is_empty()
    }

    /// `updated <= total` for both snapshots and images.
    pub fn is_consistent(&self) -> bool {
        self.updated_snapshots.len() <= self.total_snapshots
            && self.updated_images.len() <= self.total_images
    }
}

// ---------------------------------------------------------------------------
// FailurePolicy
// ---------------------------------------------------------------------------

/// What the pipeline does when a single document fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole run at the first failing document.
    #[default]
    Abort,
    /// Record the failure and move on to the next document.
    Continue,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Continue => f.write_str("continue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_concatenates_in_order() {
        let mut total = RunStats::default();

        let mut first = RunStats::default();
        first.record_snapshot("/a.py", true);
        first.record_snapshot("/b.py", false);
        first.record_image("/images/x.png", false);

        let mut second = RunStats::default();
        second.record_snapshot("/c.py", true);
        second.record_image("/images/y.png", true);

        total.merge(first);
        total.merge(second);

        assert_eq!(total.total_snapshots, 3);
        assert_eq!(total.updated_snapshots, vec!["/a.py", "/c.py"]);
        assert_eq!(total.total_images, 2);
        assert_eq!(total.updated_images, vec!["/images/y.png"]);
        assert!(total.is_consistent());
        assert!(total.has_updates());
    }

    #[test]
    fn empty_stats_have_no_updates() {
        let stats = RunStats::default();
        assert!(!stats.has_updates());
        assert!(stats.is_consistent());
    }

    #[test]
    fn failure_policy_parses_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            on_error: FailurePolicy,
        }
        let w: Wrapper = toml::from_str("on_error = \"continue\"").expect("parse");
        assert_eq!(w.on_error, FailurePolicy::Continue);
        assert_eq!(FailurePolicy::default().to_string(), "abort");
    }
}
