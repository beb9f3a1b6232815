//! Human-readable run summary.

use std::fmt::Write as _;

use docsync_shared::RunStats;

use crate::pipeline::RunReport;

fn section(out: &mut String, total: usize, updated: &[String], noun: &str) {
    let _ = writeln!(out, "✅ {total} {noun} parsed");
    if updated.is_empty() {
        let _ = writeln!(out, "✨ No {noun} were updated");
    } else {
        let _ = writeln!(out, "⚡️ {} updated:", updated.len());
        for id in updated {
            let _ = writeln!(out, "\t{id}");
        }
    }
}

/// Summary of snapshot and image counts, one line per updated reference.
pub fn summary(stats: &RunStats) -> String {
    let mut out = String::new();
    section(&mut out, stats.total_snapshots, &stats.updated_snapshots, "code snapshots");
    section(&mut out, stats.total_images, &stats.updated_images, "images");
    out
}

/// [`summary`] followed by document counts and timing.
pub fn render(report: &RunReport, write: bool) -> String {
    let mut out = summary(&report.stats);
    let action = if write { "written" } else { "would change" };
    let _ = writeln!(
        out,
        "📄 {} documents processed, {} {action}, {} failed ({:.2?})",
        report.documents,
        if write { report.written } else { report.changed },
        report.failures.len(),
        report.elapsed,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn nothing_updated() {
        let stats = RunStats {
            total_snapshots: 3,
            total_images: 0,
            ..Default::default()
        };
        assert_eq!(
            summary(&stats),
            "✅ 3 code snapshots parsed\n✨ No code snapshots were updated\n✅ 0 images parsed\n✨ No images were updated\n"
        );
    }

    #[test]
    fn lists_updated_references() {
        let mut stats = RunStats::default();
        stats.record_snapshot("/a.py#L1-3", true);
        stats.record_snapshot("/b.py", false);
        stats.record_image("/images/x.png", true);
        stats.record_image("./y.png", true);

        assert_eq!(
            summary(&stats),
            "✅ 2 code snapshots parsed\n⚡️ 1 updated:\n\t/a.py#L1-3\n\
             ✅ 2 images parsed\n⚡️ 2 updated:\n\t/images/x.png\n\t./y.png\n"
        );
    }

    #[test]
    fn render_reports_check_mode_changes() {
        let report = RunReport {
            documents: 4,
            changed: 2,
            written: 0,
            elapsed: Duration::from_millis(5),
            ..Default::default()
        };
        let text = render(&report, false);
        assert!(text.contains("4 documents processed, 2 would change, 0 failed"), "{text}");
    }
}
