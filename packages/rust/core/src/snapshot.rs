//! Code snapshot transform.
//!
//! A fenced code block becomes a snapshot of an external file when its info
//! string carries `file=<path>`:
//!
//! ````text
//! ```python file=/concepts/ops.py startafter=start_op endbefore=end_op dedent=4
//! ...
//! ```
//! ````
//!
//! The transform re-extracts the referenced region and replaces the block's
//! content whenever it has drifted.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use docsync_markdown::mdast::Node;
use docsync_markdown::{Document, Rewrite, Span, visit};
use docsync_shared::{DocSyncError, Result, RunStats};
use regex::Regex;
use tracing::{debug, instrument};

/// Settings for the snapshot transform.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    /// Directory `file=` references resolve against.
    pub base_path: PathBuf,
}

// ---------------------------------------------------------------------------
// SnippetRef
// ---------------------------------------------------------------------------

/// Where a snapshot block's content comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetRef {
    /// Path relative to the snippet base (a leading `/` is ignored).
    pub file: String,
    /// Line ranges, e.g. `1-5,8`.
    pub lines: Option<String>,
    /// Keep lines after the first line containing this marker.
    pub start_after: Option<String>,
    /// Keep lines before the first line containing this marker.
    pub end_before: Option<String>,
    /// Strip up to this many leading spaces from each line.
    pub dedent: Option<usize>,
    /// Trim surrounding whitespace of the extracted snippet.
    pub trim: bool,
}

impl SnippetRef {
    /// Parse a code block's info-string meta. `Ok(None)` when the block is not
    /// a snapshot (no `file=`).
    pub fn from_meta(meta: &str) -> std::result::Result<Option<Self>, String> {
        static META_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r#"([A-Za-z_][\w-]*)=(?:"([^"]*)"|(\S+))"#).expect("valid regex")
        });

        let mut snippet = SnippetRef::default();
        let mut has_file = false;
        let mut dedent = None;

        for caps in META_RE.captures_iter(meta) {
            let key = &caps[1];
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map_or("", |m| m.as_str())
                .to_string();

            match key {
                "file" => {
                    has_file = true;
                    snippet.file = value;
                }
                "lines" => snippet.lines = Some(value),
                "startafter" => snippet.start_after = Some(value),
                "endbefore" => snippet.end_before = Some(value),
                "dedent" => dedent = Some(value),
                "trim" => snippet.trim = value == "true",
                _ => {}
            }
        }

        if !has_file {
            return Ok(None);
        }
        if let Some(value) = dedent {
            let n = value
                .parse()
                .map_err(|_| format!("dedent must be a number, got '{value}'"))?;
            snippet.dedent = Some(n);
        }
        if snippet.file.is_empty() {
            return Err("empty file= reference".into());
        }
        Ok(Some(snippet))
    }

    /// Identifier used in reports: the file plus any locator.
    pub fn id(&self) -> String {
        let mut id = self.file.clone();
        if let Some(lines) = &self.lines {
            id.push_str("#L");
            id.push_str(lines);
        }
        if self.start_after.is_some() || self.end_before.is_some() {
            id.push('#');
            id.push_str(self.start_after.as_deref().unwrap_or_default());
            id.push_str("..");
            id.push_str(self.end_before.as_deref().unwrap_or_default());
        }
        id
    }

    /// Absolute location of the referenced file.
    pub fn resolve(&self, base: &Path) -> PathBuf {
        base.join(self.file.trim_start_matches('/'))
    }

    /// Cut the referenced region out of the file's content.
    ///
    /// Locators apply in the order lines, startafter, endbefore, dedent, trim.
    /// The result is normalized (LF line endings, no trailing newlines).
    pub fn extract(&self, content: &str) -> std::result::Result<String, String> {
        let text = normalize(content);
        let mut lines: Vec<&str> = if text.is_empty() {
            Vec::new()
        } else {
            text.split('\n').collect()
        };

        if let Some(ranges) = &self.lines {
            lines = select_lines(&lines, ranges)?;
        }

        if let Some(marker) = &self.start_after {
            let idx = lines
                .iter()
                .position(|l| l.contains(marker.as_str()))
                .ok_or_else(|| format!("start marker '{marker}' not found"))?;
            lines.drain(..=idx);
        }

        if let Some(marker) = &self.end_before {
            let idx = lines
                .iter()
                .position(|l| l.contains(marker.as_str()))
                .ok_or_else(|| format!("end marker '{marker}' not found"))?;
            lines.truncate(idx);
        }

        let mut out = match self.dedent {
            Some(n) => lines
                .iter()
                .map(|l| dedent_line(l, n))
                .collect::<Vec<_>>()
                .join("\n"),
            None => lines.join("\n"),
        };

        if self.trim {
            out = out.trim().to_string();
        }

        Ok(normalize(&out))
    }
}

/// Comparison form shared by block content and extracted snippets:
/// LF line endings, trailing newlines dropped.
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").trim_end_matches('\n').to_string()
}

fn dedent_line(line: &str, n: usize) -> &str {
    let spaces = line.bytes().take(n).take_while(|b| *b == b' ').count();
    &line[spaces..]
}

fn select_lines<'a>(lines: &[&'a str], ranges: &str) -> std::result::Result<Vec<&'a str>, String> {
    let mut out = Vec::new();
    for part in ranges.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (from, to) = match part.split_once('-') {
            Some((a, b)) => (parse_line_number(a)?, parse_line_number(b)?),
            None => {
                let n = parse_line_number(part)?;
                (n, n)
            }
        };
        if from > to || to > lines.len() {
            return Err(format!(
                "line range {part} out of bounds (file has {} lines)",
                lines.len()
            ));
        }
        out.extend_from_slice(&lines[from - 1..to]);
    }
    Ok(out)
}

fn parse_line_number(s: &str) -> std::result::Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("invalid line number '{s}'")),
    }
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

struct Candidate {
    span: Span,
    meta: String,
    value: String,
}

fn candidates(doc: &Document) -> Vec<Candidate> {
    let mut found = Vec::new();
    visit(doc.root(), &mut |node| {
        if let Node::Code(code) = node
            && let (Some(meta), Some(span)) = (&code.meta, Span::of(node))
        {
            found.push(Candidate {
                span,
                meta: meta.clone(),
                value: code.value.clone(),
            });
        }
    });
    found
}

/// Bring every snapshot block in `doc` in line with its source file.
#[instrument(skip_all, fields(path = %doc.path().display()))]
pub async fn sync_snapshots(doc: &mut Document, opts: &SnapshotOptions) -> Result<RunStats> {
    let mut stats = RunStats::default();
    let document = doc.path().to_path_buf();

    for candidate in candidates(doc) {
        let not_found = |reference: &str, reason: String| DocSyncError::SourceNotFound {
            document: document.clone(),
            reference: reference.to_string(),
            reason,
        };

        let snippet = match SnippetRef::from_meta(&candidate.meta) {
            Ok(Some(snippet)) => snippet,
            Ok(None) => continue,
            Err(reason) => return Err(not_found(&candidate.meta, reason)),
        };
        let id = snippet.id();

        let path = snippet.resolve(&opts.base_path);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            let reason = match e.kind() {
                std::io::ErrorKind::NotFound => format!("{} does not exist", path.display()),
                _ => format!("cannot read {}: {e}", path.display()),
            };
            not_found(&id, reason)
        })?;

        let fresh = snippet.extract(&content).map_err(|reason| not_found(&id, reason))?;
        let updated = normalize(&candidate.value) != fresh;

        if updated {
            doc.rewrite(candidate.span, Rewrite::CodeContent, |node| {
                if let Node::Code(code) = node {
                    code.value = fresh;
                }
            });
        }

        debug!(snippet = %id, updated, "snapshot checked");
        stats.record_snapshot(id, updated);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "import os\n\n# start_op\ndef op():\n    return 1\n# end_op\n\nprint(op())\n";

    fn meta(s: &str) -> SnippetRef {
        SnippetRef::from_meta(s).unwrap().unwrap()
    }

    #[test]
    fn parses_meta_options() {
        let r = meta(
            r#"file=/concepts/ops.py startafter=start_op endbefore="end op" dedent=4 trim=true title=x"#,
        );
        assert_eq!(r.file, "/concepts/ops.py");
        assert_eq!(r.start_after.as_deref(), Some("start_op"));
        assert_eq!(r.end_before.as_deref(), Some("end op"));
        assert_eq!(r.dedent, Some(4));
        assert!(r.trim);
        assert_eq!(r.id(), "/concepts/ops.py#start_op..end op");
    }

    #[test]
    fn meta_without_file_is_not_a_snapshot() {
        assert_eq!(SnippetRef::from_meta("title=\"x\" showLineNumbers").unwrap(), None);
        assert_eq!(SnippetRef::from_meta("dedent=four").unwrap(), None);
        assert!(SnippetRef::from_meta("file=a.py dedent=four").is_err());
    }

    #[test]
    fn whole_file_drops_trailing_newline() {
        let r = meta("file=a.py");
        assert_eq!(r.extract("a\r\nb\r\n\n").unwrap(), "a\nb");
        assert_eq!(r.id(), "a.py");
    }

    #[test]
    fn markers_select_the_region() {
        let r = meta("file=a.py startafter=start_op endbefore=end_op");
        assert_eq!(r.extract(SOURCE).unwrap(), "def op():\n    return 1");
    }

    #[test]
    fn dedent_strips_at_most_n_spaces() {
        let r = meta("file=a.py lines=4-5 dedent=4");
        assert_eq!(r.extract(SOURCE).unwrap(), "def op():\nreturn 1");
        assert_eq!(r.id(), "a.py#L4-5");
    }

    #[test]
    fn lines_follow_given_order() {
        let r = meta("file=a.py lines=8,1");
        assert_eq!(r.extract(SOURCE).unwrap(), "print(op())\nimport os");
    }

    #[test]
    fn trim_removes_surrounding_blank_lines() {
        let r = meta("file=a.py lines=1-3 trim=true");
        assert_eq!(r.extract(SOURCE).unwrap(), "import os\n\n# start_op");
    }

    #[test]
    fn missing_marker_and_bad_ranges_fail() {
        assert!(meta("file=a.py startafter=nope").extract(SOURCE).is_err());
        assert!(meta("file=a.py endbefore=nope").extract(SOURCE).is_err());
        assert!(meta("file=a.py lines=5-99").extract(SOURCE).is_err());
        assert!(meta("file=a.py lines=0-1").extract(SOURCE).is_err());
        assert!(meta("file=a.py lines=3-2").extract(SOURCE).is_err());
    }

    async fn run(
        doc_src: &str,
        files: &[(&str, &str)],
    ) -> (Result<RunStats>, Document, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            let p = dir.path().join(name);
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
            std::fs::write(p, body).unwrap();
        }
        let mut doc = Document::parse("page.mdx", doc_src.to_string()).unwrap();
        let opts = SnapshotOptions {
            base_path: dir.path().to_path_buf(),
        };
        let stats = sync_snapshots(&mut doc, &opts).await;
        (stats, doc, dir)
    }

    #[tokio::test]
    async fn stale_block_is_rewritten_once() {
        let src = "# Ops\n\n```python file=/ops.py startafter=start_op endbefore=end_op\nstale\n```\n";
        let (stats, doc, _dir) = run(src, &[("ops.py", SOURCE)]).await;
        let stats = stats.unwrap();

        assert_eq!(stats.total_snapshots, 1);
        assert_eq!(stats.updated_snapshots, vec!["/ops.py#start_op..end_op"]);
        assert_eq!(
            doc.print().unwrap(),
            "# Ops\n\n```python file=/ops.py startafter=start_op endbefore=end_op\ndef op():\n    return 1\n```\n"
        );
    }

    #[tokio::test]
    async fn matching_block_is_left_alone() {
        let src = "```python file=/ops.py lines=1\nimport os\n```\n\n```python\nplain\n```\n";
        let (stats, doc, _dir) = run(src, &[("ops.py", SOURCE)]).await;
        let stats = stats.unwrap();

        assert_eq!(stats.total_snapshots, 1);
        assert!(stats.updated_snapshots.is_empty());
        assert_eq!(doc.rewrite_count(), 0);
        assert_eq!(doc.print().unwrap(), src);
    }

    #[tokio::test]
    async fn fenced_snippet_stays_inside_its_block() {
        let readme = "Usage:\n```\nrun()\n```\nend\n";
        let src = "```md file=/readme.md\nstale\n```\n";
        let (stats, doc, dir) = run(src, &[("readme.md", readme)]).await;
        assert_eq!(stats.unwrap().updated_snapshots, vec!["/readme.md"]);

        let printed = doc.print().unwrap();
        assert_eq!(printed, "````md file=/readme.md\nUsage:\n```\nrun()\n```\nend\n````\n");

        let mut reparsed = Document::parse("page.mdx", printed.clone()).unwrap();
        let opts = SnapshotOptions {
            base_path: dir.path().to_path_buf(),
        };
        let stats = sync_snapshots(&mut reparsed, &opts).await.unwrap();
        assert_eq!(stats.total_snapshots, 1);
        assert!(stats.updated_snapshots.is_empty());
        assert_eq!(reparsed.print().unwrap(), printed);
    }

    #[tokio::test]
    async fn missing_file_is_source_not_found() {
        let src = "```python file=/gone.py\nx\n```\n";
        let (stats, _doc, _dir) = run(src, &[]).await;
        match stats.unwrap_err() {
            DocSyncError::SourceNotFound { reference, reason, .. } => {
                assert_eq!(reference, "/gone.py");
                assert!(reason.contains("does not exist"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_marker_is_source_not_found() {
        let src = "```python file=/ops.py startafter=missing\nx\n```\n";
        let (stats, _doc, _dir) = run(src, &[("ops.py", SOURCE)]).await;
        assert!(matches!(stats, Err(DocSyncError::SourceNotFound { .. })));
    }
}
