//! Documentation source enumeration.
//!
//! Expands `<root>/<pattern>` into the list of documents a run should touch,
//! dropping anything matched by an exclude pattern. Paths are yielded lazily,
//! in the order the glob engine walks the tree (alphabetical per directory).

use std::path::{Path, PathBuf};

use docsync_shared::{DocSyncError, Result};
use glob::{MatchOptions, Pattern, Paths};
use tracing::{debug, instrument, trace};

/// Glob options shared by include and exclude patterns: `*` stops at `/`,
/// hidden files need an explicit leading dot.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What to enumerate.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Content root directory.
    pub root: PathBuf,
    /// Include pattern, relative to `root`.
    pub pattern: String,
    /// Exclude patterns, relative to `root`.
    pub exclude: Vec<String>,
}

// ---------------------------------------------------------------------------
// DocumentSource
// ---------------------------------------------------------------------------

/// Lazy iterator over the documents matched by a [`DiscoveryOptions`].
pub struct DocumentSource {
    root: PathBuf,
    paths: Paths,
    exclude: Vec<Pattern>,
}

impl std::fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSource")
            .field("root", &self.root)
            .field("exclude", &self.exclude)
            .finish_non_exhaustive()
    }
}

impl DocumentSource {
    fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.exclude
            .iter()
            .any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
    }
}

impl Iterator for DocumentSource {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let path = match self.paths.next()? {
                Ok(path) => path,
                Err(e) => {
                    return Some(Err(DocSyncError::discovery(format!(
                        "cannot read {}: {}",
                        e.path().display(),
                        e.error()
                    ))));
                }
            };

            if !path.is_file() {
                trace!(?path, "skipping non-file match");
                continue;
            }
            if self.is_excluded(&path) {
                debug!(?path, "excluded");
                continue;
            }
            return Some(Ok(path));
        }
    }
}

/// Start enumerating documents.
///
/// Fails up front if the root does not exist or a pattern is malformed;
/// per-entry read errors surface through the iterator.
#[instrument(skip_all, fields(root = %opts.root.display(), pattern = %opts.pattern))]
pub fn enumerate(opts: &DiscoveryOptions) -> Result<DocumentSource> {
    if !opts.root.is_dir() {
        return Err(DocSyncError::discovery(format!(
            "content root {} is not a directory",
            opts.root.display()
        )));
    }

    let root_str = opts.root.to_string_lossy();
    let full = format!(
        "{}/{}",
        Pattern::escape(root_str.trim_end_matches('/')),
        opts.pattern.trim_start_matches('/')
    );

    let paths = glob::glob_with(&full, MATCH_OPTIONS)
        .map_err(|e| DocSyncError::discovery(format!("invalid pattern '{}': {e}", opts.pattern)))?;

    let exclude = opts
        .exclude
        .iter()
        .map(|p| {
            Pattern::new(p)
                .map_err(|e| DocSyncError::discovery(format!("invalid exclude pattern '{p}': {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(pattern = %full, excludes = exclude.len(), "enumerating documents");

    Ok(DocumentSource {
        root: opts.root.clone(),
        paths,
        exclude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "# doc\n").unwrap();
    }

    fn names(root: &Path, opts: &DiscoveryOptions) -> Vec<String> {
        enumerate(opts)
            .expect("enumerate")
            .map(|p| {
                p.expect("entry")
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn finds_nested_mdx_in_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.mdx");
        touch(dir.path(), "a.mdx");
        touch(dir.path(), "guides/intro.mdx");
        touch(dir.path(), "guides/notes.md");

        let opts = DiscoveryOptions {
            root: dir.path().to_path_buf(),
            pattern: "**/*.mdx".into(),
            exclude: vec![],
        };
        assert_eq!(
            names(dir.path(), &opts),
            vec!["a.mdx", "b.mdx", "guides/intro.mdx"]
        );
    }

    #[test]
    fn exclude_patterns_are_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "keep.mdx");
        touch(dir.path(), "drafts/wip.mdx");

        let opts = DiscoveryOptions {
            root: dir.path().to_path_buf(),
            pattern: "**/*.mdx".into(),
            exclude: vec!["drafts/**".into()],
        };
        assert_eq!(names(dir.path(), &opts), vec!["keep.mdx"]);
    }

    #[test]
    fn hidden_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".cache/page.mdx");
        touch(dir.path(), "page.mdx");

        let opts = DiscoveryOptions {
            root: dir.path().to_path_buf(),
            pattern: "**/*.mdx".into(),
            exclude: vec![],
        };
        assert_eq!(names(dir.path(), &opts), vec!["page.mdx"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let opts = DiscoveryOptions {
            root: PathBuf::from("/definitely/not/here"),
            pattern: "**/*.mdx".into(),
            exclude: vec![],
        };
        let err = enumerate(&opts).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn bad_exclude_pattern_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let opts = DiscoveryOptions {
            root: dir.path().to_path_buf(),
            pattern: "**/*.mdx".into(),
            exclude: vec!["[".into()],
        };
        assert!(enumerate(&opts).is_err());
    }
}
