use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use docsync_shared::{DocSyncError, Result, SourceLocation};
use markdown::mdast::Node;
use markdown::message::{Message, Place};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use crate::Syntax;
use crate::frontmatter::parse_frontmatter;
use crate::printer;
use crate::tree::{self, Span};

/// How a rewritten node is rendered back into source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// A fenced `Code` node whose value changed. The fences stay as written.
    CodeContent,
    /// A markdown `Image` whose destination changed from `original`.
    ImageDestination { original: String },
    /// A node now represented by an MDX JSX element, printed in full.
    Element,
}

impl Rewrite {
    /// Which node a rewrite of this kind may target.
    fn targets(&self, node: &Node) -> bool {
        match self {
            Self::CodeContent => matches!(node, Node::Code(_)),
            Self::ImageDestination { .. } => matches!(node, Node::Image(_)),
            Self::Element => matches!(
                node,
                Node::Image(_) | Node::MdxJsxFlowElement(_) | Node::MdxJsxTextElement(_)
            ),
        }
    }
}

/// A parsed documentation file.
///
/// Holds the original text alongside the mdast tree. Transforms mutate nodes
/// through [`Document::rewrite`], which also remembers the node's span so the
/// printer knows which regions to regenerate.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    source: String,
    syntax: Syntax,
    frontmatter: JsonValue,
    root: Node,
    rewrites: BTreeMap<Span, Rewrite>,
}

impl Document {
    /// Parse `source` as the document at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), bytes = source.len()))]
    pub fn parse(path: impl AsRef<Path>, source: String) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let syntax = Syntax::from_path(&path);

        let root = markdown::to_mdast(&source, &syntax.parse_options()).map_err(|msg| {
            DocSyncError::parse(&path, message_location(&msg), msg.to_string())
        })?;

        let frontmatter =
            parse_frontmatter(&root).map_err(|msg| DocSyncError::parse(&path, None, msg))?;

        debug!(?syntax, title = ?frontmatter.get("title"), "parsed document");

        Ok(Self {
            path,
            source,
            syntax,
            frontmatter,
            root,
            rewrites: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The text the document was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// Frontmatter as a JSON object (empty when the document has none).
    pub fn frontmatter(&self) -> &JsonValue {
        &self.frontmatter
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Number of nodes rewritten so far.
    pub fn rewrite_count(&self) -> usize {
        self.rewrites.len()
    }

    /// Mutate the node at `span` and mark it for re-rendering as `kind`.
    ///
    /// Returns `false` (and records nothing) if no node of the right type sits
    /// at `span`.
    pub fn rewrite(&mut self, span: Span, kind: Rewrite, f: impl FnOnce(&mut Node)) -> bool {
        let Some(node) = tree::find_mut(&mut self.root, span, &|n| kind.targets(n)) else {
            return false;
        };
        f(node);
        self.rewrites.insert(span, kind);
        true
    }

    /// Serialize the document.
    ///
    /// Text outside rewritten nodes is copied verbatim, so a document with no
    /// rewrites prints back byte-for-byte.
    pub fn print(&self) -> Result<String> {
        if self.rewrites.is_empty() {
            return Ok(self.source.clone());
        }

        let eol = if self.source.contains("\r\n") { "\r\n" } else { "\n" };
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;

        for (span, kind) in &self.rewrites {
            let node = tree::find(&self.root, *span, &|n| kind.targets(n)).ok_or_else(|| {
                self.print_error(*span, "rewritten node is no longer in the tree")
            })?;

            let original = &self.source[span.start..span.end];
            let rendered = match (kind, node) {
                (Rewrite::CodeContent, Node::Code(code)) => {
                    let prefix = printer::line_prefix(&self.source, span.start);
                    printer::render_code(original, &code.value, prefix, eol)
                }
                (Rewrite::ImageDestination { original: old }, Node::Image(image)) => {
                    printer::replace_destination(original, old, &image.url)
                        .ok_or_else(|| self.print_error(*span, "cannot locate image destination"))?
                }
                (Rewrite::Element, Node::MdxJsxFlowElement(el)) => {
                    printer::render_jsx(el.name.as_deref(), &el.attributes)
                }
                (Rewrite::Element, Node::MdxJsxTextElement(el)) => {
                    printer::render_jsx(el.name.as_deref(), &el.attributes)
                }
                _ => return Err(self.print_error(*span, "node cannot be rendered")),
            };

            out.push_str(&self.source[cursor..span.start]);
            out.push_str(&rendered);
            cursor = span.end;
        }

        out.push_str(&self.source[cursor..]);
        Ok(out)
    }

    fn print_error(&self, span: Span, msg: &str) -> DocSyncError {
        let before = &self.source[..span.start];
        let line = before.matches('\n').count() + 1;
        let column = before.len() - before.rfind('\n').map_or(0, |i| i + 1) + 1;
        DocSyncError::parse(&self.path, Some(SourceLocation::new(line, column)), msg)
    }
}

fn message_location(message: &Message) -> Option<SourceLocation> {
    message.place.as_ref().map(|place| match place.as_ref() {
        Place::Point(point) => SourceLocation::new(point.line, point.column),
        Place::Position(position) => {
            SourceLocation::new(position.start.line, position.start.column)
        }
    })
}
