//! Image reference transform.
//!
//! Checks every local image a document points at, and keeps the reference in
//! canonical form:
//! - markdown images get a lexically clean path, and in MDX documents are
//!   turned into the image component with the asset's pixel size;
//! - image components get `width`/`height` matching the asset.
//!
//! Remote references (`https://`, `data:`, `//cdn...`) are left alone.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use docsync_markdown::mdast::{
    AttributeContent, AttributeValue, AttributeValueExpression, MdxJsxAttribute,
    MdxJsxTextElement, Node,
};
use docsync_markdown::{Document, Rewrite, Span, Syntax, visit};
use docsync_shared::{DocSyncError, Result, RunStats};
use tracing::{debug, instrument};
use url::Url;

/// Settings for the image transform.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    /// Directory absolute references (`/images/a.png`) resolve against.
    pub public_dir: PathBuf,
    /// JSX component whose `width`/`height` are maintained.
    pub component: String,
    /// Convert markdown images to the component in MDX documents.
    pub convert_markdown: bool,
}

// ---------------------------------------------------------------------------
// Reference helpers
// ---------------------------------------------------------------------------

/// Whether `reference` points at a file in the docs tree rather than a URL.
pub fn is_local(reference: &str) -> bool {
    !reference.is_empty() && !reference.starts_with("//") && Url::parse(reference).is_err()
}

/// Split off a `?query` or `#fragment` suffix.
fn split_suffix(reference: &str) -> (&str, &str) {
    match reference.find(['?', '#']) {
        Some(idx) => reference.split_at(idx),
        None => (reference, ""),
    }
}

/// Canonical spelling of a local reference: forward slashes, no `.` or empty
/// segments, `..` collapsed where a preceding segment allows it.
pub fn normalize_reference(reference: &str) -> String {
    let (path, suffix) = split_suffix(reference);
    let path = path.replace('\\', "/");
    let absolute = path.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(reference.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    out.push_str(suffix);
    out
}

/// File on disk a local reference points at.
pub fn resolve_reference(reference: &str, document: &Path, public_dir: &Path) -> PathBuf {
    let (path, _) = split_suffix(reference);
    let path = path.replace('\\', "/");
    match path.strip_prefix('/') {
        Some(rest) => public_dir.join(rest),
        None => document
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(path),
    }
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

async fn read_dimensions(path: &Path) -> std::result::Result<(u32, u32), String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// JSX attribute helpers
// ---------------------------------------------------------------------------

fn attribute<'a>(attributes: &'a [AttributeContent], name: &str) -> Option<&'a AttributeValue> {
    attributes.iter().find_map(|a| match a {
        AttributeContent::Property(p) if p.name == name => p.value.as_ref(),
        _ => None,
    })
}

fn numeric(value: Option<&AttributeValue>) -> Option<u32> {
    match value? {
        AttributeValue::Literal(s) => s.trim().parse().ok(),
        AttributeValue::Expression(e) => e.value.trim().parse().ok(),
    }
}

fn literal(name: &str, value: impl Into<String>) -> AttributeContent {
    AttributeContent::Property(MdxJsxAttribute {
        name: name.into(),
        value: Some(AttributeValue::Literal(value.into())),
    })
}

fn number(name: &str, value: u32) -> AttributeContent {
    AttributeContent::Property(MdxJsxAttribute {
        name: name.into(),
        value: Some(AttributeValue::Expression(AttributeValueExpression {
            value: value.to_string(),
            stops: vec![],
        })),
    })
}

/// Set (or append) a property, keeping attribute order otherwise intact.
fn set_attribute(attributes: &mut Vec<AttributeContent>, new: AttributeContent) {
    let AttributeContent::Property(new_prop) = &new else {
        attributes.push(new);
        return;
    };
    let existing = attributes.iter_mut().find(
        |a| matches!(a, AttributeContent::Property(p) if p.name == new_prop.name),
    );
    match existing {
        Some(slot) => *slot = new,
        None => attributes.push(new),
    }
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

enum Candidate {
    Markdown {
        span: Span,
        url: String,
        alt: String,
        title: Option<String>,
    },
    Component {
        span: Span,
        src: String,
        attributes: Vec<AttributeContent>,
    },
}

fn candidates(doc: &Document, component: &str) -> Vec<Candidate> {
    let mut found = Vec::new();
    visit(doc.root(), &mut |node| {
        let Some(span) = Span::of(node) else {
            return;
        };
        let element = match node {
            Node::Image(img) => {
                if is_local(&img.url) {
                    found.push(Candidate::Markdown {
                        span,
                        url: img.url.clone(),
                        alt: img.alt.clone(),
                        title: img.title.clone(),
                    });
                }
                return;
            }
            Node::MdxJsxFlowElement(el) => (&el.name, &el.attributes, &el.children),
            Node::MdxJsxTextElement(el) => (&el.name, &el.attributes, &el.children),
            _ => return,
        };

        let (name, attributes, children) = element;
        if name.as_deref() != Some(component) || !children.is_empty() {
            return;
        }
        if let Some(AttributeValue::Literal(src)) = attribute(attributes, "src")
            && is_local(src)
        {
            found.push(Candidate::Component {
                span,
                src: src.clone(),
                attributes: attributes.clone(),
            });
        }
    });
    found
}

/// Check and normalize every local image reference in `doc`.
#[instrument(skip_all, fields(path = %doc.path().display()))]
pub async fn sync_images(doc: &mut Document, opts: &ImageOptions) -> Result<RunStats> {
    let mut stats = RunStats::default();
    let document = doc.path().to_path_buf();

    for candidate in candidates(doc, &opts.component) {
        let reference = match &candidate {
            Candidate::Markdown { url, .. } => url.clone(),
            Candidate::Component { src, .. } => src.clone(),
        };

        let resolved = resolve_reference(&reference, &document, &opts.public_dir);
        let is_file = tokio::fs::metadata(&resolved)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(DocSyncError::AssetNotFound {
                document,
                reference,
                resolved,
            });
        }

        let dimensions = if is_svg(&resolved) {
            None
        } else {
            let dims = read_dimensions(&resolved)
                .await
                .map_err(|message| DocSyncError::InvalidAsset {
                    document: document.clone(),
                    reference: reference.clone(),
                    message,
                })?;
            Some(dims)
        };

        let canonical = normalize_reference(&reference);

        let updated = match candidate {
            Candidate::Markdown {
                span, alt, title, ..
            } => match dimensions {
                Some((width, height))
                    if opts.convert_markdown && doc.syntax() == Syntax::Mdx =>
                {
                    let mut attributes = vec![literal("alt", alt), literal("src", &canonical)];
                    if let Some(title) = title {
                        attributes.push(literal("title", title));
                    }
                    attributes.push(number("width", width));
                    attributes.push(number("height", height));

                    let name = opts.component.clone();
                    doc.rewrite(span, Rewrite::Element, |node| {
                        let position = node.position().cloned();
                        *node = Node::MdxJsxTextElement(MdxJsxTextElement {
                            children: vec![],
                            position,
                            name: Some(name),
                            attributes,
                        });
                    })
                }
                // The destination is only spliced when it is spelled literally
                // in the source (no escapes or entities).
                _ if canonical != reference
                    && doc.source()[span.start..span.end].contains(reference.as_str()) =>
                {
                    doc.rewrite(
                        span,
                        Rewrite::ImageDestination {
                            original: reference.clone(),
                        },
                        |node| {
                            if let Node::Image(img) = node {
                                img.url = canonical.clone();
                            }
                        },
                    )
                }
                _ => false,
            },
            Candidate::Component {
                span,
                mut attributes,
                ..
            } => {
                let mut changed = false;
                if canonical != reference {
                    set_attribute(&mut attributes, literal("src", &canonical));
                    changed = true;
                }
                if let Some((width, height)) = dimensions {
                    if numeric(attribute(&attributes, "width")) != Some(width) {
                        set_attribute(&mut attributes, number("width", width));
                        changed = true;
                    }
                    if numeric(attribute(&attributes, "height")) != Some(height) {
                        set_attribute(&mut attributes, number("height", height));
                        changed = true;
                    }
                }
                changed
                    && doc.rewrite(span, Rewrite::Element, |node| match node {
                        Node::MdxJsxFlowElement(el) => el.attributes = attributes,
                        Node::MdxJsxTextElement(el) => el.attributes = attributes,
                        _ => {}
                    })
            }
        };

        debug!(reference = %reference, resolved = %resolved.display(), updated, "image checked");
        stats.record_image(reference, updated);
    }

    Ok(stats)
}
