//! Markdown/MDX document parsing and source-preserving printing.
//!
//! Documents are parsed into an mdast tree with the `markdown` crate. Transforms
//! mutate that tree through [`Document`] and record which nodes they touched;
//! [`Document::print`] then re-renders only those nodes and copies every other
//! byte of the original source through unchanged, so an untouched document
//! prints back identically.

mod document;
mod frontmatter;
mod printer;
mod tree;

use std::path::Path;

pub use document::{Document, Rewrite};
pub use frontmatter::parse_frontmatter;
pub use markdown::mdast;
pub use tree::{Span, visit};

/// Markup flavour of a document, picked from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// CommonMark + GFM + frontmatter.
    Markdown,
    /// MDX: markdown plus JSX, ESM and expressions.
    Mdx,
}

impl Syntax {
    /// `.mdx` files are MDX, everything else is plain markdown.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("mdx") => Self::Mdx,
            _ => Self::Markdown,
        }
    }

    /// Convert to markdown-rs `ParseOptions`.
    pub fn parse_options(self) -> markdown::ParseOptions {
        let mut constructs = markdown::Constructs {
            frontmatter: true,
            ..markdown::Constructs::gfm()
        };

        if self == Self::Mdx {
            // MDX replaces raw HTML and indented code with JSX and expressions.
            constructs.autolink = false;
            constructs.code_indented = false;
            constructs.html_flow = false;
            constructs.html_text = false;
            constructs.mdx_esm = true;
            constructs.mdx_expression_flow = true;
            constructs.mdx_expression_text = true;
            constructs.mdx_jsx_flow = true;
            constructs.mdx_jsx_text = true;
        }

        markdown::ParseOptions {
            constructs,
            ..markdown::ParseOptions::gfm()
        }
    }
}
