//! mdast traversal helpers.

use markdown::mdast::Node;

/// Byte range of a node in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// The span of `node`, if the parser recorded a position for it.
    pub fn of(node: &Node) -> Option<Self> {
        node.position().map(|p| Self {
            start: p.start.offset,
            end: p.end.offset,
        })
    }
}

/// Depth-first, pre-order walk over `node` and all its descendants.
pub fn visit<'a>(node: &'a Node, f: &mut impl FnMut(&'a Node)) {
    f(node);
    if let Some(children) = node.children() {
        for child in children {
            visit(child, f);
        }
    }
}

/// First node (pre-order) at exactly `span` for which `pred` holds.
pub(crate) fn find<'a>(
    node: &'a Node,
    span: Span,
    pred: &impl Fn(&Node) -> bool,
) -> Option<&'a Node> {
    if Span::of(node) == Some(span) && pred(node) {
        return Some(node);
    }
    node.children()?
        .iter()
        .find_map(|child| find(child, span, pred))
}

/// Mutable counterpart of [`find`].
pub(crate) fn find_mut<'a>(
    node: &'a mut Node,
    span: Span,
    pred: &impl Fn(&Node) -> bool,
) -> Option<&'a mut Node> {
    if Span::of(node) == Some(span) && pred(node) {
        return Some(node);
    }
    node.children_mut()?
        .iter_mut()
        .find_map(|child| find_mut(child, span, pred))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Node {
        markdown::to_mdast(src, &markdown::ParseOptions::gfm()).unwrap()
    }

    #[test]
    fn visit_is_preorder() {
        let root = parse("# Title\n\nSome *text*.\n");
        let mut kinds = Vec::new();
        visit(&root, &mut |n| {
            kinds.push(match n {
                Node::Root(_) => "root",
                Node::Heading(_) => "heading",
                Node::Paragraph(_) => "paragraph",
                Node::Emphasis(_) => "emphasis",
                Node::Text(_) => "text",
                _ => "other",
            })
        });
        assert_eq!(
            kinds,
            vec!["root", "heading", "text", "paragraph", "text", "emphasis", "text", "text"]
        );
    }

    #[test]
    fn find_distinguishes_nodes_sharing_a_start() {
        let src = "![alt](a.png)\n";
        let mut root = parse(src);
        let span = Span { start: 0, end: 13 };

        let image = find(&root, span, &|n| matches!(n, Node::Image(_)));
        assert!(image.is_some());

        let found = find_mut(&mut root, span, &|n| matches!(n, Node::Image(_)));
        if let Some(Node::Image(img)) = found {
            img.url = "b.png".into();
        } else {
            panic!("image not found");
        }
        let mut urls = Vec::new();
        visit(&root, &mut |n| {
            if let Node::Image(img) = n {
                urls.push(img.url.clone());
            }
        });
        assert_eq!(urls, vec!["b.png"]);
    }
}
