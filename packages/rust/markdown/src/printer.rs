//! Rendering of rewritten nodes back into source text.

use markdown::mdast::{AttributeContent, AttributeValue};

/// Text between the start of the line containing `offset` and `offset`
/// (list markers, blockquote markers, indentation).
pub(crate) fn line_prefix(source: &str, offset: usize) -> &str {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    &source[line_start..offset]
}

/// Turn a first-line container prefix into the prefix of continuation lines:
/// `>` markers stay, list markers and other text become spaces.
fn continuation_prefix(first: &str) -> String {
    first
        .chars()
        .map(|c| match c {
            '>' | ' ' | '\t' => c,
            _ => ' ',
        })
        .collect()
}

/// Opening fence marker and its length, after leading whitespace.
fn fence_of(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    (len >= 3).then_some((marker, len))
}

/// If `line` closes a fence opened with `fence`, the text before the closing
/// marker (the line's container prefix).
fn closing_prefix(line: &str, fence: (char, usize)) -> Option<&str> {
    let line = line.trim_end_matches(['\r', ' ', '\t']);
    let idx = line.find(fence.0)?;
    let (prefix, rest) = line.split_at(idx);
    if !prefix.chars().all(|c| matches!(c, '>' | ' ' | '\t')) {
        return None;
    }
    let closing = rest.chars().all(|c| c == fence.0) && rest.chars().count() >= fence.1;
    closing.then_some(prefix)
}

fn push_lines(out: &mut String, value: &str, prefix: &str, eol: &str, trailing_eol: bool) {
    let mut lines = value.split('\n').peekable();
    while let Some(line) = lines.next() {
        if line.is_empty() {
            out.push_str(prefix.trim_end());
        } else {
            out.push_str(prefix);
            out.push_str(line);
        }
        if lines.peek().is_some() || trailing_eol {
            out.push_str(eol);
        }
    }
}

/// Longest run of `marker` opening any line of `value` (after up to three
/// spaces of indentation), i.e. the longest line that could close a fence.
fn longest_inner_fence(value: &str, marker: char) -> usize {
    value
        .split('\n')
        .filter_map(|line| {
            let indent = line.len() - line.trim_start_matches(' ').len();
            (indent <= 3).then(|| line[indent..].chars().take_while(|c| *c == marker).count())
        })
        .max()
        .unwrap_or(0)
}

/// Replace the first run of `marker` in a fence line with `len` markers.
/// Container prefix and info string are kept.
fn widen_fence(line: &str, marker: char, len: usize) -> String {
    let Some(start) = line.find(marker) else {
        return line.to_string();
    };
    let run = line[start..].chars().take_while(|c| *c == marker).count();
    let mut out = String::with_capacity(line.len() + len);
    out.push_str(&line[..start]);
    out.extend(std::iter::repeat_n(marker, len));
    out.push_str(&line[start + run * marker.len_utf8()..]);
    out
}

/// Re-render a fenced code block with new content.
///
/// `original` is the node's source text starting at the opening fence,
/// `first_prefix` whatever precedes the fence on its line. The fence lines
/// are kept as written, unless a line of `value` would close them early; then
/// both are lengthened past the longest such line.
pub(crate) fn render_code(original: &str, value: &str, first_prefix: &str, eol: &str) -> String {
    let first_line = original.split('\n').next().unwrap_or_default();
    let fence = fence_of(first_line);
    let widened = fence.and_then(|(marker, len)| {
        let inner = longest_inner_fence(value, marker);
        (inner >= len).then_some((marker, inner + 1))
    });
    let fence_line = |line: &str| match widened {
        Some((marker, len)) => widen_fence(line, marker, len),
        None => line.to_string(),
    };

    let Some(first_nl) = original.find('\n') else {
        // Unclosed block consisting of only its opening fence.
        let mut out = fence_line(original);
        if !value.is_empty() {
            out.push_str(eol);
            push_lines(&mut out, value, &continuation_prefix(first_prefix), eol, false);
        }
        return out;
    };

    let opening = &original[..=first_nl];
    let body = &original[first_nl + 1..];
    let last_start = body.rfind('\n').map_or(0, |i| i + 1);
    let last_line = &body[last_start..];

    let closed = fence.and_then(|fence| closing_prefix(last_line, fence));

    let mut out = String::with_capacity(original.len() + value.len());
    out.push_str(&fence_line(opening));

    match closed {
        Some(prefix) => {
            if !value.is_empty() {
                push_lines(&mut out, value, prefix, eol, true);
            }
            out.push_str(&fence_line(last_line));
        }
        None => {
            let indent: String = opening
                .chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect();
            let prefix = continuation_prefix(&format!("{first_prefix}{indent}"));
            let trailing = body.ends_with('\n');
            if !value.is_empty() {
                push_lines(&mut out, value, &prefix, eol, trailing);
            }
        }
    }

    out
}

/// Replace the destination `old` with `new` inside a markdown image's source
/// text. Returns `None` when `old` cannot be found after a `](`.
pub(crate) fn replace_destination(original: &str, old: &str, new: &str) -> Option<String> {
    for (idx, _) in original.match_indices("](") {
        let after = idx + 2;
        let rest = &original[after..];
        let ws = rest.len() - rest.trim_start().len();
        let mut dest_start = after + ws;
        if original[dest_start..].starts_with('<') {
            dest_start += 1;
        }
        if original[dest_start..].starts_with(old) {
            let mut out = String::with_capacity(original.len() + new.len());
            out.push_str(&original[..dest_start]);
            out.push_str(new);
            out.push_str(&original[dest_start + old.len()..]);
            return Some(out);
        }
    }
    None
}

/// Render a self-closing JSX element: `<Name attr="x" other={y} />`.
pub(crate) fn render_jsx(name: Option<&str>, attributes: &[AttributeContent]) -> String {
    let mut out = String::from("<");
    out.push_str(name.unwrap_or_default());
    for attr in attributes {
        out.push(' ');
        match attr {
            AttributeContent::Expression(expr) => {
                out.push('{');
                out.push_str(&expr.value);
                out.push('}');
            }
            AttributeContent::Property(prop) => {
                out.push_str(&prop.name);
                match &prop.value {
                    None => {}
                    Some(AttributeValue::Literal(lit)) => {
                        out.push_str("=\"");
                        out.push_str(&escape_attribute(lit));
                        out.push('"');
                    }
                    Some(AttributeValue::Expression(expr)) => {
                        out.push_str("={");
                        out.push_str(&expr.value);
                        out.push('}');
                    }
                }
            }
        }
    }
    out.push_str(" />");
    out
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
