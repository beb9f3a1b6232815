use markdown::mdast::Node;
use serde_json::Value as JsonValue;

/// Parse the document's frontmatter node (YAML `---` or TOML `+++`) into a
/// JSON object. A document without frontmatter yields an empty object.
///
/// The error string is the parser's message; callers attach the path.
pub fn parse_frontmatter(root: &Node) -> Result<JsonValue, String> {
    let first = root.children().and_then(|c| c.first());

    let value = match first {
        Some(Node::Yaml(yaml)) => parse_yaml_block(&yaml.value)?,
        Some(Node::Toml(toml)) => parse_toml_block(&toml.value)?,
        _ => return Ok(empty()),
    };

    match value {
        JsonValue::Null => Ok(empty()),
        JsonValue::Object(_) => Ok(value),
        _ => Err("frontmatter must be a mapping at the top level".into()),
    }
}

fn empty() -> JsonValue {
    JsonValue::Object(Default::default())
}

fn parse_yaml_block(block: &str) -> Result<JsonValue, String> {
    if block.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(block).map_err(|e| format!("invalid YAML frontmatter: {e}"))?;
    serde_json::to_value(yaml).map_err(|e| format!("invalid YAML frontmatter: {e}"))
}

fn parse_toml_block(block: &str) -> Result<JsonValue, String> {
    let table: toml::Table =
        toml::from_str(block).map_err(|e| format!("invalid TOML frontmatter: {e}"))?;
    serde_json::to_value(table).map_err(|e| format!("invalid TOML frontmatter: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Syntax;

    fn root(src: &str) -> Node {
        markdown::to_mdast(src, &Syntax::Mdx.parse_options()).unwrap()
    }

    #[test]
    fn returns_empty_when_no_frontmatter() {
        let value = parse_frontmatter(&root("# Title\n")).unwrap();
        assert_eq!(value, empty());
    }

    #[test]
    fn parses_basic_yaml() {
        let src = "---\ntitle: Ops\ntags:\n  - a\n---\n\n# Ops\n";
        let value = parse_frontmatter(&root(src)).unwrap();
        assert_eq!(value["title"], "Ops");
        assert_eq!(value["tags"][0], "a");
    }

    #[test]
    fn empty_block_is_empty_mapping() {
        let value = parse_frontmatter(&root("---\n---\n\nBody\n")).unwrap();
        assert_eq!(value, empty());
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let err = parse_frontmatter(&root("---\ntitle: [unterminated\n---\n\nBody\n")).unwrap_err();
        assert!(err.contains("invalid YAML"), "{err}");
    }

    #[test]
    fn errors_on_scalar_root() {
        let err = parse_frontmatter(&root("---\njust a string\n---\n\nBody\n")).unwrap_err();
        assert!(err.contains("mapping"), "{err}");
    }

    #[test]
    fn parses_simple_toml() {
        let src = "+++\ntitle = \"Ops\"\nweight = 3\n+++\n\nBody\n";
        let value = parse_frontmatter(&root(src)).unwrap();
        assert_eq!(value["title"], "Ops");
        assert_eq!(value["weight"], 3);
    }
}
