//! Frontmatter splitting and parsing: YAML (`---`) or TOML (`+++`) delimited
//! blocks at the top of a content file.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Yaml,
    Toml,
}

impl Delimiter {
    fn marker(self) -> &'static str {
        match self {
            Delimiter::Yaml => "---",
            Delimiter::Toml => "+++",
        }
    }
}

/// Split `source` into `(frontmatter, body)`. If no recognized delimiter
/// opens the file, frontmatter is an empty object and body is the whole
/// source unchanged.
pub fn split(source: &str) -> (Value, &str) {
    for delim in [Delimiter::Yaml, Delimiter::Toml] {
        let marker = delim.marker();
        let Some(rest) = source.strip_prefix(marker) else {
            continue;
        };
        // Marker must be followed by a newline (possibly after trailing
        // whitespace) to count as an opening fence.
        let after_open = match rest.find('\n') {
            Some(idx) if rest[..idx].trim().is_empty() => &rest[idx + 1..],
            _ => continue,
        };
        let Some(close_idx) = find_closing_fence(after_open, marker) else {
            continue;
        };
        let (raw_block, after_close) = after_open.split_at(close_idx);
        let close_line_end = after_close.find('\n').map(|i| i + 1).unwrap_or(after_close.len());
        let body = &after_close[close_line_end..];
        let parsed = parse_block(delim, raw_block);
        return (parsed, body);
    }
    (Value::Object(Map::new()), source)
}

fn find_closing_fence(haystack: &str, marker: &str) -> Option<usize> {
    let mut offset = 0;
    for line in haystack.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n').trim();
        if trimmed == marker {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

fn parse_block(delim: Delimiter, raw: &str) -> Value {
    let parsed = match delim {
        Delimiter::Yaml => serde_yaml::from_str::<Value>(raw).ok(),
        Delimiter::Toml => toml::from_str::<Value>(raw).ok(),
    };
    match parsed {
        Some(Value::Object(map)) => Value::Object(map),
        Some(other) => {
            let mut map = Map::new();
            map.insert("value".into(), other);
            Value::Object(map)
        }
        None => Value::Object(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_frontmatter_is_split_from_body() {
        let source = "---\ntitle: Hello\ntags:\n  - a\n  - b\n---\n# Body text\n";
        let (meta, body) = split(source);
        assert_eq!(meta.get("title").and_then(Value::as_str), Some("Hello"));
        assert_eq!(body, "# Body text\n");
    }

    #[test]
    fn toml_frontmatter_is_split_from_body() {
        let source = "+++\ntitle = \"Hello\"\n+++\nbody here\n";
        let (meta, body) = split(source);
        assert_eq!(meta.get("title").and_then(Value::as_str), Some("Hello"));
        assert_eq!(body, "body here\n");
    }

    #[test]
    fn no_frontmatter_returns_whole_source_as_body() {
        let source = "just some text\nno frontmatter here\n";
        let (meta, body) = split(source);
        assert!(meta.as_object().unwrap().is_empty());
        assert_eq!(body, source);
    }

    #[test]
    fn unterminated_fence_falls_back_to_whole_source() {
        let source = "---\ntitle: Hello\nno closing fence\n";
        let (meta, body) = split(source);
        assert!(meta.as_object().unwrap().is_empty());
        assert_eq!(body, source);
    }
}
