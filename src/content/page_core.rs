//! `PageCore`: the single source of truth for everything cacheable about a
//! page, written once per discovery and loadable into a lazy proxy.

use crate::cache::store::Cacheable;
use crate::primitives::hash;
use crate::primitives::{ContentHash, SourcePath};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageCore {
    pub source_path: SourcePath,
    pub title: String,
    /// Unix timestamp, seconds. `None` if absent or unparseable.
    pub date: Option<f64>,
    pub tags: Vec<String>,
    pub aliases: Vec<String>,
    pub slug: Option<String>,
    pub weight: Option<i64>,
    pub lang: Option<String>,
    pub page_type: Option<String>,
    pub section: Option<SourcePath>,
    pub file_hash: Option<ContentHash>,
    /// Hash of the raw frontmatter object, independent of `file_hash` (which
    /// covers the whole file including the body). Generated-page staleness
    /// (tag listings, the tag index) keys off this so a body-only edit
    /// leaves it unchanged while a title/tag/date edit changes it.
    pub metadata_hash: Option<ContentHash>,
}

impl PageCore {
    /// Build a `PageCore` from a raw frontmatter object, sanitizing `tags`
    /// and `aliases` (nulls dropped, nested containers dropped, scalars
    /// coerced to trimmed strings) and collapsing an empty title to
    /// `"Untitled"`.
    pub fn from_frontmatter(source_path: SourcePath, frontmatter: &Value, file_hash: Option<ContentHash>) -> Self {
        let title = frontmatter
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Untitled")
            .to_string();

        let date = frontmatter.get("date").and_then(parse_date);
        let tags = sanitize_string_list(frontmatter.get("tags"));
        let aliases = sanitize_string_list(frontmatter.get("aliases"));
        let slug = frontmatter.get("slug").and_then(Value::as_str).map(str::to_string);
        let weight = frontmatter.get("weight").and_then(Value::as_i64);
        let lang = frontmatter.get("lang").and_then(Value::as_str).map(str::to_string);
        let page_type = frontmatter.get("type").and_then(Value::as_str).map(str::to_string);
        let metadata_hash = Some(hash::hash_dict(frontmatter));

        PageCore {
            source_path,
            title,
            date,
            tags,
            aliases,
            slug,
            weight,
            lang,
            page_type,
            section: None,
            file_hash,
            metadata_hash,
        }
    }
}

fn sanitize_string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Null | Value::Array(_) | Value::Object(_) => None,
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
        })
        .collect()
}

fn parse_date(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => humantime::parse_rfc3339_weak(s.trim()).ok().and_then(|t| {
            t.duration_since(std::time::UNIX_EPOCH).ok().map(|d| d.as_secs_f64())
        }),
        _ => None,
    }
}

impl Cacheable for PageCore {
    fn to_cache_dict(&self) -> Value {
        serde_json::json!({
            "source_path": self.source_path.as_str(),
            "title": self.title,
            "date": self.date,
            "tags": self.tags,
            "aliases": self.aliases,
            "slug": self.slug,
            "weight": self.weight,
            "lang": self.lang,
            "type": self.page_type,
            "section": self.section.as_ref().map(SourcePath::as_str),
            "file_hash": self.file_hash.as_ref().map(ContentHash::as_str),
            "metadata_hash": self.metadata_hash.as_ref().map(ContentHash::as_str),
        })
    }

    fn from_cache_dict(value: &Value) -> Result<Self, String> {
        let source_path = value.get("source_path").and_then(Value::as_str).ok_or("missing source_path")?;
        Ok(PageCore {
            source_path: SourcePath::new(source_path),
            title: value.get("title").and_then(Value::as_str).unwrap_or("Untitled").to_string(),
            date: value.get("date").and_then(Value::as_f64),
            tags: value
                .get("tags")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
            aliases: value
                .get("aliases")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
            slug: value.get("slug").and_then(Value::as_str).map(str::to_string),
            weight: value.get("weight").and_then(Value::as_i64),
            lang: value.get("lang").and_then(Value::as_str).map(str::to_string),
            page_type: value.get("type").and_then(Value::as_str).map(str::to_string),
            section: value.get("section").and_then(Value::as_str).map(SourcePath::new),
            file_hash: value.get("file_hash").and_then(Value::as_str).map(ContentHash::from_hex),
            metadata_hash: value.get("metadata_hash").and_then(Value::as_str).map(ContentHash::from_hex),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_title_collapses_to_untitled() {
        let fm = serde_json::json!({"title": ""});
        let core = PageCore::from_frontmatter(SourcePath::new("a.md"), &fm, None);
        assert_eq!(core.title, "Untitled");
    }

    #[test]
    fn missing_title_collapses_to_untitled() {
        let fm = serde_json::json!({});
        let core = PageCore::from_frontmatter(SourcePath::new("a.md"), &fm, None);
        assert_eq!(core.title, "Untitled");
    }

    #[test]
    fn tags_drop_nulls_and_containers_and_coerce_scalars() {
        let fm = serde_json::json!({"tags": ["rust", null, ["nested"], {"a": 1}, 42, "  spaced  "]});
        let core = PageCore::from_frontmatter(SourcePath::new("a.md"), &fm, None);
        assert_eq!(core.tags, vec!["rust".to_string(), "42".to_string(), "spaced".to_string()]);
    }

    #[test]
    fn roundtrip_through_cache_dict() {
        let fm = serde_json::json!({"title": "Hi", "tags": ["a"], "weight": 3});
        let core = PageCore::from_frontmatter(SourcePath::new("a.md"), &fm, Some(ContentHash::from_hex("aaaaaaaaaaaaaaaa")));
        let dict = core.to_cache_dict();
        let back = PageCore::from_cache_dict(&dict).unwrap();
        assert_eq!(core, back);
    }
}
