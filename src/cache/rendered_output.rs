//! Rendered-output cache: skips template rendering entirely when the parsed
//! content, template, and every upstream dependency are all unchanged.
//!
//! Keyed the same way as the parsed-content cache but additionally tracks
//! `asset_manifest_mtime` (rendered pages can embed asset URLs that change
//! when the manifest is regenerated even though the page's own content
//! didn't) and an optional `doc_content_hash` for pages generated from a
//! virtual source (autodoc-style generators) rather than a file on disk.

use crate::cache::store::Cacheable;
use crate::primitives::{ContentHash, SourcePath};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOutputEntry {
    pub output_path: SourcePath,
    pub source_path: SourcePath,
    pub content_hash: ContentHash,
    pub template: String,
    pub template_hash: ContentHash,
    pub asset_manifest_mtime: f64,
    pub doc_content_hash: Option<ContentHash>,
    pub output_hash: ContentHash,
    pub timestamp: f64,
}

impl Cacheable for RenderedOutputEntry {
    fn to_cache_dict(&self) -> Value {
        serde_json::json!({
            "output_path": self.output_path.as_str(),
            "source_path": self.source_path.as_str(),
            "content_hash": self.content_hash.as_str(),
            "template": self.template,
            "template_hash": self.template_hash.as_str(),
            "asset_manifest_mtime": self.asset_manifest_mtime,
            "doc_content_hash": self.doc_content_hash.as_ref().map(ContentHash::as_str),
            "output_hash": self.output_hash.as_str(),
            "timestamp": self.timestamp,
        })
    }

    fn from_cache_dict(value: &Value) -> Result<Self, String> {
        let get_str = |k: &str| value.get(k).and_then(Value::as_str).map(str::to_string).ok_or(format!("missing {k}"));
        Ok(RenderedOutputEntry {
            output_path: SourcePath::new(get_str("output_path")?),
            source_path: SourcePath::new(get_str("source_path")?),
            content_hash: ContentHash::from_hex(&get_str("content_hash")?),
            template: get_str("template")?,
            template_hash: ContentHash::from_hex(&get_str("template_hash")?),
            asset_manifest_mtime: value.get("asset_manifest_mtime").and_then(Value::as_f64).ok_or("missing asset_manifest_mtime")?,
            doc_content_hash: value.get("doc_content_hash").and_then(Value::as_str).map(ContentHash::from_hex),
            output_hash: ContentHash::from_hex(&get_str("output_hash")?),
            timestamp: value.get("timestamp").and_then(Value::as_f64).ok_or("missing timestamp")?,
        })
    }
}

pub struct RenderedOutputQuery<'a> {
    pub content_hash: &'a ContentHash,
    pub template: &'a str,
    pub template_hash: &'a ContentHash,
    pub asset_manifest_mtime: f64,
    pub doc_content_hash: Option<&'a ContentHash>,
}

#[derive(Default)]
pub struct RenderedOutputCache {
    entries: std::collections::HashMap<SourcePath, RenderedOutputEntry>,
}

impl RenderedOutputCache {
    pub fn from_entries(entries: Vec<RenderedOutputEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.output_path.clone(), e)).collect(),
        }
    }

    pub fn into_entries(self) -> Vec<RenderedOutputEntry> {
        self.entries.into_values().collect()
    }

    pub fn get(&self, output_path: &SourcePath, query: &RenderedOutputQuery<'_>) -> Option<&RenderedOutputEntry> {
        let entry = self.entries.get(output_path)?;
        if &entry.content_hash != query.content_hash {
            return None;
        }
        if entry.template != query.template {
            return None;
        }
        if &entry.template_hash != query.template_hash {
            return None;
        }
        if entry.asset_manifest_mtime != query.asset_manifest_mtime {
            return None;
        }
        if entry.doc_content_hash.as_ref() != query.doc_content_hash {
            return None;
        }
        Some(entry)
    }

    pub fn store(&mut self, entry: RenderedOutputEntry) {
        self.entries.insert(entry.output_path.clone(), entry);
    }

    pub fn remove(&mut self, output_path: &SourcePath) {
        self.entries.remove(output_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RenderedOutputEntry {
        RenderedOutputEntry {
            output_path: SourcePath::new("post/index.html"),
            source_path: SourcePath::new("post.md"),
            content_hash: ContentHash::from_hex("1111111111111111"),
            template: "post.html".into(),
            template_hash: ContentHash::from_hex("2222222222222222"),
            asset_manifest_mtime: 1.0,
            doc_content_hash: None,
            output_hash: ContentHash::from_hex("3333333333333333"),
            timestamp: 0.0,
        }
    }

    #[test]
    fn hit_on_matching_query() {
        let mut cache = RenderedOutputCache::default();
        let e = sample();
        cache.store(e.clone());
        let hit = cache.get(
            &e.output_path,
            &RenderedOutputQuery {
                content_hash: &e.content_hash,
                template: &e.template,
                template_hash: &e.template_hash,
                asset_manifest_mtime: e.asset_manifest_mtime,
                doc_content_hash: None,
            },
        );
        assert!(hit.is_some());
    }

    #[test]
    fn miss_on_asset_manifest_change() {
        let mut cache = RenderedOutputCache::default();
        let e = sample();
        cache.store(e.clone());
        let hit = cache.get(
            &e.output_path,
            &RenderedOutputQuery {
                content_hash: &e.content_hash,
                template: &e.template,
                template_hash: &e.template_hash,
                asset_manifest_mtime: 2.0,
                doc_content_hash: None,
            },
        );
        assert!(hit.is_none());
    }

    #[test]
    fn miss_on_doc_content_hash_mismatch() {
        let mut cache = RenderedOutputCache::default();
        let e = sample();
        cache.store(e.clone());
        let other = ContentHash::from_hex("4444444444444444");
        let hit = cache.get(
            &e.output_path,
            &RenderedOutputQuery {
                content_hash: &e.content_hash,
                template: &e.template,
                template_hash: &e.template_hash,
                asset_manifest_mtime: e.asset_manifest_mtime,
                doc_content_hash: Some(&other),
            },
        );
        assert!(hit.is_none());
    }

    #[test]
    fn roundtrip() {
        let e = sample();
        let dict = e.to_cache_dict();
        let back = RenderedOutputEntry::from_cache_dict(&dict).unwrap();
        assert_eq!(e, back);
    }
}
