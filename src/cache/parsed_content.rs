//! Parsed-content cache: caches a page's parsed HTML/TOC/links keyed on
//! everything that could invalidate them.
//!
//! A hit requires *all* of: unchanged file content hash, matching metadata
//! hash, matching template name, matching parser version, and every
//! transitive dependency's content hash still matching its cached
//! fingerprint. Comparisons run cheapest-first: content hash, then
//! metadata hash, then template, then parser version, then dependencies —
//! the first mismatch short-circuits.

use crate::cache::store::Cacheable;
use crate::primitives::{ContentHash, SourcePath};
use rustc_hash::FxHashMap;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct TocItem {
    pub id: String,
    pub title: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedContentEntry {
    pub source_path: SourcePath,
    pub html: String,
    pub toc: String,
    pub toc_items: Vec<TocItem>,
    pub links: Vec<String>,
    /// Opaque AST blob, if the parser chose to cache one.
    pub ast: Option<String>,
    pub content_hash: ContentHash,
    pub metadata_hash: ContentHash,
    pub nav_metadata_hash: ContentHash,
    pub cascade_metadata_hash: ContentHash,
    pub template: String,
    pub parser_version: String,
    pub timestamp: f64,
    pub size_bytes: u64,
    /// Content hash each non-file dependency (data files read while
    /// parsing, e.g. via shortcodes) had at the moment this was stored.
    pub dependency_hashes: FxHashMap<SourcePath, ContentHash>,
}

impl Cacheable for ParsedContentEntry {
    fn to_cache_dict(&self) -> Value {
        let mut deps = serde_json::Map::new();
        for (path, hash) in &self.dependency_hashes {
            deps.insert(path.as_str().to_string(), Value::String(hash.as_str().to_string()));
        }
        serde_json::json!({
            "source_path": self.source_path.as_str(),
            "html": self.html,
            "toc": self.toc,
            "toc_items": self.toc_items.iter().map(|t| serde_json::json!({
                "id": t.id, "title": t.title, "level": t.level
            })).collect::<Vec<_>>(),
            "links": self.links,
            "ast": self.ast,
            "content_hash": self.content_hash.as_str(),
            "metadata_hash": self.metadata_hash.as_str(),
            "nav_metadata_hash": self.nav_metadata_hash.as_str(),
            "cascade_metadata_hash": self.cascade_metadata_hash.as_str(),
            "template": self.template,
            "parser_version": self.parser_version,
            "timestamp": self.timestamp,
            "size_bytes": self.size_bytes,
            "dependency_hashes": Value::Object(deps),
        })
    }

    fn from_cache_dict(value: &Value) -> Result<Self, String> {
        let get_str = |k: &str| value.get(k).and_then(Value::as_str).map(str::to_string).ok_or(format!("missing {k}"));
        let toc_items = value
            .get("toc_items")
            .and_then(Value::as_array)
            .ok_or("missing toc_items")?
            .iter()
            .map(|t| {
                Ok(TocItem {
                    id: t.get("id").and_then(Value::as_str).ok_or("missing toc id")?.to_string(),
                    title: t.get("title").and_then(Value::as_str).ok_or("missing toc title")?.to_string(),
                    level: t.get("level").and_then(Value::as_u64).ok_or("missing toc level")? as u8,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;
        let links = value
            .get("links")
            .and_then(Value::as_array)
            .ok_or("missing links")?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        let dependency_hashes = value
            .get("dependency_hashes")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|h| (SourcePath::new(k), ContentHash::from_hex(h))))
                    .collect()
            })
            .unwrap_or_default();
        Ok(ParsedContentEntry {
            source_path: SourcePath::new(get_str("source_path")?),
            html: get_str("html")?,
            toc: get_str("toc")?,
            toc_items,
            links,
            ast: value.get("ast").and_then(Value::as_str).map(str::to_string),
            content_hash: ContentHash::from_hex(&get_str("content_hash")?),
            metadata_hash: ContentHash::from_hex(&get_str("metadata_hash")?),
            nav_metadata_hash: ContentHash::from_hex(&get_str("nav_metadata_hash")?),
            cascade_metadata_hash: ContentHash::from_hex(&get_str("cascade_metadata_hash")?),
            template: get_str("template")?,
            parser_version: get_str("parser_version")?,
            timestamp: value.get("timestamp").and_then(Value::as_f64).ok_or("missing timestamp")?,
            size_bytes: value.get("size_bytes").and_then(Value::as_u64).ok_or("missing size_bytes")?,
            dependency_hashes,
        })
    }
}

/// Lookup context a caller must supply for `ParsedContentCache::get`.
pub struct ParsedContentQuery<'a> {
    pub content_hash: &'a ContentHash,
    pub metadata_hash: &'a ContentHash,
    pub template: &'a str,
    pub parser_version: &'a str,
    /// Current content hash of every dependency this page's cached entry
    /// would have recorded (templates, partials, data files), as seen in
    /// the live `FingerprintTable` right now.
    pub dependency_hashes: &'a FxHashMap<SourcePath, ContentHash>,
}

#[derive(Default)]
pub struct ParsedContentCache {
    entries: FxHashMap<SourcePath, ParsedContentEntry>,
}

impl ParsedContentCache {
    pub fn from_entries(entries: Vec<ParsedContentEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.source_path.clone(), e)).collect(),
        }
    }

    pub fn into_entries(self) -> Vec<ParsedContentEntry> {
        self.entries.into_values().collect()
    }

    /// Returns `Some` iff every validation check passes; `None` is a cache
    /// miss (the caller's cache-miss sentinel).
    pub fn get(&self, path: &SourcePath, query: &ParsedContentQuery<'_>) -> Option<&ParsedContentEntry> {
        let entry = self.entries.get(path)?;
        if &entry.content_hash != query.content_hash {
            return None;
        }
        if &entry.metadata_hash != query.metadata_hash {
            return None;
        }
        if entry.template != query.template {
            return None;
        }
        if entry.parser_version != query.parser_version {
            return None;
        }
        for (dep, recorded_hash) in &entry.dependency_hashes {
            let Some(current) = query.dependency_hashes.get(dep) else {
                // A dependency that vanished cannot be proven fresh.
                return None;
            };
            if current != recorded_hash {
                return None;
            }
        }
        Some(entry)
    }

    pub fn store(&mut self, mut entry: ParsedContentEntry, dependency_hashes: FxHashMap<SourcePath, ContentHash>) {
        entry.dependency_hashes = dependency_hashes;
        self.entries.insert(entry.source_path.clone(), entry);
    }

    pub fn remove(&mut self, path: &SourcePath) {
        self.entries.remove(path);
    }

    pub fn dependencies_of(&self, path: &SourcePath) -> impl Iterator<Item = &SourcePath> {
        self.entries.get(path).into_iter().flat_map(|e| e.dependency_hashes.keys())
    }
}
