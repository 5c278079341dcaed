//! Taxonomy index persistence: `tag_slug -> {name, page_paths}`. This is
//! the authoritative source of tag membership when a build starts cold
//! in-memory but warm on disk — taxonomy generation doesn't have to
//! re-walk every page to know which slugs exist.

use crate::cache::store::Cacheable;
use crate::primitives::SourcePath;
use rustc_hash::FxHashMap;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyIndexEntry {
    pub tag_slug: String,
    pub tag_name: String,
    pub page_paths: Vec<SourcePath>,
}

impl Cacheable for TaxonomyIndexEntry {
    fn to_cache_dict(&self) -> Value {
        serde_json::json!({
            "tag_slug": self.tag_slug,
            "tag_name": self.tag_name,
            "page_paths": self.page_paths.iter().map(SourcePath::as_str).collect::<Vec<_>>(),
        })
    }

    fn from_cache_dict(value: &Value) -> Result<Self, String> {
        let tag_slug = value.get("tag_slug").and_then(Value::as_str).ok_or("missing tag_slug")?.to_string();
        let tag_name = value.get("tag_name").and_then(Value::as_str).ok_or("missing tag_name")?.to_string();
        let page_paths = value
            .get("page_paths")
            .and_then(Value::as_array)
            .ok_or("missing page_paths")?
            .iter()
            .filter_map(Value::as_str)
            .map(SourcePath::new)
            .collect();
        Ok(TaxonomyIndexEntry { tag_slug, tag_name, page_paths })
    }
}

#[derive(Default)]
pub struct TaxonomyIndex {
    entries: FxHashMap<String, (String, Vec<SourcePath>)>,
}

impl TaxonomyIndex {
    pub fn from_entries(entries: Vec<TaxonomyIndexEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.tag_slug, (e.tag_name, e.page_paths))).collect(),
        }
    }

    pub fn into_entries(self) -> Vec<TaxonomyIndexEntry> {
        self.entries
            .into_iter()
            .map(|(tag_slug, (tag_name, page_paths))| TaxonomyIndexEntry { tag_slug, tag_name, page_paths })
            .collect()
    }

    pub fn set(&mut self, tag_slug: impl Into<String>, tag_name: impl Into<String>, page_paths: Vec<SourcePath>) {
        self.entries.insert(tag_slug.into(), (tag_name.into(), page_paths));
    }

    pub fn get(&self, tag_slug: &str) -> Option<(&str, &[SourcePath])> {
        self.entries.get(tag_slug).map(|(name, paths)| (name.as_str(), paths.as_slice()))
    }

    pub fn slugs(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn remove(&mut self, tag_slug: &str) {
        self.entries.remove(tag_slug);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_roundtrip() {
        let mut idx = TaxonomyIndex::default();
        idx.set("rust", "Rust", vec![SourcePath::new("a.md")]);
        let (name, paths) = idx.get("rust").unwrap();
        assert_eq!(name, "Rust");
        assert_eq!(paths, &[SourcePath::new("a.md")]);
    }

    #[test]
    fn persistence_roundtrip() {
        let mut idx = TaxonomyIndex::default();
        idx.set("rust", "Rust", vec![SourcePath::new("a.md"), SourcePath::new("b.md")]);
        let entries = idx.into_entries();
        let restored = TaxonomyIndex::from_entries(entries);
        assert_eq!(restored.get("rust").unwrap().1.len(), 2);
    }

    #[test]
    fn unknown_slug_is_none() {
        let idx = TaxonomyIndex::default();
        assert!(idx.get("missing").is_none());
    }
}
