//! Persisted `PageCore` snapshots, keyed by source path.
//!
//! `PageCore` already implements [`Cacheable`], so discovery (§4.4) reuses
//! it directly instead of re-reading a page's frontmatter from disk when
//! the fingerprint table already proves the file is untouched — the
//! filesystem half of the "no disk I/O for their body" guarantee a lazy
//! [`crate::content::page::PageHandle`] makes.

use crate::cache::store::Cacheable;
use crate::content::page_core::PageCore;
use crate::primitives::SourcePath;
use rustc_hash::FxHashMap;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct PageCoreEntry(pub PageCore);

impl Cacheable for PageCoreEntry {
    fn to_cache_dict(&self) -> Value {
        self.0.to_cache_dict()
    }

    fn from_cache_dict(value: &Value) -> Result<Self, String> {
        PageCore::from_cache_dict(value).map(PageCoreEntry)
    }
}

#[derive(Default)]
pub struct PageCoreCache {
    entries: FxHashMap<SourcePath, PageCore>,
}

impl PageCoreCache {
    pub fn from_entries(entries: Vec<PageCoreEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.0.source_path.clone(), e.0)).collect(),
        }
    }

    pub fn into_entries(self) -> Vec<PageCoreEntry> {
        self.entries.into_values().map(PageCoreEntry).collect()
    }

    pub fn get(&self, path: &SourcePath) -> Option<&PageCore> {
        self.entries.get(path)
    }

    pub fn store(&mut self, core: PageCore) {
        self.entries.insert(core.source_path.clone(), core);
    }

    pub fn remove(&mut self, path: &SourcePath) {
        self.entries.remove(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_cache_dict() {
        let core = PageCore::from_frontmatter(SourcePath::new("a.md"), &serde_json::json!({"title": "A"}), None);
        let entry = PageCoreEntry(core.clone());
        let dict = entry.to_cache_dict();
        let back = PageCoreEntry::from_cache_dict(&dict).unwrap();
        assert_eq!(back.0, core);
    }

    #[test]
    fn stored_core_is_retrievable_by_path() {
        let mut cache = PageCoreCache::default();
        let core = PageCore::from_frontmatter(SourcePath::new("a.md"), &serde_json::json!({"title": "A"}), None);
        cache.store(core.clone());
        assert_eq!(cache.get(&SourcePath::new("a.md")), Some(&core));
    }

    #[test]
    fn unknown_path_misses() {
        let cache = PageCoreCache::default();
        assert_eq!(cache.get(&SourcePath::new("missing.md")), None);
    }
}
