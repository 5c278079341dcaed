//! Aggregate-page member tracking: lets a large generated page (a tag
//! listing with a thousand posts, a section index) stay cached when an
//! unrelated page changes elsewhere on the site, by recording exactly which
//! source pages fed it and each one's content hash at the time it was last
//! rendered.

use crate::cache::store::Cacheable;
use crate::primitives::{ContentHash, SourcePath};
use rustc_hash::FxHashMap;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    TagListing,
    TagIndex,
    SectionIndex,
}

impl PageType {
    fn as_str(&self) -> &'static str {
        match self {
            PageType::TagListing => "tag_listing",
            PageType::TagIndex => "tag_index",
            PageType::SectionIndex => "section_index",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "tag_listing" => Some(PageType::TagListing),
            "tag_index" => Some(PageType::TagIndex),
            "section_index" => Some(PageType::SectionIndex),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneratedPageKey {
    pub page_type: PageType,
    pub page_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMembersEntry {
    pub key: GeneratedPageKey,
    pub members: FxHashMap<SourcePath, ContentHash>,
}

impl Cacheable for GeneratedMembersEntry {
    fn to_cache_dict(&self) -> Value {
        let members: serde_json::Map<String, Value> = self
            .members
            .iter()
            .map(|(path, hash)| (path.as_str().to_string(), Value::String(hash.as_str().to_string())))
            .collect();
        serde_json::json!({
            "page_type": self.key.page_type.as_str(),
            "page_id": self.key.page_id,
            "members": members,
        })
    }

    fn from_cache_dict(value: &Value) -> Result<Self, String> {
        let page_type_str = value.get("page_type").and_then(Value::as_str).ok_or("missing page_type")?;
        let page_type = PageType::from_str(page_type_str).ok_or_else(|| format!("unknown page_type {page_type_str}"))?;
        let page_id = value.get("page_id").and_then(Value::as_str).ok_or("missing page_id")?.to_string();
        let members = value
            .get("members")
            .and_then(Value::as_object)
            .ok_or("missing members")?
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (SourcePath::new(k.clone()), ContentHash::from_hex(s))))
            .collect();
        Ok(GeneratedMembersEntry {
            key: GeneratedPageKey { page_type, page_id },
            members,
        })
    }
}

#[derive(Default)]
pub struct GeneratedMembersCache {
    entries: FxHashMap<GeneratedPageKey, FxHashMap<SourcePath, ContentHash>>,
}

impl GeneratedMembersCache {
    pub fn from_entries(entries: Vec<GeneratedMembersEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.key, e.members)).collect(),
        }
    }

    pub fn into_entries(self) -> Vec<GeneratedMembersEntry> {
        self.entries
            .into_iter()
            .map(|(key, members)| GeneratedMembersEntry { key, members })
            .collect()
    }

    /// `true` iff the aggregate's member set and every member's content
    /// hash exactly match what was last recorded — the page can be
    /// skipped entirely this build.
    pub fn should_regenerate(&self, key: &GeneratedPageKey, current_members: &FxHashMap<SourcePath, ContentHash>) -> bool {
        match self.entries.get(key) {
            Some(recorded) => recorded != current_members,
            None => true,
        }
    }

    pub fn store(&mut self, key: GeneratedPageKey, members: FxHashMap<SourcePath, ContentHash>) {
        self.entries.insert(key, members);
    }

    pub fn remove(&mut self, key: &GeneratedPageKey) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(pairs: &[(&str, &str)]) -> FxHashMap<SourcePath, ContentHash> {
        pairs.iter().map(|(p, h)| (SourcePath::new(*p), ContentHash::from_hex(h))).collect()
    }

    #[test]
    fn unchanged_member_set_and_hashes_skip_regeneration() {
        let mut cache = GeneratedMembersCache::default();
        let key = GeneratedPageKey {
            page_type: PageType::TagListing,
            page_id: "rust".into(),
        };
        let set = members(&[("a.md", "aaaaaaaaaaaaaaaa"), ("b.md", "bbbbbbbbbbbbbbbb")]);
        cache.store(key.clone(), set.clone());
        assert!(!cache.should_regenerate(&key, &set));
    }

    #[test]
    fn one_member_content_change_forces_regeneration() {
        let mut cache = GeneratedMembersCache::default();
        let key = GeneratedPageKey {
            page_type: PageType::TagListing,
            page_id: "rust".into(),
        };
        cache.store(key.clone(), members(&[("a.md", "aaaaaaaaaaaaaaaa")]));
        let changed = members(&[("a.md", "cccccccccccccccc")]);
        assert!(cache.should_regenerate(&key, &changed));
    }

    #[test]
    fn unknown_key_always_regenerates() {
        let cache = GeneratedMembersCache::default();
        let key = GeneratedPageKey {
            page_type: PageType::SectionIndex,
            page_id: "blog".into(),
        };
        assert!(cache.should_regenerate(&key, &FxHashMap::default()));
    }

    #[test]
    fn roundtrip() {
        let key = GeneratedPageKey {
            page_type: PageType::TagIndex,
            page_id: "all".into(),
        };
        let set = members(&[("a.md", "aaaaaaaaaaaaaaaa")]);
        let entry = GeneratedMembersEntry { key, members: set };
        let dict = entry.to_cache_dict();
        let back = GeneratedMembersEntry::from_cache_dict(&dict).unwrap();
        assert_eq!(entry, back);
    }
}
