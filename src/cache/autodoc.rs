//! Virtual-source tracking: generated pages whose "source file" isn't a
//! path discovery ever walks (an OpenAPI document, an introspected module,
//! any out-of-tree generator input). Two tables cooperate: which generated
//! pages a virtual source produced, and that source's own staleness
//! metadata, checked mtime-first before falling back to a content hash.

use crate::cache::store::Cacheable;
use crate::config::StrictMode;
use crate::primitives::{ContentHash, SourcePath};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct AutodocDependencyEntry {
    pub source: SourcePath,
    pub generated_pages: Vec<SourcePath>,
}

impl Cacheable for AutodocDependencyEntry {
    fn to_cache_dict(&self) -> Value {
        serde_json::json!({
            "source": self.source.as_str(),
            "generated_pages": self.generated_pages.iter().map(SourcePath::as_str).collect::<Vec<_>>(),
        })
    }

    fn from_cache_dict(value: &Value) -> Result<Self, String> {
        let source = value.get("source").and_then(Value::as_str).ok_or("missing source")?;
        let generated_pages = value
            .get("generated_pages")
            .and_then(Value::as_array)
            .ok_or("missing generated_pages")?
            .iter()
            .filter_map(Value::as_str)
            .map(SourcePath::new)
            .collect();
        Ok(AutodocDependencyEntry {
            source: SourcePath::new(source),
            generated_pages,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutodocSourceMetadata {
    pub source: SourcePath,
    pub content_hash: ContentHash,
    pub mtime: f64,
    pub doc_hashes: FxHashMap<String, ContentHash>,
}

impl Cacheable for AutodocSourceMetadata {
    fn to_cache_dict(&self) -> Value {
        serde_json::json!({
            "source": self.source.as_str(),
            "content_hash": self.content_hash.as_str(),
            "mtime": self.mtime,
            "doc_hashes": self.doc_hashes.iter().map(|(k, v)| (k.clone(), v.as_str().to_string())).collect::<FxHashMap<_, _>>(),
        })
    }

    fn from_cache_dict(value: &Value) -> Result<Self, String> {
        let source = value.get("source").and_then(Value::as_str).ok_or("missing source")?;
        let content_hash = value.get("content_hash").and_then(Value::as_str).ok_or("missing content_hash")?;
        let mtime = value.get("mtime").and_then(Value::as_f64).ok_or("missing mtime")?;
        let doc_hashes = value
            .get("doc_hashes")
            .and_then(Value::as_object)
            .ok_or("missing doc_hashes")?
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), ContentHash::from_hex(s))))
            .collect();
        Ok(AutodocSourceMetadata {
            source: SourcePath::new(source),
            content_hash: ContentHash::from_hex(content_hash),
            mtime,
            doc_hashes,
        })
    }
}

#[derive(Default)]
pub struct AutodocTracker {
    dependencies: FxHashMap<SourcePath, FxHashSet<SourcePath>>,
    metadata: FxHashMap<SourcePath, AutodocSourceMetadata>,
}

impl AutodocTracker {
    pub fn from_parts(deps: Vec<AutodocDependencyEntry>, metadata: Vec<AutodocSourceMetadata>) -> Self {
        Self {
            dependencies: deps.into_iter().map(|e| (e.source, e.generated_pages.into_iter().collect())).collect(),
            metadata: metadata.into_iter().map(|m| (m.source.clone(), m)).collect(),
        }
    }

    pub fn into_parts(self) -> (Vec<AutodocDependencyEntry>, Vec<AutodocSourceMetadata>) {
        let deps = self
            .dependencies
            .into_iter()
            .map(|(source, pages)| AutodocDependencyEntry {
                source,
                generated_pages: pages.into_iter().collect(),
            })
            .collect();
        let meta = self.metadata.into_values().collect();
        (deps, meta)
    }

    pub fn add_autodoc_dependency(&mut self, source: SourcePath, generated_page: SourcePath, source_hash: ContentHash, source_mtime: f64) {
        self.dependencies.entry(source.clone()).or_default().insert(generated_page);
        self.metadata
            .entry(source.clone())
            .and_modify(|m| {
                m.content_hash = source_hash.clone();
                m.mtime = source_mtime;
            })
            .or_insert(AutodocSourceMetadata {
                source,
                content_hash: source_hash,
                mtime: source_mtime,
                doc_hashes: FxHashMap::default(),
            });
    }

    /// Determine the stale set of virtual sources given their current
    /// `(mtime, recompute_hash)` state, honoring the strict-mode fallback
    /// ladder: missing metadata with known dependencies falls back to
    /// fingerprint-based detection when fingerprints exist, otherwise marks
    /// every such source stale; in `Error` mode that fallback instead
    /// aborts.
    pub fn stale_sources<F>(
        &self,
        known_sources: &[SourcePath],
        current_mtime: impl Fn(&SourcePath) -> Option<f64>,
        current_hash: F,
        fingerprints_available: bool,
        strict: StrictMode,
    ) -> Result<FxHashSet<SourcePath>, String>
    where
        F: Fn(&SourcePath) -> Option<ContentHash>,
    {
        let mut stale = FxHashSet::default();
        let known: FxHashSet<&SourcePath> = known_sources.iter().collect();

        // Deleted sources (had dependencies, no longer present) are stale.
        for source in self.dependencies.keys() {
            if !known.contains(source) {
                stale.insert(source.clone());
            }
        }

        for source in known_sources {
            let Some(meta) = self.metadata.get(source) else {
                if self.dependencies.contains_key(source) {
                    let message = format!("missing autodoc metadata for {source} with existing dependencies");
                    match strict {
                        StrictMode::Error => return Err(message),
                        StrictMode::Warn => crate::warn!("cache"; "{}", message),
                        StrictMode::Off => {}
                    }
                    if fingerprints_available {
                        // Caller is expected to have already consulted the
                        // fingerprint table; we can't re-derive that here,
                        // so conservatively leave this source out of the
                        // stale set and let fingerprint-driven detection
                        // handle it upstream.
                    } else {
                        stale.insert(source.clone());
                    }
                }
                continue;
            };
            let mtime_unchanged = current_mtime(source).map(|m| m == meta.mtime).unwrap_or(false);
            if mtime_unchanged {
                continue;
            }
            match current_hash(source) {
                Some(hash) if hash == meta.content_hash => continue,
                _ => {
                    stale.insert(source.clone());
                }
            }
        }

        Ok(stale)
    }

    pub fn generated_pages_of(&self, source: &SourcePath) -> impl Iterator<Item = &SourcePath> {
        self.dependencies.get(source).into_iter().flatten()
    }

    pub fn remove_source(&mut self, source: &SourcePath) {
        self.dependencies.remove(source);
        self.metadata.remove(source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mtime_unchanged_short_circuits_hash_check() {
        let mut tracker = AutodocTracker::default();
        let source = SourcePath::new("api.openapi.yaml");
        tracker.add_autodoc_dependency(source.clone(), SourcePath::new("api/index.html"), ContentHash::from_hex("aaaaaaaaaaaaaaaa"), 100.0);
        let stale = tracker
            .stale_sources(
                &[source.clone()],
                |_| Some(100.0),
                |_| panic!("should not hash when mtime unchanged"),
                true,
                StrictMode::Off,
            )
            .unwrap();
        assert!(stale.is_empty());
    }

    #[test]
    fn mtime_changed_but_hash_matches_is_not_stale() {
        let mut tracker = AutodocTracker::default();
        let source = SourcePath::new("api.openapi.yaml");
        let hash = ContentHash::from_hex("aaaaaaaaaaaaaaaa");
        tracker.add_autodoc_dependency(source.clone(), SourcePath::new("api/index.html"), hash.clone(), 100.0);
        let stale = tracker
            .stale_sources(&[source.clone()], |_| Some(200.0), |_| Some(hash.clone()), true, StrictMode::Off)
            .unwrap();
        assert!(stale.is_empty());
    }

    #[test]
    fn deleted_source_is_stale() {
        let mut tracker = AutodocTracker::default();
        let source = SourcePath::new("api.openapi.yaml");
        tracker.add_autodoc_dependency(source.clone(), SourcePath::new("api/index.html"), ContentHash::from_hex("aaaaaaaaaaaaaaaa"), 100.0);
        let stale = tracker.stale_sources(&[], |_| None, |_| None, true, StrictMode::Off).unwrap();
        assert!(stale.contains(&source));
    }

    #[test]
    fn missing_metadata_without_fingerprints_marks_stale() {
        let mut tracker = AutodocTracker::default();
        let source = SourcePath::new("api.openapi.yaml");
        tracker.dependencies.entry(source.clone()).or_default().insert(SourcePath::new("api/index.html"));
        let stale = tracker.stale_sources(&[source.clone()], |_| None, |_| None, false, StrictMode::Off).unwrap();
        assert!(stale.contains(&source));
    }

    #[test]
    fn missing_metadata_in_error_mode_aborts() {
        let mut tracker = AutodocTracker::default();
        let source = SourcePath::new("api.openapi.yaml");
        tracker.dependencies.entry(source.clone()).or_default().insert(SourcePath::new("api/index.html"));
        let result = tracker.stale_sources(&[source.clone()], |_| None, |_| None, false, StrictMode::Error);
        assert!(result.is_err());
    }
}
