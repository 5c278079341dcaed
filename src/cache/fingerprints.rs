//! File-change detection.
//!
//! `is_changed` first compares `(mtime, size)`; only on a mismatch does it
//! recompute the content hash, which defeats "touch without content
//! change" (editors, sync tools) by refreshing the cached mtime and
//! reporting unchanged.

use crate::cache::store::Cacheable;
use crate::primitives::hash::{Fingerprint, hash_file, stat};
use crate::primitives::{ContentHash, SourcePath};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintEntry {
    pub path: SourcePath,
    pub fingerprint: Fingerprint,
}

impl Cacheable for FingerprintEntry {
    fn to_cache_dict(&self) -> Value {
        serde_json::json!({
            "path": self.path.as_str(),
            "hash": self.fingerprint.hash.as_str(),
            "mtime": self.fingerprint.mtime,
            "size": self.fingerprint.size,
        })
    }

    fn from_cache_dict(value: &Value) -> Result<Self, String> {
        let path = value.get("path").and_then(Value::as_str).ok_or("missing path")?;
        let hash = value.get("hash").and_then(Value::as_str).ok_or("missing hash")?;
        let mtime = value.get("mtime").and_then(Value::as_f64).ok_or("missing mtime")?;
        let size = value.get("size").and_then(Value::as_u64).ok_or("missing size")?;
        Ok(FingerprintEntry {
            path: SourcePath::new(path),
            fingerprint: Fingerprint {
                hash: ContentHash::from_hex(hash),
                mtime,
                size,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Unchanged,
    Changed,
    Added,
}

/// A mutable table of known fingerprints plus the refresh-on-touch logic.
#[derive(Default)]
pub struct FingerprintTable {
    entries: FxHashMap<SourcePath, Fingerprint>,
}

impl FingerprintTable {
    pub fn from_entries(entries: Vec<FingerprintEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.path, e.fingerprint)).collect(),
        }
    }

    pub fn into_entries(self) -> Vec<FingerprintEntry> {
        self.entries
            .into_iter()
            .map(|(path, fingerprint)| FingerprintEntry { path, fingerprint })
            .collect()
    }

    pub fn get(&self, path: &SourcePath) -> Option<&Fingerprint> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &SourcePath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &SourcePath> {
        self.entries.keys()
    }

    /// Determine whether `fs_path` (keyed as `source_path`) changed since
    /// the last recorded fingerprint. `stat(2)` is consulted first; content
    /// is only hashed when `(mtime, size)` disagrees with the cached value,
    /// so an untouched file costs a metadata read, never a full read.
    pub fn is_changed(&mut self, source_path: &SourcePath, fs_path: &Path) -> std::io::Result<ChangeStatus> {
        let (mtime, size) = stat(fs_path)?;
        let Some(cached) = self.entries.get(source_path).cloned() else {
            let hash = hash_file(fs_path)?;
            self.entries.insert(source_path.clone(), Fingerprint { hash, mtime, size });
            return Ok(ChangeStatus::Added);
        };
        if cached.mtime == mtime && cached.size == size {
            return Ok(ChangeStatus::Unchanged);
        }
        let hash = hash_file(fs_path)?;
        if cached.hash == hash {
            // Touch without content change: refresh mtime, report unchanged.
            self.entries.insert(source_path.clone(), Fingerprint { hash, mtime, size });
            return Ok(ChangeStatus::Unchanged);
        }
        self.entries.insert(source_path.clone(), Fingerprint { hash, mtime, size });
        Ok(ChangeStatus::Changed)
    }

    /// `stat`-only change check: `Unchanged` is certain without hashing,
    /// but `Changed`/`Added` are provisional — content may still turn out
    /// identical (a touch). Callers that can tolerate a false "changed"
    /// (e.g. deciding whether a disk read is needed at all) use this to
    /// skip hashing on the common unchanged path.
    pub fn stat_unchanged(&self, source_path: &SourcePath, fs_path: &Path) -> std::io::Result<bool> {
        let (mtime, size) = stat(fs_path)?;
        Ok(self.entries.get(source_path).is_some_and(|c| c.mtime == mtime && c.size == size))
    }

    pub fn remove(&mut self, path: &SourcePath) {
        self.entries.remove(path);
    }
}
