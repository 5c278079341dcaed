//! A generic, versioned, tolerant JSON-backed store for typed entries.
//!
//! Disk layout:
//! ```json
//! { "version": <int>, "entries": [ {...}, ... ] }
//! ```
//!
//! Tolerant-load contract, in priority order: missing file → empty, no log;
//! JSON root not an object → empty + error log; version mismatch → empty +
//! warn log; `entries` not an array → empty + error log; a single entry's
//! `from_cache_dict` failing → skip that entry + error log, the rest still
//! load.

use crate::primitives::atomic_write;
use serde_json::Value;
use std::path::PathBuf;

/// Any type that can be serialized to a JSON-safe mapping and reconstructed
/// losslessly. `datetime` maps to ISO-8601 strings, `set` to a sorted list,
/// `Path` to a POSIX string — callers are responsible for those conventions
/// in their own `to_cache_dict`/`from_cache_dict`.
pub trait Cacheable: Sized {
    fn to_cache_dict(&self) -> Value;
    fn from_cache_dict(value: &Value) -> Result<Self, String>;
}

pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }

    pub fn save<T: Cacheable>(&self, entries: &[T], version: u32) -> std::io::Result<()> {
        let payload = serde_json::json!({
            "version": version,
            "entries": entries.iter().map(Cacheable::to_cache_dict).collect::<Vec<_>>(),
        });
        let bytes = serde_json::to_vec_pretty(&payload)?;
        atomic_write(&self.path, &bytes)
    }

    /// Tolerant load: never returns an `Err`, only ever an empty `Vec` on
    /// any anomaly, with a log emitted per the rules above.
    pub fn load<T: Cacheable>(&self, expected_version: u32) -> Vec<T> {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        let Ok(data) = serde_json::from_str::<Value>(&raw) else {
            crate::error!("cache"; "malformed JSON in {}", self.path.display());
            return Vec::new();
        };
        let Some(obj) = data.as_object() else {
            crate::error!("cache"; "expected object at top of {}", self.path.display());
            return Vec::new();
        };
        let file_version = obj.get("version").and_then(Value::as_u64);
        if file_version != Some(expected_version as u64) {
            crate::warn!("cache"; "version mismatch in {} (found {:?}, expected {}); rebuilding", self.path.display(), file_version, expected_version);
            return Vec::new();
        }
        let Some(entries) = obj.get("entries").and_then(Value::as_array) else {
            crate::error!("cache"; "'entries' is not an array in {}", self.path.display());
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| match T::from_cache_dict(entry) {
                Ok(v) => Some(v),
                Err(e) => {
                    crate::error!("cache"; "failed to deserialize entry from {}: {}", self.path.display(), e);
                    None
                }
            })
            .collect()
    }
}

/// Mirrors `log!`/`debug!` in `logger.rs` for the warn/error severities the
/// tolerant-load contract needs.
#[macro_export]
macro_rules! warn {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::warn($module, &format!($($arg)*))
    }};
}

#[macro_export]
macro_rules! error {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::error($module, &format!($($arg)*))
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        name: String,
        count: u32,
    }

    impl Cacheable for Widget {
        fn to_cache_dict(&self) -> Value {
            serde_json::json!({"name": self.name, "count": self.count})
        }

        fn from_cache_dict(value: &Value) -> Result<Self, String> {
            let name = value
                .get("name")
                .and_then(Value::as_str)
                .ok_or("missing name")?
                .to_string();
            let count = value
                .get("count")
                .and_then(Value::as_u64)
                .ok_or("missing count")? as u32;
            Ok(Widget { name, count })
        }
    }

    #[test]
    fn roundtrip_preserves_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("widgets.json"));
        let widgets = vec![
            Widget { name: "a".into(), count: 1 },
            Widget { name: "b".into(), count: 2 },
        ];
        store.save(&widgets, 1).unwrap();
        let loaded: Vec<Widget> = store.load(1);
        assert_eq!(loaded, widgets);
    }

    #[test]
    fn missing_file_returns_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("nope.json"));
        let loaded: Vec<Widget> = store.load(1);
        assert!(loaded.is_empty());
    }

    #[test]
    fn version_mismatch_returns_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("widgets.json"));
        store.save(&vec![Widget { name: "a".into(), count: 1 }], 2).unwrap();
        let loaded: Vec<Widget> = store.load(1);
        assert!(loaded.is_empty());
    }

    #[test]
    fn corrupt_json_returns_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("widgets.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = CacheStore::new(path);
        let loaded: Vec<Widget> = store.load(1);
        assert!(loaded.is_empty());
    }

    #[test]
    fn one_bad_entry_does_not_block_the_rest() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("widgets.json");
        let payload = serde_json::json!({
            "version": 1,
            "entries": [
                {"name": "good", "count": 1},
                {"name": "missing-count"},
                {"name": "also-good", "count": 2},
            ],
        });
        std::fs::write(&path, serde_json::to_vec(&payload).unwrap()).unwrap();
        let store = CacheStore::new(path);
        let loaded: Vec<Widget> = store.load(1);
        assert_eq!(loaded.len(), 2);
    }
}
