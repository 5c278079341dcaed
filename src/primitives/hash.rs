//! Content addressing primitives.
//!
//! `ContentHash` is a 16-hex-character prefix of SHA-256 over canonical
//! bytes — stable, short, collision-safe at site scale, and JSON-friendly.
//! `Fingerprint` pairs a hash with `(mtime, size)` so callers can skip
//! re-hashing unchanged files.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// 16-hex-character prefix of a SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Zero-length input hash — used as a sentinel for "no content".
    pub fn empty() -> Self {
        hash_bytes(b"")
    }

    /// Reconstruct a `ContentHash` from its stored hex representation
    /// (used when deserializing cache entries).
    pub fn from_hex(hex: &str) -> Self {
        Self(hex.to_string())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compute the content hash of a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    ContentHash(hex::encode(digest)[..16].to_string())
}

/// Compute the content hash of a file's contents, streaming in chunks.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    Ok(ContentHash(hex::encode(digest)[..16].to_string()))
}

/// Canonicalize a JSON-serializable value (sorted keys) and hash the result.
///
/// Required for stable metadata hashes: two logically-equal maps must
/// produce the same hash regardless of field insertion order.
pub fn hash_dict<T: Serialize>(value: &T) -> ContentHash {
    let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
    let canonical = canonicalize(&value);
    hash_bytes(canonical.as_bytes())
}

fn canonicalize(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = String::from("{");
            for (i, k) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(k).unwrap());
                out.push(':');
                out.push_str(&canonicalize(&map[*k]));
            }
            out.push('}');
            out
        }
        serde_json::Value::Array(items) => {
            let mut out = String::from("[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&canonicalize(item));
            }
            out.push(']');
            out
        }
        other => serde_json::to_string(other).unwrap_or_else(|_| "null".to_string()),
    }
}

/// `(hash, mtime, size)` — lets callers short-circuit hashing when the stat
/// pair is unchanged from a prior build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub hash: ContentHash,
    pub mtime: f64,
    pub size: u64,
}

/// Capture hash, mtime, and size in one filesystem pass.
pub fn hash_file_with_stat(path: &Path) -> io::Result<Fingerprint> {
    let (mtime, size) = stat(path)?;
    let hash = hash_file(path)?;
    Ok(Fingerprint { hash, mtime, size })
}

/// `(mtime, size)` from a single `stat(2)` call, no content read. The cheap
/// half of a [`Fingerprint`] comparison — callers hash only when this
/// disagrees with a cached value.
pub fn stat(path: &Path) -> io::Result<(f64, u64)> {
    let meta = std::fs::metadata(path)?;
    let mtime = meta.modified()?.duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0);
    Ok((mtime, meta.len()))
}
