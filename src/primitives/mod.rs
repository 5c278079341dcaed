//! Primitives: hashing, atomic file write, LRU cache, path normalization.

pub mod atomic;
pub mod hash;
pub mod lru;
pub mod path;

pub use atomic::atomic_write;
pub use hash::{ContentHash, Fingerprint, hash_bytes, hash_dict, hash_file, hash_file_with_stat};
pub use lru::LruCache;
pub use path::SourcePath;
