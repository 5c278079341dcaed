//! Atomic file writes.
//!
//! Write to a uniquely-named temp file alongside the destination, fsync,
//! then rename. Readers never observe a truncated write; an interrupted
//! write leaves a `.tmp` file that discovery's exclusion rule skips.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn tmp_path_for(dest: &Path) -> PathBuf {
    let tid = thread_id();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut os = dest.as_os_str().to_owned();
    os.push(format!(".{}.{}.{}.tmp", process::id(), tid, n));
    PathBuf::from(os)
}

fn thread_id() -> u64 {
    // A lightweight, non-cryptographic per-thread discriminator; collisions
    // are harmless since the pid+counter pair is already unique per-process.
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    std::hash::Hash::hash(&std::thread::current().id(), &mut hasher);
    std::hash::Hasher::finish(&hasher)
}

/// Write `contents` to `dest` atomically: write to a temp file, fsync,
/// rename over the destination.
pub fn atomic_write(dest: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path_for(dest);
    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, dest)?;
        Ok(())
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// `true` if `path` is a crash-residual temp file from an interrupted
/// atomic write (matches the `.<pid>.<tid>.<n>.tmp` suffix pattern).
pub fn is_residual_tmp(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "tmp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_full_contents() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.html");
        atomic_write(&dest, b"<html></html>").unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"<html></html>");
    }

    #[test]
    fn creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a/b/c/out.html");
        atomic_write(&dest, b"x").unwrap();
        assert!(dest.exists());
    }

    #[test]
    fn leaves_no_tmp_file_on_success() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.html");
        atomic_write(&dest, b"x").unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| is_residual_tmp(&e.path()))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn residual_tmp_detection() {
        assert!(is_residual_tmp(Path::new("out.html.123.456.7.tmp")));
        assert!(!is_residual_tmp(Path::new("out.html")));
    }
}
