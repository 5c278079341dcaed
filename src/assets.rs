//! Asset processing (§4.10 phase 11): copies every discovered [`Asset`]
//! into the output tree, content-hashes it, and maintains the manifest
//! whose mtime the rendered-output cache keys on. A page's own content can
//! be byte-for-byte unchanged while an asset it references gets a new
//! fingerprint (a new build of a bundled script, say) — the manifest mtime
//! is the one signal the render cache has for "something downstream of
//! this page's own source might have moved", so any manifest change
//! invalidates every rendered-output entry rather than trying to track
//! which pages actually reference which assets.

use crate::content::asset::Asset;
use crate::primitives::atomic::atomic_write;
use crate::primitives::hash::hash_file;
use crate::primitives::path::SourcePath;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

pub const MANIFEST_FILE_NAME: &str = "asset-manifest.json";

/// Outcome of one assets phase: whether the manifest's content changed
/// relative to what was on disk before this build, and the manifest
/// file's mtime after writing (fed into every `RenderedOutputQuery`).
pub struct ProcessResult {
    pub manifest_changed: bool,
    pub manifest_mtime: f64,
}

fn source_fs_path(site_root: &Path, asset: &Asset) -> std::path::PathBuf {
    site_root.join(asset.source_path.to_path_buf())
}

fn copy_one(site_root: &Path, output_dir: &Path, asset: &mut Asset) -> anyhow::Result<(String, String)> {
    let source = source_fs_path(site_root, asset);
    let hash = hash_file(&source)?;
    asset.content_hash = Some(hash.clone());
    let bytes = fs::read(&source)?;
    let dest = output_dir.join(asset.output_path.to_path_buf());
    atomic_write(&dest, &bytes)?;
    Ok((asset.output_path.as_str().to_string(), hash.as_str().to_string()))
}

/// Copy every asset to `output_dir`, filling in each `Asset::content_hash`,
/// then write the sorted manifest and report whether it differs from
/// `previous_manifest_hash`. `workers` follows the same convention as the
/// scheduler: `Some(n > 1)` uses a rayon pool, anything else runs inline.
pub fn process(
    site_root: &Path,
    output_dir: &Path,
    assets: &mut [Asset],
    workers: Option<usize>,
    previous_manifest_hash: Option<&str>,
) -> anyhow::Result<ProcessResult> {
    let entries: Vec<(String, String)> = match workers {
        Some(n) if n > 1 => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
            pool.install(|| assets.par_iter_mut().map(|a| copy_one(site_root, output_dir, a)).collect::<anyhow::Result<Vec<_>>>())?
        }
        _ => assets.iter_mut().map(|a| copy_one(site_root, output_dir, a)).collect::<anyhow::Result<Vec<_>>>()?,
    };

    let manifest: BTreeMap<String, String> = entries.into_iter().collect();
    let body = serde_json::to_vec_pretty(&manifest)?;
    let manifest_path = output_dir.join(MANIFEST_FILE_NAME);
    atomic_write(&manifest_path, &body)?;

    let manifest_hash = crate::primitives::hash::hash_bytes(&body);
    let manifest_changed = previous_manifest_hash != Some(manifest_hash.as_str());
    let manifest_mtime = manifest_mtime(&manifest_path)?;

    Ok(ProcessResult { manifest_changed, manifest_mtime })
}

fn manifest_mtime(path: &Path) -> io::Result<f64> {
    let meta = fs::metadata(path)?;
    let modified = meta.modified()?;
    Ok(modified.duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs_f64())
}

/// Asset output paths produced this build, for callers that need to know
/// which files the manifest now claims (e.g. stale-file pruning).
pub fn output_paths(assets: &[Asset]) -> Vec<SourcePath> {
    assets.iter().map(|a| a.output_path.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::SourcePath;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn copies_asset_and_fills_content_hash() {
        let tmp = TempDir::new().unwrap();
        let site_root = tmp.path().join("site");
        write(&site_root, "assets/style.css", "body {}");
        let output_dir = tmp.path().join("public");
        fs::create_dir_all(&output_dir).unwrap();

        let mut assets = vec![Asset::new(
            SourcePath::new("assets/style.css"),
            SourcePath::new("assets/style.css"),
            false,
        )];
        let result = process(&site_root, &output_dir, &mut assets, None, None).unwrap();
        assert!(result.manifest_changed);
        assert!(assets[0].content_hash.is_some());
        assert!(output_dir.join("assets/style.css").exists());
        assert!(output_dir.join(MANIFEST_FILE_NAME).exists());
    }

    #[test]
    fn manifest_unchanged_when_hash_matches() {
        let tmp = TempDir::new().unwrap();
        let site_root = tmp.path().join("site");
        write(&site_root, "assets/a.js", "console.log(1)");
        let output_dir = tmp.path().join("public");
        fs::create_dir_all(&output_dir).unwrap();

        let mut assets = vec![Asset::new(SourcePath::new("assets/a.js"), SourcePath::new("assets/a.js"), false)];
        let first = process(&site_root, &output_dir, &mut assets, None, None).unwrap();
        let manifest_bytes = fs::read(output_dir.join(MANIFEST_FILE_NAME)).unwrap();
        let manifest_hash = crate::primitives::hash::hash_bytes(&manifest_bytes);

        let second = process(&site_root, &output_dir, &mut assets, None, Some(manifest_hash.as_str())).unwrap();
        assert!(first.manifest_changed);
        assert!(!second.manifest_changed);
    }
}
