//! Content discovery (§4.4): walks `content/` into `Page`/`Section` arenas
//! and the theme/site `assets/` trees into a merged `Asset` list.
//!
//! A page whose fingerprint is unchanged from the last build never has its
//! body read: its [`PageCore`] comes back from [`PageCoreCache`] and it
//! enters the arena as a [`PageHandle::Lazy`] proxy, satisfying the "no
//! disk I/O for their body" half of the incremental-build contract;
//! [`crate::cache::dependencies`]/[`crate::cache::parsed_content`] still
//! decide whether its *rendered* output needs recomputing.

use crate::cache::BuildCache;
use crate::cache::fingerprints::ChangeStatus;
use crate::content::asset::{Asset, merge_assets};
use crate::content::frontmatter;
use crate::content::page::{FileSystemLoader, Page, PageHandle, PageLoader};
use crate::content::page_core::PageCore;
use crate::content::section::Section;
use crate::primitives::SourcePath;
use crate::primitives::atomic::is_residual_tmp;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Every page/section the content tree yielded, plus the assets found
/// under `assets/` and (if present) the active theme's `assets/`.
pub struct DiscoveryResult {
    pub pages: Vec<PageHandle>,
    pub sections: Vec<Section>,
    pub section_by_path: FxHashMap<SourcePath, usize>,
    /// Pages with no section — only possible when `content/_index.md`
    /// itself is absent, so the content root never became a real section.
    pub top_level_page_indices: Vec<usize>,
    pub assets: Vec<Asset>,
}

/// Walk `<root>/content` (if present) into pages and sections, consulting
/// `cache` to skip reading the body of any file whose fingerprint hasn't
/// moved. `theme_dir` is the active theme's root, if any.
pub fn discover(root: &Path, theme_dir: Option<&Path>, cache: &mut BuildCache) -> anyhow::Result<DiscoveryResult> {
    let content_dir = root.join("content");
    let loader: Arc<dyn PageLoader> = Arc::new(FileSystemLoader { site_root: root.to_path_buf() });

    let mut sections: Vec<Section> = Vec::new();
    let mut section_by_path: FxHashMap<SourcePath, usize> = FxHashMap::default();
    let mut pages: Vec<PageHandle> = Vec::new();
    let mut top_level_page_indices: Vec<usize> = Vec::new();

    if content_dir.is_dir() {
        let mut dirs = collect_dirs(&content_dir)?;
        dirs.sort_by_key(|p| p.components().count());
        let md_files = collect_markdown_files(&content_dir)?;

        let root_has_index = content_dir.join("_index.md").is_file();
        let root_section_path = SourcePath::new("");
        if root_has_index {
            sections.push(Section {
                path: Some(root_section_path.clone()),
                ..Default::default()
            });
            section_by_path.insert(root_section_path.clone(), 0);
        }

        for dir in &dirs {
            if dir == &content_dir {
                continue;
            }
            let rel = SourcePath::from_fs_path(dir, root);
            let parent_dir = dir.parent().expect("walked dir has a parent");
            let parent_index = if parent_dir == content_dir {
                root_has_index.then_some(0)
            } else {
                let parent_rel = SourcePath::from_fs_path(parent_dir, root);
                section_by_path.get(&parent_rel).copied()
            };
            let index = sections.len();
            sections.push(Section {
                path: Some(rel.clone()),
                parent_index,
                ..Default::default()
            });
            section_by_path.insert(rel, index);
            if let Some(p) = parent_index {
                sections[p].subsection_indices.push(index);
            }
        }

        for file in md_files.iter().filter(|f| is_index_file(f)) {
            let dir = file.parent().expect("file has a parent");
            let section_path = if dir == content_dir { root_section_path.clone() } else { SourcePath::from_fs_path(dir, root) };
            let Some(&idx) = section_by_path.get(&section_path) else { continue };
            let raw = std::fs::read_to_string(file)?;
            let (frontmatter, _body) = frontmatter::split(&raw);
            if let Value::Object(map) = frontmatter {
                sections[idx].metadata = map;
            }
        }

        for file in md_files.iter().filter(|f| !is_index_file(f)) {
            let source_path = SourcePath::from_fs_path(file, root);
            let dir = file.parent().expect("file has a parent");
            let section_path = if dir == content_dir {
                root_has_index.then_some(root_section_path.clone())
            } else {
                Some(SourcePath::from_fs_path(dir, root))
            };

            let handle = load_page_handle(file, &source_path, section_path.clone(), cache, &loader)?;
            let index = pages.len();
            pages.push(handle);
            match section_path.and_then(|p| section_by_path.get(&p).copied()) {
                Some(sidx) => sections[sidx].page_indices.push(index),
                None => top_level_page_indices.push(index),
            }
        }
    }

    let site_assets = discover_asset_tree(&root.join("assets"), root, false)?;
    let theme_assets = match theme_dir {
        Some(dir) => discover_asset_tree(&dir.join("assets"), root, true)?,
        None => Vec::new(),
    };
    let assets = merge_assets(theme_assets, site_assets);

    Ok(DiscoveryResult {
        pages,
        sections,
        section_by_path,
        top_level_page_indices,
        assets,
    })
}

fn is_index_file(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some("_index.md")
}

/// Build this page's `PageHandle`: a cache hit and unchanged fingerprint
/// produce a `Lazy` proxy from the cached `PageCore` with no body read; a
/// miss or change reads, splits, and parses frontmatter once, eagerly.
fn load_page_handle(
    fs_path: &Path,
    source_path: &SourcePath,
    section_path: Option<SourcePath>,
    cache: &mut BuildCache,
    loader: &Arc<dyn PageLoader>,
) -> anyhow::Result<PageHandle> {
    let cached_core = cache.page_cores.get(source_path).cloned();
    let fingerprint_known = cache.fingerprints.contains(source_path);
    let stat_unchanged = cached_core.is_some() && fingerprint_known && cache.fingerprints.stat_unchanged(source_path, fs_path).unwrap_or(false);

    if stat_unchanged {
        let mut core = cached_core.expect("checked above");
        core.section = section_path;
        return Ok(PageHandle::lazy(core, Arc::clone(loader)));
    }

    let raw = std::fs::read_to_string(fs_path).map_err(|e| {
        anyhow::anyhow!(crate::error::BuildError::Discovery {
            path: source_path.clone(),
            message: e.to_string(),
        })
    })?;
    let status = cache.fingerprints.is_changed(source_path, fs_path)?;
    let (frontmatter, body) = frontmatter::split(&raw);
    let file_hash = status_hash(&cache, source_path, status);
    let mut core = PageCore::from_frontmatter(source_path.clone(), &frontmatter, file_hash);
    core.section = section_path;
    cache.page_cores.store(core.clone());

    let mut page = Page::new(core, body.to_string());
    if let Value::Object(map) = frontmatter {
        page.metadata = map;
    }
    Ok(PageHandle::Loaded(page))
}

fn status_hash(cache: &BuildCache, source_path: &SourcePath, status: ChangeStatus) -> Option<crate::primitives::ContentHash> {
    let _ = status;
    cache.fingerprints.get(source_path).map(|fp| fp.hash.clone())
}

fn collect_dirs(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = vec![root.to_path_buf()];
    for entry in jwalk::WalkDir::new(root).sort(true) {
        let entry = entry?;
        if entry.file_type().is_dir() && entry.path() != root {
            out.push(entry.path());
        }
    }
    Ok(out)
}

fn collect_markdown_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in jwalk::WalkDir::new(root).sort(true) {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if is_residual_tmp(&path) || is_dotfile(&path) {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some("md") {
            out.push(path);
        }
    }
    Ok(out)
}

/// Every non-`.md` file under `dir`, dotfiles and crash-residual `.tmp`
/// files excluded.
fn discover_asset_tree(dir: &Path, root: &Path, is_theme: bool) -> std::io::Result<Vec<Asset>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in jwalk::WalkDir::new(dir).sort(true) {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if is_residual_tmp(&path) || is_dotfile(&path) {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some("md") {
            continue;
        }
        let source_path = SourcePath::from_fs_path(&path, root);
        let output_path = SourcePath::from_fs_path(&path, dir.parent().unwrap_or(dir));
        out.push(Asset::new(source_path, output_path, is_theme));
    }
    Ok(out)
}

fn is_dotfile(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn discovers_pages_sections_and_assets() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("content/_index.md"), "---\ntitle: Home\n---\n");
        write(&root.join("content/about.md"), "---\ntitle: About\n---\nHello\n");
        write(&root.join("content/blog/_index.md"), "---\ntitle: Blog\n---\n");
        write(&root.join("content/blog/post-1.md"), "---\ntitle: Post 1\ndate: 2024-01-01\n---\nBody\n");
        write(&root.join("assets/style.css"), "body {}");

        let mut cache = BuildCache::empty(root.join(".cache"));
        let result = discover(root, None, &mut cache).unwrap();

        assert_eq!(result.sections.len(), 2); // root + blog
        assert_eq!(result.top_level_page_indices.len(), 0); // root has _index.md
        assert_eq!(result.pages.len(), 2);
        assert_eq!(result.assets.len(), 1);

        let blog_idx = *result.section_by_path.get(&SourcePath::new("content/blog")).unwrap();
        assert_eq!(result.sections[blog_idx].page_indices.len(), 1);
    }

    #[test]
    fn unchanged_page_becomes_lazy_without_reading_body() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        let page_path = root.join("content/about.md");
        write(&page_path, "---\ntitle: About\n---\nHello\n");

        let mut cache = BuildCache::empty(root.join(".cache"));
        let first = discover(root, None, &mut cache).unwrap();
        assert!(first.pages[0].is_loaded());

        let second = discover(root, None, &mut cache).unwrap();
        assert!(!second.pages[0].is_loaded());
        assert_eq!(second.pages[0].core().title, "About");
    }

    #[test]
    fn pages_directly_under_unindexed_root_are_top_level() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("content/solo.md"), "---\ntitle: Solo\n---\n");

        let mut cache = BuildCache::empty(root.join(".cache"));
        let result = discover(root, None, &mut cache).unwrap();
        assert!(result.sections.is_empty());
        assert_eq!(result.top_level_page_indices, vec![0]);
    }

    #[test]
    fn residual_tmp_files_are_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        write(&root.join("content/about.md"), "---\ntitle: About\n---\n");
        write(&root.join("content/about.md.123.4.5.tmp"), "garbage");

        let mut cache = BuildCache::empty(root.join(".cache"));
        let result = discover(root, None, &mut cache).unwrap();
        assert_eq!(result.pages.len(), 1);
    }

    #[test]
    fn theme_assets_are_overridden_by_site_assets() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        let theme = root.join("themes/default");
        write(&theme.join("assets/style.css"), "theme");
        write(&root.join("assets/style.css"), "site");

        let mut cache = BuildCache::empty(root.join(".cache"));
        let result = discover(root, Some(&theme), &mut cache).unwrap();
        assert_eq!(result.assets.len(), 1);
        assert!(!result.assets[0].is_theme);
    }
}
