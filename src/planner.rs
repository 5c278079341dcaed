//! Incremental planner (§4.8): decides what actually needs rebuilding.
//!
//! Split into the three questions the design notes separate: D1, what
//! changed on disk; D2, which pages that forces to re-render, following
//! reverse dependencies; D3, which derived structures (taxonomy, menu,
//! related posts) are worth recomputing at all. D3 deliberately stays
//! coarse — it only gates *whether* to call into `taxonomy::plan`,
//! `taxonomy::menu::should_rebuild`, and `taxonomy::related::should_compute`,
//! which already carry their own fine-grained staleness checks. Doing the
//! precise diff twice would just move the cost, not remove it.

use crate::cache::BuildCache;
use crate::config::StrictMode;
use crate::content::page::PageHandle;
use crate::primitives::SourcePath;
use crate::site::Site;
use rustc_hash::FxHashSet;
use serde_json::{Map, Value};

/// Frontmatter keys whose change can move a page in or out of a menu,
/// change its URL, or change its visibility — anything that invalidates a
/// nav tree without necessarily invalidating the page's own rendered HTML.
pub const NAV_AFFECTING_KEYS: &[&str] = &[
    "title",
    "slug",
    "permalink",
    "aliases",
    "hidden",
    "draft",
    "visibility",
    "menu",
    "weight",
    "cascade",
    "redirect",
    "lang",
    "language",
    "translationkey",
    "_section",
];

/// Project `metadata` down to just the [`NAV_AFFECTING_KEYS`] it carries —
/// cheap to hash or compare instead of the whole frontmatter map.
pub fn extract_nav_metadata(metadata: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for &key in NAV_AFFECTING_KEYS {
        if let Some(v) = metadata.get(key) {
            out.insert(key.to_string(), v.clone());
        }
    }
    out
}

/// D1: every source the build must treat as changed this round.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub changed_pages: FxHashSet<SourcePath>,
    pub changed_templates: FxHashSet<SourcePath>,
    pub stale_autodoc_sources: FxHashSet<SourcePath>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed_pages.is_empty() && self.changed_templates.is_empty() && self.stale_autodoc_sources.is_empty()
    }

    fn all(&self) -> Vec<SourcePath> {
        self.changed_pages
            .iter()
            .chain(self.changed_templates.iter())
            .chain(self.stale_autodoc_sources.iter())
            .cloned()
            .collect()
    }
}

/// A page discovery loaded eagerly is, by construction, a page whose
/// fingerprint moved or whose core was never cached — discovery only
/// leaves a page `Lazy` when [`crate::content::page::PageHandle`]'s proxy
/// promotion wasn't needed (§4.4). That makes `is_loaded()` the content
/// half of D1 for free, with no second fingerprint pass.
pub fn changed_content_pages(site: &Site) -> FxHashSet<SourcePath> {
    site.pages.iter().filter(|p| p.is_loaded()).map(|p| p.source_path().clone()).collect()
}

/// Fingerprint every file under `templates_dir`, returning the subset that
/// changed or is new since the last build. Templates aren't part of
/// content discovery, so they get their own pass through the same
/// fingerprint table content discovery uses.
pub fn changed_templates(cache: &mut BuildCache, templates_dir: &std::path::Path) -> std::io::Result<FxHashSet<SourcePath>> {
    let mut changed = FxHashSet::default();
    if !templates_dir.is_dir() {
        return Ok(changed);
    }
    for entry in jwalk::WalkDir::new(templates_dir).sort(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = SourcePath::from_fs_path(&path, templates_dir.parent().unwrap_or(templates_dir));
        match cache.fingerprints.is_changed(&rel, &path)? {
            crate::cache::fingerprints::ChangeStatus::Unchanged => {}
            _ => {
                changed.insert(rel);
            }
        }
    }
    Ok(changed)
}

pub fn build_change_set(
    site: &Site,
    cache: &mut BuildCache,
    templates_dir: &std::path::Path,
    known_autodoc_sources: &[SourcePath],
    autodoc_mtime: impl Fn(&SourcePath) -> Option<f64>,
    autodoc_hash: impl Fn(&SourcePath) -> Option<crate::primitives::ContentHash>,
    strict: StrictMode,
) -> anyhow::Result<ChangeSet> {
    let changed_templates = changed_templates(cache, templates_dir)?;
    let stale_autodoc_sources = cache
        .autodoc
        .stale_sources(known_autodoc_sources, autodoc_mtime, autodoc_hash, true, strict)
        .map_err(|e| anyhow::anyhow!(crate::error::BuildError::Cache(e)))?;
    Ok(ChangeSet {
        changed_pages: changed_content_pages(site),
        changed_templates,
        stale_autodoc_sources,
    })
}

/// D2 + full-rebuild triggers: the minimal set of page source paths that
/// must be (re)rendered this build.
#[derive(Debug, Default)]
pub struct RenderPlan {
    pub full_rebuild: bool,
    pub pages_to_render: FxHashSet<SourcePath>,
}

/// `changes` drives a partial rebuild unless any of the full-rebuild
/// triggers fire — a config edit, a theme swap, or a parser-version bump
/// can invalidate assumptions the dependency graph doesn't model, so those
/// always take every page rather than trust the graph (§4.8).
pub fn plan_render(
    site: &Site,
    cache: &BuildCache,
    changes: &ChangeSet,
    config_changed: bool,
    theme_changed: bool,
    parser_version_changed: bool,
    asset_manifest_changed: bool,
) -> RenderPlan {
    let full_rebuild = config_changed || theme_changed || parser_version_changed || asset_manifest_changed;
    if full_rebuild {
        return RenderPlan {
            full_rebuild: true,
            pages_to_render: site.pages.iter().map(|p| p.source_path().clone()).collect(),
        };
    }

    let changed = changes.all();
    let closure = cache.dependencies.affected_closure(&changed);
    let known_pages: FxHashSet<&SourcePath> = site.pages.iter().map(|p| p.source_path()).collect();

    let mut pages_to_render: FxHashSet<SourcePath> = changes.changed_pages.clone();
    for path in closure {
        if known_pages.contains(&path) {
            pages_to_render.insert(path);
        }
    }
    // A changed template/autodoc source with no recorded dependents yet
    // (first build after its introduction, or a dependency-graph miss)
    // still needs every page that resolves to it re-rendered; the
    // scheduler's template grouping makes this cheap to act on downstream,
    // so over-including here is harmless.
    for path in changes.changed_templates.iter().chain(&changes.stale_autodoc_sources) {
        if known_pages.contains(path) {
            pages_to_render.insert(path.clone());
        }
    }

    RenderPlan { full_rebuild: false, pages_to_render }
}

/// D3: whether this build should bother recomputing taxonomy, menu, and
/// related-posts structures at all. `true` only means "call into the
/// cheap planner for that structure" — the actual decision to regenerate
/// any one generated page still goes through
/// [`crate::cache::generated_members::GeneratedMembersCache::should_regenerate`]
/// or [`crate::taxonomy::menu::should_rebuild`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DerivedRecompute {
    pub taxonomy: bool,
    pub menu: bool,
    pub related: bool,
}

pub fn plan_derived(render_plan: &RenderPlan, config_changed: bool) -> DerivedRecompute {
    let any_change = render_plan.full_rebuild || !render_plan.pages_to_render.is_empty();
    DerivedRecompute {
        taxonomy: any_change,
        menu: any_change || config_changed,
        related: any_change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::page::{FileSystemLoader, Page, PageHandle};
    use crate::content::page_core::PageCore;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn site_with(pages: Vec<PageHandle>) -> Site {
        let mut site = Site::new(PathBuf::from("/site"), PathBuf::from("/site/public"), SiteConfig::default());
        site.top_level_page_indices = (0..pages.len()).collect();
        site.pages = pages;
        site
    }

    fn loaded(path: &str) -> PageHandle {
        let core = PageCore::from_frontmatter(SourcePath::new(path), &serde_json::json!({"title": path}), None);
        PageHandle::Loaded(Page::new(core, String::new()))
    }

    fn lazy(path: &str) -> PageHandle {
        let core = PageCore::from_frontmatter(SourcePath::new(path), &serde_json::json!({"title": path}), None);
        PageHandle::lazy(core, Arc::new(FileSystemLoader { site_root: "/site".into() }))
    }

    #[test]
    fn nav_metadata_extraction_keeps_only_nav_keys() {
        let mut meta = Map::new();
        meta.insert("title".into(), Value::String("Hi".into()));
        meta.insert("body_unrelated".into(), Value::String("x".into()));
        let extracted = extract_nav_metadata(&meta);
        assert!(extracted.contains_key("title"));
        assert!(!extracted.contains_key("body_unrelated"));
    }

    #[test]
    fn changed_content_pages_is_exactly_the_loaded_set() {
        let site = site_with(vec![loaded("a.md"), lazy("b.md")]);
        let changed = changed_content_pages(&site);
        assert_eq!(changed, FxHashSet::from_iter([SourcePath::new("a.md")]));
    }

    #[test]
    fn config_change_forces_full_rebuild() {
        let site = site_with(vec![lazy("a.md"), lazy("b.md")]);
        let cache = BuildCache::empty(PathBuf::from("/tmp/.cache"));
        let changes = ChangeSet::default();
        let plan = plan_render(&site, &cache, &changes, true, false, false, false);
        assert!(plan.full_rebuild);
        assert_eq!(plan.pages_to_render.len(), 2);
    }

    #[test]
    fn unrelated_unchanged_pages_are_not_rerendered() {
        let site = site_with(vec![loaded("a.md"), lazy("b.md")]);
        let cache = BuildCache::empty(PathBuf::from("/tmp/.cache"));
        let changes = ChangeSet {
            changed_pages: FxHashSet::from_iter([SourcePath::new("a.md")]),
            ..Default::default()
        };
        let plan = plan_render(&site, &cache, &changes, false, false, false, false);
        assert!(!plan.full_rebuild);
        assert_eq!(plan.pages_to_render, FxHashSet::from_iter([SourcePath::new("a.md")]));
    }

    #[test]
    fn template_change_pulls_in_dependent_pages_via_closure() {
        let site = site_with(vec![lazy("a.md")]);
        let mut cache = BuildCache::empty(PathBuf::from("/tmp/.cache"));
        cache.dependencies.set(SourcePath::new("a.md"), vec![SourcePath::new("post.html")]);
        let changes = ChangeSet {
            changed_templates: FxHashSet::from_iter([SourcePath::new("post.html")]),
            ..Default::default()
        };
        let plan = plan_render(&site, &cache, &changes, false, false, false, false);
        assert!(plan.pages_to_render.contains(&SourcePath::new("a.md")));
    }

    #[test]
    fn no_changes_yields_no_derived_recompute() {
        let plan = RenderPlan::default();
        let derived = plan_derived(&plan, false);
        assert!(!derived.taxonomy);
        assert!(!derived.menu);
        assert!(!derived.related);
    }
}
