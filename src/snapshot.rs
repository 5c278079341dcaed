//! `SiteSnapshot` (§3.7): the immutable view the wave scheduler renders
//! from. Built once per build from a finished [`crate::site::Site`] and
//! never mutated afterward — there is deliberately no `&mut` method on
//! [`SiteSnapshot`] past [`build`]; that absence *is* the immutability
//! invariant, enforced by the type system rather than by convention.
//!
//! Pages carry no inter-page render dependencies in this build core (a page
//! never waits on another page to finish rendering, only on its template),
//! so the topological wave decomposition (§4.7) degenerates to a single
//! wave: every renderable page index, in one wave, ordered by
//! [`attention_order`](SiteSnapshot::attention_order).

use crate::collaborators::template::{transitive_dependencies, TemplateEngine};
use crate::content::page::PageHandle;
use crate::content::page_core::PageCore;
use crate::content::section::Section;
use crate::primitives::{hash, ContentHash, SourcePath};
use crate::site::{MenuItem, Site};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A frozen, cheaply-cloneable view of one page, ready for template
/// rendering without touching the mutable build graph again.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub source_path: SourcePath,
    pub title: String,
    pub date: Option<f64>,
    pub tags: Vec<String>,
    pub aliases: Vec<String>,
    pub slug: Option<String>,
    pub weight: Option<i64>,
    pub lang: Option<String>,
    pub page_type: Option<String>,
    pub section_index: Option<usize>,
    pub output_path: Option<std::path::PathBuf>,
    pub rendered_html: Arc<String>,
    pub toc: Arc<String>,
    pub metadata: Arc<Map<String, Value>>,
    pub related_posts: Arc<Vec<SourcePath>>,
    /// Resolved by [`template_for`]; never absent.
    pub template: String,
    pub word_count: usize,
    pub reading_time_minutes: u32,
    pub content_hash: ContentHash,
    /// Higher sorts earlier in [`SiteSnapshot::attention_order`].
    pub attention_score: i64,
    /// Index into [`SiteSnapshot::pages`] of the next/previous page within
    /// the same section's sort order (§4.7 "next_page/prev_page").
    pub next_page: Option<usize>,
    pub prev_page: Option<usize>,
}

/// A frozen view of one section, with depth/hierarchy/template resolved
/// once rather than re-walked by every page that belongs to it.
#[derive(Debug, Clone)]
pub struct SectionSnapshot {
    pub path: Option<SourcePath>,
    pub metadata: Arc<Map<String, Value>>,
    pub page_indices: Vec<usize>,
    pub subsection_indices: Vec<usize>,
    pub parent_index: Option<usize>,
    /// Index into [`SiteSnapshot::pages`], once "finalize sections" has
    /// run. `None` for the root section.
    pub index_page: Option<usize>,
    /// Distance from the root section (root itself is depth 0).
    pub depth: usize,
    /// Titles from root to self, root excluded.
    pub hierarchy: Vec<String>,
    pub template_name: String,
}

/// One entry of the scout thread's warm-ahead plan (§4.9, §9 "scout
/// usefulness bound"): a template worth precompiling before its pages are
/// due to render, and the partials it statically pulls in.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoutHint {
    pub template_path: String,
    pub partial_paths: Vec<String>,
    pub pages_using: usize,
    pub priority: i64,
}

#[derive(Default)]
pub struct SiteSnapshot {
    pub version_id: String,
    pub pages: Vec<PageSnapshot>,
    pub sections: Vec<SectionSnapshot>,
    pub top_level_page_indices: Vec<usize>,
    pub top_level_section_indices: Vec<usize>,
    /// Topological render waves. Single wave unless a future inter-page
    /// dependency is introduced (§4.7).
    pub waves: Vec<Vec<usize>>,
    /// `template_name -> page indices`, in attention order within each
    /// group, so the scheduler can batch same-template pages together
    /// under the template-first strategy (§4.9).
    pub template_groups: FxHashMap<String, Vec<usize>>,
    /// All renderable page indices ordered by descending
    /// [`PageSnapshot::attention_score`], ties broken by `source_path`.
    pub attention_order: Vec<usize>,
    pub scout_hints: Vec<ScoutHint>,
    pub tag_to_pages: FxHashMap<String, Vec<usize>>,
    pub nav_trees: FxHashMap<String, Vec<MenuItem>>,
}

impl SiteSnapshot {
    /// Every page index reachable from `top_level_page_indices` union every
    /// section's `page_indices`, with no gaps and no duplicates (§4.7, §8
    /// "partition invariant").
    pub fn satisfies_partition_invariant(&self) -> bool {
        let mut seen = vec![false; self.pages.len()];
        for &i in &self.top_level_page_indices {
            seen[i] = true;
        }
        for section in &self.sections {
            for &i in &section.page_indices {
                seen[i] = true;
            }
            if let Some(i) = section.index_page {
                seen[i] = true;
            }
        }
        seen.into_iter().all(|s| s)
    }
}

/// Frontmatter `template` override, falling back to `"{page_type}.html"` or
/// `"page.html"` — the convention assumed at §4.7's open question on how
/// `template_name` is resolved, since this build core carries no front-end
/// template-selection logic of its own (§1 explicitly leaves template
/// authoring out of scope).
pub(crate) fn template_for(core: &PageCore, metadata: &Map<String, Value>) -> String {
    if let Some(name) = metadata.get("template").and_then(Value::as_str) {
        return name.to_string();
    }
    match &core.page_type {
        Some(t) => format!("{t}.html"),
        None => "page.html".to_string(),
    }
}

fn section_template_for(section: &Section) -> String {
    section
        .metadata
        .get("template")
        .and_then(Value::as_str)
        .unwrap_or("section.html")
        .to_string()
}

fn word_count(html_or_text: &str) -> usize {
    html_or_text.split_whitespace().count()
}

/// 200 words/minute, rounded up, minimum 1 for any non-empty page.
fn reading_time(words: usize) -> u32 {
    if words == 0 {
        return 0;
    }
    (words as u32).div_ceil(200).max(1)
}

fn attention_score(core: &PageCore, metadata: &Map<String, Value>, depth: usize) -> i64 {
    let featured = matches!(metadata.get("featured"), Some(Value::Bool(true))).then_some(1_000).unwrap_or(0);
    let recency = core.date.map(|d| (d / 86_400.0) as i64).unwrap_or(0);
    featured + recency - (depth as i64 * 10)
}

fn section_depth_and_hierarchy(sections: &[Section], index: usize) -> (usize, Vec<String>) {
    let mut titles = Vec::new();
    let mut depth = 0;
    let mut current = sections[index].parent_index;
    while let Some(parent) = current {
        titles.push(sections[parent].metadata.get("title").and_then(Value::as_str).unwrap_or("Untitled").to_string());
        depth += 1;
        current = sections[parent].parent_index;
    }
    titles.reverse();
    (depth, titles)
}

/// Build an immutable snapshot from a finished `Site`. Pages must already
/// be promoted (loaded) by the caller for any page whose body/html this
/// build needs to render; a still-`Lazy` handle snapshots with empty
/// rendered content, which is correct only for pages the planner decided
/// not to rebuild.
pub fn build(site: &Site, template_engine: &dyn TemplateEngine, version_id: &str) -> SiteSnapshot {
    let mut pages = Vec::with_capacity(site.pages.len());
    for handle in &site.pages {
        pages.push(page_snapshot(site, handle));
    }

    let mut sections = Vec::with_capacity(site.sections.len());
    for (i, section) in site.sections.iter().enumerate() {
        let (depth, hierarchy) = section_depth_and_hierarchy(&site.sections, i);
        sections.push(SectionSnapshot {
            path: section.path.clone(),
            metadata: Arc::new(section.metadata.clone()),
            page_indices: section.sorted_page_indices(&site.pages),
            subsection_indices: section.sorted_subsection_indices(&site.sections),
            parent_index: section.parent_index,
            index_page: section.index_page_index,
            depth,
            hierarchy,
            template_name: section_template_for(section),
        });
    }

    link_adjacent_pages(&mut pages, &sections);

    let attention_order = {
        let mut order: Vec<usize> = (0..pages.len()).collect();
        order.sort_by(|&a, &b| {
            pages[b]
                .attention_score
                .cmp(&pages[a].attention_score)
                .then_with(|| pages[a].source_path.as_str().cmp(pages[b].source_path.as_str()))
        });
        order
    };

    let mut template_groups: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for &i in &attention_order {
        template_groups.entry(pages[i].template.clone()).or_default().push(i);
    }

    let scout_hints = template_groups
        .iter()
        .map(|(template, indices)| ScoutHint {
            template_path: template.clone(),
            partial_paths: transitive_dependencies(template_engine, template),
            pages_using: indices.len(),
            priority: indices.len() as i64,
        })
        .collect();

    let waves = if pages.is_empty() { Vec::new() } else { vec![(0..pages.len()).collect()] };

    let tag_to_pages = site
        .taxonomies
        .get("tags")
        .map(|terms| terms.iter().map(|(slug, term)| (slug.clone(), term.page_indices.clone())).collect())
        .unwrap_or_default();

    let mut nav_trees = FxHashMap::default();
    nav_trees.insert(version_id.to_string(), site.menu.clone());

    SiteSnapshot {
        version_id: version_id.to_string(),
        pages,
        sections,
        top_level_page_indices: site.top_level_page_indices.clone(),
        top_level_section_indices: site
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.parent_index.is_none() && s.path.is_some())
            .map(|(i, _)| i)
            .collect(),
        waves,
        template_groups,
        attention_order,
        scout_hints,
        tag_to_pages,
        nav_trees,
    }
}

fn page_snapshot(site: &Site, handle: &PageHandle) -> PageSnapshot {
    let core = handle.core().clone();
    let metadata = handle.metadata().clone();
    let section_index = core.section.as_ref().and_then(|p| site.section_by_path.get(p).copied());
    let depth = section_index.map(|i| section_depth_and_hierarchy(&site.sections, i).0 + 1).unwrap_or(0);
    let template = template_for(&core, &metadata);
    let score = attention_score(&core, &metadata, depth);

    match handle.as_loaded() {
        Some(page) => {
            let words = word_count(&page.raw_content);
            let content_hash = core.file_hash.clone().unwrap_or_else(|| hash::hash_bytes(page.rendered_html.as_bytes()));
            PageSnapshot {
                source_path: core.source_path.clone(),
                title: core.title,
                date: core.date,
                tags: core.tags,
                aliases: core.aliases,
                slug: core.slug,
                weight: core.weight,
                lang: core.lang,
                page_type: core.page_type,
                section_index,
                output_path: page.output_path.clone(),
                rendered_html: Arc::new(page.rendered_html.clone()),
                toc: Arc::new(page.toc.clone()),
                metadata: Arc::new(metadata),
                related_posts: Arc::new(page.related_posts.clone()),
                template,
                word_count: words,
                reading_time_minutes: reading_time(words),
                content_hash,
                attention_score: score,
                next_page: None,
                prev_page: None,
            }
        }
        None => PageSnapshot {
            source_path: core.source_path.clone(),
            title: core.title,
            date: core.date,
            tags: core.tags,
            aliases: core.aliases,
            slug: core.slug,
            weight: core.weight,
            lang: core.lang,
            page_type: core.page_type,
            section_index,
            output_path: None,
            rendered_html: Arc::new(String::new()),
            toc: Arc::new(String::new()),
            metadata: Arc::new(metadata),
            related_posts: Arc::new(Vec::new()),
            template,
            word_count: 0,
            reading_time_minutes: 0,
            content_hash: core.file_hash.unwrap_or_else(ContentHash::empty),
            attention_score: score,
            next_page: None,
            prev_page: None,
        },
    }
}

/// Within each section's own sorted page order, wire `next_page`/`prev_page`
/// to adjacent snapshot indices. Top-level pages (no owning section) get
/// neither — there is no site-wide order to place them in.
fn link_adjacent_pages(pages: &mut [PageSnapshot], sections: &[SectionSnapshot]) {
    for section in sections {
        let ordered = &section.page_indices;
        for (pos, &index) in ordered.iter().enumerate() {
            pages[index].prev_page = pos.checked_sub(1).map(|p| ordered[p]);
            pages[index].next_page = ordered.get(pos + 1).copied();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::template::ReferenceTemplateEngine;
    use crate::config::SiteConfig;
    use crate::content::page::{FileSystemLoader, Page, PageHandle};
    use crate::content::page_core::PageCore;
    use std::path::PathBuf;

    fn loaded_page(path: &str, title: &str, template: Option<&str>) -> PageHandle {
        let mut fm = Map::new();
        fm.insert("title".into(), Value::String(title.to_string()));
        let core = PageCore::from_frontmatter(SourcePath::new(path), &Value::Object(fm), None);
        let mut page = Page::new(core, "some body text here".to_string());
        page.rendered_html = format!("<p>{title}</p>");
        if let Some(t) = template {
            page.metadata.insert("template".into(), Value::String(t.to_string()));
        }
        PageHandle::Loaded(page)
    }

    fn site_with(pages: Vec<PageHandle>) -> Site {
        let mut site = Site::new(PathBuf::from("/site"), PathBuf::from("/site/public"), SiteConfig::default());
        site.top_level_page_indices = (0..pages.len()).collect();
        site.pages = pages;
        site
    }

    fn engine() -> ReferenceTemplateEngine {
        ReferenceTemplateEngine::new(std::env::temp_dir())
    }

    #[test]
    fn snapshot_preserves_arena_order_and_resolves_template() {
        let site = site_with(vec![loaded_page("a.md", "A", Some("post.html")), loaded_page("b.md", "B", None)]);
        let snap = build(&site, &engine(), "default");
        assert_eq!(snap.pages.len(), 2);
        assert_eq!(snap.pages[0].template, "post.html");
        assert_eq!(snap.pages[1].template, "page.html");
    }

    #[test]
    fn partition_invariant_holds_for_top_level_only_site() {
        let site = site_with(vec![loaded_page("a.md", "A", None), loaded_page("b.md", "B", None)]);
        let snap = build(&site, &engine(), "default");
        assert!(snap.satisfies_partition_invariant());
    }

    #[test]
    fn template_groups_bucket_by_resolved_template() {
        let site = site_with(vec![
            loaded_page("a.md", "A", Some("post.html")),
            loaded_page("b.md", "B", Some("post.html")),
            loaded_page("c.md", "C", Some("page.html")),
        ]);
        let snap = build(&site, &engine(), "default");
        assert_eq!(snap.template_groups.get("post.html").map(Vec::len), Some(2));
        assert_eq!(snap.template_groups.get("page.html").map(Vec::len), Some(1));
    }

    #[test]
    fn attention_order_is_a_permutation_of_all_pages() {
        let site = site_with(vec![loaded_page("a.md", "A", None), loaded_page("b.md", "B", None)]);
        let snap = build(&site, &engine(), "default");
        let mut sorted = snap.attention_order.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1]);
    }

    #[test]
    fn lazy_handle_snapshots_with_empty_rendered_content() {
        let core = PageCore::from_frontmatter(SourcePath::new("a.md"), &serde_json::json!({"title": "A"}), None);
        let handle = PageHandle::lazy(core, Arc::new(FileSystemLoader { site_root: "/site".into() }));
        let site = site_with(vec![handle]);
        let snap = build(&site, &engine(), "default");
        assert_eq!(snap.pages[0].rendered_html.as_str(), "");
        assert_eq!(snap.pages[0].word_count, 0);
    }

    #[test]
    fn reading_time_rounds_up_and_floors_at_one_for_nonempty() {
        assert_eq!(reading_time(0), 0);
        assert_eq!(reading_time(1), 1);
        assert_eq!(reading_time(200), 1);
        assert_eq!(reading_time(201), 2);
    }
}
