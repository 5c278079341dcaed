//! Query indexes (§4.6 "Query indexes"; detail per SPEC_FULL's "Query
//! indexes detail"): `by_date`, `by_section`, `by_tag`, pre-built once per
//! build so templates get `O(1)` lookups instead of scanning the page list.

use crate::content::page::PageHandle;
use crate::primitives::SourcePath;
use rustc_hash::FxHashMap;

#[derive(Default)]
pub struct QueryIndexes {
    /// Page indices, newest first.
    pub by_date: Vec<usize>,
    pub by_section: FxHashMap<SourcePath, Vec<usize>>,
    pub by_tag: FxHashMap<String, Vec<usize>>,
}

/// The keys a caller (e.g. a dev-server cache invalidator) needs to
/// recompute after an incremental update — made explicit because the
/// update itself only touches the pages that actually changed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryIndexDelta {
    pub dates_changed: bool,
    pub sections: Vec<SourcePath>,
    pub tags: Vec<String>,
}

pub fn build(pages: &[PageHandle]) -> QueryIndexes {
    let mut by_date: Vec<usize> = (0..pages.len()).collect();
    by_date.sort_by(|&a, &b| {
        let da = pages[a].core().date.unwrap_or(f64::MIN);
        let db = pages[b].core().date.unwrap_or(f64::MIN);
        db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut by_section: FxHashMap<SourcePath, Vec<usize>> = FxHashMap::default();
    let mut by_tag: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for (idx, page) in pages.iter().enumerate() {
        let core = page.core();
        if let Some(section) = &core.section {
            by_section.entry(section.clone()).or_default().push(idx);
        }
        for tag in &core.tags {
            by_tag.entry(crate::taxonomy::slugify(tag)).or_default().push(idx);
        }
    }

    QueryIndexes { by_date, by_section, by_tag }
}

/// Recompute every index (cheap relative to a build's other phases) but
/// report only the keys `changed_indices` actually touched, so a caller
/// can selectively invalidate downstream views.
pub fn update(indexes: &mut QueryIndexes, pages: &[PageHandle], changed_indices: &[usize]) -> QueryIndexDelta {
    if changed_indices.is_empty() {
        return QueryIndexDelta::default();
    }
    *indexes = build(pages);

    let mut sections = Vec::new();
    let mut tags = Vec::new();
    for &idx in changed_indices {
        let core = pages[idx].core();
        if let Some(section) = &core.section {
            if !sections.contains(section) {
                sections.push(section.clone());
            }
        }
        for tag in &core.tags {
            let slug = crate::taxonomy::slugify(tag);
            if !tags.contains(&slug) {
                tags.push(slug);
            }
        }
    }
    QueryIndexDelta {
        dates_changed: true,
        sections,
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::page::FileSystemLoader;
    use crate::content::page_core::PageCore;
    use crate::primitives::SourcePath;
    use std::sync::Arc;

    fn page(path: &str, date: Option<f64>) -> PageHandle {
        let mut fm = serde_json::json!({"title": path});
        if let Some(d) = date {
            fm["date"] = serde_json::json!(d);
        }
        let core = PageCore::from_frontmatter(SourcePath::new(path), &fm, None);
        PageHandle::lazy(core, Arc::new(FileSystemLoader { site_root: "/tmp".into() }))
    }

    #[test]
    fn by_date_is_newest_first() {
        let pages = vec![page("a.md", Some(1.0)), page("b.md", Some(2.0))];
        let idx = build(&pages);
        assert_eq!(idx.by_date, vec![1, 0]);
    }

    #[test]
    fn empty_change_set_yields_empty_delta() {
        let pages = vec![page("a.md", None)];
        let mut idx = build(&pages);
        let delta = update(&mut idx, &pages, &[]);
        assert_eq!(delta, QueryIndexDelta::default());
    }
}
