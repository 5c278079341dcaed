//! Related-posts scoring (§4.6 "Related posts"; scoring rule per
//! SPEC_FULL's "Related posts scoring detail"): tag-overlap count, ties
//! broken by recency (newer wins), then by source path for determinism.
//! Skipped entirely above a site-size ceiling or when the site has no tags
//! at all — see [`should_compute`].

use crate::content::page::PageHandle;
use crate::primitives::SourcePath;
use rustc_hash::FxHashSet;

/// Up to `k` pages from `candidate_indices` most related to `page_index` by
/// tag overlap.
pub fn compute_related(page_index: usize, pages: &[PageHandle], candidate_indices: &[usize], k: usize) -> Vec<SourcePath> {
    let core = pages[page_index].core();
    let own_tags: FxHashSet<&str> = core.tags.iter().map(String::as_str).collect();
    if own_tags.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, Option<f64>, &SourcePath)> = candidate_indices
        .iter()
        .filter(|&&idx| idx != page_index)
        .filter_map(|&idx| {
            let candidate = pages[idx].core();
            let overlap = candidate.tags.iter().filter(|t| own_tags.contains(t.as_str())).count();
            (overlap > 0).then(|| (overlap, candidate.date, &candidate.source_path))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.2.cmp(b.2))
    });
    scored.into_iter().take(k).map(|(_, _, path)| path.clone()).collect()
}

/// `true` iff related-posts computation should run at all this build: the
/// site must carry at least one tag and be at or under the size ceiling
/// (cost/benefit — §4.6).
pub fn should_compute(total_pages: usize, max_site_size: usize, any_tags: bool) -> bool {
    any_tags && total_pages <= max_site_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::page::FileSystemLoader;
    use crate::content::page_core::PageCore;
    use crate::primitives::SourcePath;
    use std::sync::Arc;

    fn page(path: &str, tags: &[&str], date: Option<f64>) -> PageHandle {
        let mut fm = serde_json::json!({"title": path, "tags": tags});
        if let Some(d) = date {
            fm["date"] = serde_json::json!(d);
        }
        let core = PageCore::from_frontmatter(SourcePath::new(path), &fm, None);
        PageHandle::lazy(core, Arc::new(FileSystemLoader { site_root: "/tmp".into() }))
    }

    #[test]
    fn no_tags_yields_no_related_posts() {
        let pages = vec![page("a.md", &[], None), page("b.md", &["rust"], None)];
        assert!(compute_related(0, &pages, &[1], 5).is_empty());
    }

    #[test]
    fn overlap_count_breaks_ties_by_recency() {
        let pages = vec![
            page("a.md", &["rust", "wasm"], None),
            page("b.md", &["rust"], Some(100.0)),
            page("c.md", &["rust"], Some(200.0)),
        ];
        let related = compute_related(0, &pages, &[1, 2], 5);
        assert_eq!(related, vec![SourcePath::new("c.md"), SourcePath::new("b.md")]);
    }

    #[test]
    fn size_ceiling_disables_computation() {
        assert!(!should_compute(6000, 5000, true));
        assert!(should_compute(100, 5000, true));
        assert!(!should_compute(100, 5000, false));
    }
}
