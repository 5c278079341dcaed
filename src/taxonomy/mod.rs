//! Taxonomy derivation (§4.6): builds `tags[slug] -> {name, slug, pages}`
//! from page metadata, tracks which generated listing/index pages actually
//! need regenerating via [`crate::cache::generated_members`], and persists
//! the authoritative slug index via [`crate::cache::taxonomy_index`].

pub mod menu;
pub mod query;
pub mod related;

use crate::cache::generated_members::{GeneratedMembersCache, GeneratedPageKey, PageType};
use crate::cache::taxonomy_index::TaxonomyIndex;
use crate::content::page::PageHandle;
use crate::primitives::{ContentHash, SourcePath};
use crate::site::TaxonomyTerm;
use rustc_hash::{FxHashMap, FxHashSet};

pub const DEFAULT_TAXONOMY: &str = "tags";

/// Transliterate and lowercase a tag name into a URL-safe slug, collapsing
/// runs of non-alphanumerics to a single `-` with no leading/trailing dash.
pub fn slugify(name: &str) -> String {
    let ascii = deunicode::deunicode(name).to_lowercase();
    let mut slug = String::with_capacity(ascii.len());
    let mut last_was_dash = true;
    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Full rebuild of the `tags` taxonomy over `indices` (regular pages only —
/// callers exclude generated pages, which carry no tags of their own).
pub fn collect(pages: &[PageHandle], indices: impl Iterator<Item = usize>) -> FxHashMap<String, TaxonomyTerm> {
    let mut terms: FxHashMap<String, TaxonomyTerm> = FxHashMap::default();
    for idx in indices {
        let core = pages[idx].core();
        for tag in &core.tags {
            let slug = slugify(tag);
            let term = terms.entry(slug.clone()).or_insert_with(|| TaxonomyTerm {
                name: tag.clone(),
                slug: slug.clone(),
                page_indices: Vec::new(),
            });
            term.page_indices.push(idx);
        }
    }
    terms
}

/// Tag slugs touched by reprocessing exactly `changed_indices`: every tag
/// in the page's current tag set, plus every tag it carried before (so a
/// removed tag's listing page is still marked for an update).
pub fn affected_tags(previous_tags: &FxHashMap<SourcePath, Vec<String>>, pages: &[PageHandle], changed_indices: &[usize]) -> FxHashSet<String> {
    let mut affected = FxHashSet::default();
    for &idx in changed_indices {
        let core = pages[idx].core();
        for tag in &core.tags {
            affected.insert(slugify(tag));
        }
        if let Some(old_tags) = previous_tags.get(&core.source_path) {
            for tag in old_tags {
                affected.insert(slugify(tag));
            }
        }
    }
    affected
}

pub fn tag_listing_key(slug: &str) -> GeneratedPageKey {
    GeneratedPageKey {
        page_type: PageType::TagListing,
        page_id: slug.to_string(),
    }
}

pub fn tag_index_key() -> GeneratedPageKey {
    GeneratedPageKey {
        page_type: PageType::TagIndex,
        page_id: DEFAULT_TAXONOMY.to_string(),
    }
}

pub fn section_index_key(section_path: &SourcePath) -> GeneratedPageKey {
    GeneratedPageKey {
        page_type: PageType::SectionIndex,
        page_id: section_path.as_str().to_string(),
    }
}

/// `source_path -> metadata_hash` for a set of member pages — the input
/// [`GeneratedMembersCache::should_regenerate`] compares against. Keyed off
/// the frontmatter hash rather than the whole-file hash, so a body-only
/// edit to a member page never marks its tag listings stale.
pub fn member_hashes(pages: &[PageHandle], indices: &[usize]) -> FxHashMap<SourcePath, ContentHash> {
    indices
        .iter()
        .map(|&idx| {
            let core = pages[idx].core();
            (core.source_path.clone(), core.metadata_hash.clone().unwrap_or_else(ContentHash::empty))
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct TaxonomyPlan {
    pub terms: FxHashMap<String, TaxonomyTerm>,
    /// Tag-listing slugs whose member set or hashes changed since last
    /// build — these, and only these, need regenerating.
    pub stale_tag_listings: Vec<String>,
    pub tag_index_stale: bool,
}

/// Decide which generated taxonomy pages are actually stale, given the
/// freshly recomputed `terms` and the cache's last-seen member hashes.
pub fn plan(cache: &GeneratedMembersCache, terms: FxHashMap<String, TaxonomyTerm>, pages: &[PageHandle]) -> TaxonomyPlan {
    let mut stale_tag_listings = Vec::new();
    for (slug, term) in &terms {
        let current = member_hashes(pages, &term.page_indices);
        if cache.should_regenerate(&tag_listing_key(slug), &current) {
            stale_tag_listings.push(slug.clone());
        }
    }

    let mut all_tagged: Vec<usize> = terms.values().flat_map(|t| t.page_indices.iter().copied()).collect();
    all_tagged.sort_unstable();
    all_tagged.dedup();
    let tag_index_stale = cache.should_regenerate(&tag_index_key(), &member_hashes(pages, &all_tagged));

    TaxonomyPlan {
        terms,
        stale_tag_listings,
        tag_index_stale,
    }
}

/// Persist the taxonomy index and generated-members tables for the next
/// build — called unconditionally after generation, whether or not this
/// build's plan found every listing already fresh.
pub fn persist(cache: &mut GeneratedMembersCache, taxonomy_index: &mut TaxonomyIndex, terms: &FxHashMap<String, TaxonomyTerm>, pages: &[PageHandle]) {
    taxonomy_index.clear();
    let mut all_tagged: Vec<usize> = Vec::new();
    for (slug, term) in terms {
        let page_paths = term.page_indices.iter().map(|&i| pages[i].source_path().clone()).collect();
        taxonomy_index.set(slug.clone(), term.name.clone(), page_paths);
        cache.store(tag_listing_key(slug), member_hashes(pages, &term.page_indices));
        all_tagged.extend(term.page_indices.iter().copied());
    }
    all_tagged.sort_unstable();
    all_tagged.dedup();
    cache.store(tag_index_key(), member_hashes(pages, &all_tagged));
}
