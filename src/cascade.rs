//! Cascade engine (§4.5): propagates section `cascade` frontmatter down
//! into descendant pages, lowest precedence — page-level frontmatter always
//! wins, and a nearer ancestor's cascade wins over a farther one's on the
//! same key.
//!
//! Runs in five steps every build, incremental or not: clear every page's
//! previously-introduced cascade keys, collect the cascade of top-level
//! (sectionless) pages, recurse from each entry-point section accumulating
//! cascade state downward, then apply the leftover root cascade to
//! top-level pages that don't define their own.

use crate::content::page::{CASCADE_KEYS_FIELD, PageHandle};
use crate::content::section::Section;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

#[derive(Debug, Default, Clone)]
pub struct CascadeStats {
    pub pages_processed: usize,
    pub pages_updated: usize,
    /// How many pages received each cascaded key, across the whole run.
    pub per_key_counts: FxHashMap<String, usize>,
}

/// Run the cascade engine over `pages`/`sections`. `top_level_page_indices`
/// are pages belonging to no section at all.
pub fn apply(sections: &[Section], pages: &mut [PageHandle], top_level_page_indices: &[usize]) -> CascadeStats {
    let mut stats = CascadeStats::default();

    for page in pages.iter_mut() {
        clear_previous_cascade(page);
    }
    stats.pages_processed = pages.len();

    let root_cascade = collect_root_cascade(pages, top_level_page_indices);

    let empty = Map::new();
    for (idx, section) in sections.iter().enumerate() {
        if section.parent_index.is_none() {
            apply_section(sections, pages, idx, &empty, &mut stats);
        }
    }

    for &idx in top_level_page_indices {
        if !page_has_own_cascade(&pages[idx]) {
            apply_cascade_to_page(&mut pages[idx], &root_cascade, &mut stats);
        }
    }

    stats
}

fn clear_previous_cascade(page: &mut PageHandle) {
    let keys: Vec<String> = match page.metadata().get(CASCADE_KEYS_FIELD) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        _ => Vec::new(),
    };
    if keys.is_empty() {
        return;
    }
    let metadata = page.metadata_mut();
    for key in &keys {
        metadata.remove(key);
    }
    metadata.remove(CASCADE_KEYS_FIELD);
}

fn page_has_own_cascade(page: &PageHandle) -> bool {
    page.metadata().get("cascade").is_some()
}

fn collect_root_cascade(pages: &[PageHandle], top_level_page_indices: &[usize]) -> Map<String, Value> {
    let mut merged = Map::new();
    for &idx in top_level_page_indices {
        if let Some(Value::Object(cascade)) = pages[idx].metadata().get("cascade") {
            for (k, v) in cascade {
                merged.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
    }
    merged
}

fn apply_section(sections: &[Section], pages: &mut [PageHandle], idx: usize, parent_cascade: &Map<String, Value>, stats: &mut CascadeStats) {
    let mut accumulated = parent_cascade.clone();
    if let Some(cascade) = sections[idx].cascade() {
        for (k, v) in cascade {
            accumulated.insert(k.clone(), v.clone());
        }
    }

    for &page_idx in &sections[idx].page_indices {
        apply_cascade_to_page(&mut pages[page_idx], &accumulated, stats);
    }
    for &sub_idx in &sections[idx].subsection_indices {
        apply_section(sections, pages, sub_idx, &accumulated, stats);
    }
}

fn apply_cascade_to_page(page: &mut PageHandle, cascade: &Map<String, Value>, stats: &mut CascadeStats) {
    if cascade.is_empty() {
        return;
    }
    let mut introduced = Vec::new();
    let metadata = page.metadata_mut();
    for (key, value) in cascade {
        if !metadata.contains_key(key) {
            metadata.insert(key.clone(), value.clone());
            introduced.push(key.clone());
        }
    }
    if introduced.is_empty() {
        return;
    }
    metadata.insert(CASCADE_KEYS_FIELD.to_string(), Value::Array(introduced.iter().cloned().map(Value::String).collect()));
    stats.pages_updated += 1;
    for key in introduced {
        *stats.per_key_counts.entry(key).or_insert(0) += 1;
    }
}
