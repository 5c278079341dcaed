//! `Section`: a directory-based content grouping identified by `_index.md`.
//!
//! Forward references only — a section stores the *indices* of its pages
//! and subsections into [`crate::site::Site`]'s arenas, never owned
//! `Page`/`Section` values, so back-references (`page.section`) can be
//! derived without introducing a cycle. This is the "arena + index"
//! strategy the design notes recommend for an ownership-discipline
//! language standing in for the legacy repo's free-form object graph.

use crate::content::page::PageHandle;
use crate::primitives::SourcePath;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct Section {
    /// `None` only for the synthetic root section.
    pub path: Option<SourcePath>,
    pub metadata: Map<String, Value>,
    pub page_indices: Vec<usize>,
    pub subsection_indices: Vec<usize>,
    pub parent_index: Option<usize>,
    /// `true` if this section's `_index.md` is a generated stand-in
    /// (§4.10 "Finalize sections") rather than a page discovery found.
    pub generated_index: bool,
    /// Page-arena index of this section's index page, once "Finalize
    /// sections" (§4.10 phase 4) has run. `None` before that phase, or for
    /// the root section, which has no index page of its own.
    pub index_page_index: Option<usize>,
}

impl Section {
    pub fn cascade(&self) -> Option<&Map<String, Value>> {
        self.metadata.get("cascade").and_then(Value::as_object)
    }

    /// `(weight asc, date desc, title asc)` ordering over this section's
    /// direct pages, resolved against the page arena.
    pub fn sorted_page_indices(&self, pages: &[PageHandle]) -> Vec<usize> {
        let mut indices = self.page_indices.clone();
        indices.sort_by(|&a, &b| sort_key(&pages[a]).cmp(&sort_key(&pages[b])));
        indices
    }

    pub fn sorted_subsection_indices(&self, sections: &[Section]) -> Vec<usize> {
        let mut indices = self.subsection_indices.clone();
        indices.sort_by(|&a, &b| {
            let sa = &sections[a];
            let sb = &sections[b];
            let wa = sa.metadata.get("weight").and_then(Value::as_i64).unwrap_or(0);
            let wb = sb.metadata.get("weight").and_then(Value::as_i64).unwrap_or(0);
            wa.cmp(&wb).then_with(|| section_title(sa).cmp(section_title(sb)))
        });
        indices
    }
}

fn section_title(s: &Section) -> &str {
    s.metadata.get("title").and_then(Value::as_str).unwrap_or("Untitled")
}

/// `(weight asc, -date, title asc)` as a tuple key; `date` is negated by
/// flipping the comparison rather than the value, since `f64` isn't `Ord`.
fn sort_key(page: &PageHandle) -> (i64, std::cmp::Reverse<DateKey>, String) {
    let core = page.core();
    (core.weight.unwrap_or(0), std::cmp::Reverse(DateKey(core.date)), core.title.clone())
}

/// Wraps `Option<f64>` with a total order (`NaN`/`None` sort last) so it
/// can serve as a sort key without `f64: Ord`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DateKey(Option<f64>);

impl Eq for DateKey {}

impl PartialOrd for DateKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DateKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => std::cmp::Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::page::FileSystemLoader;
    use crate::content::page_core::PageCore;
    use std::sync::Arc;

    fn page(path: &str, weight: Option<i64>, date: Option<f64>, title: &str) -> PageHandle {
        let mut fm = serde_json::Map::new();
        fm.insert("title".into(), Value::String(title.to_string()));
        if let Some(w) = weight {
            fm.insert("weight".into(), Value::from(w));
        }
        if let Some(d) = date {
            fm.insert("date".into(), Value::from(d));
        }
        let core = PageCore::from_frontmatter(SourcePath::new(path), &Value::Object(fm), None);
        PageHandle::lazy(core, Arc::new(FileSystemLoader { site_root: "/tmp".into() }))
    }

    #[test]
    fn sorted_pages_respects_weight_then_date_then_title() {
        let pages = vec![
            page("b.md", Some(2), Some(100.0), "B"),
            page("a.md", Some(1), Some(50.0), "A"),
            page("c.md", Some(1), Some(200.0), "C"),
        ];
        let section = Section {
            page_indices: vec![0, 1, 2],
            ..Default::default()
        };
        let order = section.sorted_page_indices(&pages);
        // weight 1 pages (c, a) sort before weight 2 (b); within weight 1,
        // newer date (c: 200) sorts before older (a: 50).
        assert_eq!(order, vec![2, 1, 0]);
    }
}
