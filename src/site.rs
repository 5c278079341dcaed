//! `Site`: the mutable, build-time aggregate root (§3.6).
//!
//! Owns the page and section arenas by index (the "arena + index" strategy
//! the design notes call for — see [`crate::content::section`]), the merged
//! asset list, the taxonomy index, and the navigation menu. Replaced by a
//! [`crate::snapshot::SiteSnapshot`] before parallel rendering ever begins.

use crate::config::SiteConfig;
use crate::content::asset::Asset;
use crate::content::page::PageHandle;
use crate::content::section::Section;
use crate::primitives::SourcePath;
use rustc_hash::FxHashMap;
use std::path::PathBuf;

/// One term within a taxonomy kind (e.g. the `"rust"` term of the `tags`
/// taxonomy): its display name, its slug, and the pages carrying it.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyTerm {
    pub name: String,
    pub slug: String,
    pub page_indices: Vec<usize>,
}

/// A resolved navigation entry. `page_index` is `Some` when the entry
/// points at a discovered page rather than an arbitrary external URL.
#[derive(Debug, Clone)]
pub struct MenuItem {
    pub name: String,
    pub url: String,
    pub weight: i64,
    pub page_index: Option<usize>,
    pub children: Vec<MenuItem>,
}

#[derive(Default)]
pub struct Site {
    pub root_path: PathBuf,
    pub output_dir: PathBuf,
    pub config: SiteConfig,

    pub pages: Vec<PageHandle>,
    pub sections: Vec<Section>,
    pub section_by_path: FxHashMap<SourcePath, usize>,
    pub top_level_page_indices: Vec<usize>,

    pub assets: Vec<Asset>,

    /// `taxonomy_name -> term_slug -> term`.
    pub taxonomies: FxHashMap<String, FxHashMap<String, TaxonomyTerm>>,
    pub menu: Vec<MenuItem>,

    /// Set once the asset manifest has been (re)written this build; the
    /// planner and rendered-output cache both consult this to decide
    /// whether every rendered page must be invalidated (§4.8 D2).
    pub asset_manifest_rewritten: bool,
}

impl Site {
    pub fn new(root_path: PathBuf, output_dir: PathBuf, config: SiteConfig) -> Self {
        Self {
            root_path,
            output_dir,
            config,
            ..Default::default()
        }
    }

    pub fn page_index_of(&self, path: &SourcePath) -> Option<usize> {
        self.pages.iter().position(|p| p.source_path() == path)
    }

    pub fn section_of(&self, page_index: usize) -> Option<&Section> {
        let section_path = self.pages[page_index].core().section.as_ref()?;
        self.section_by_path.get(section_path).map(|&i| &self.sections[i])
    }

    /// All page indices: top-level pages plus every page owned by a
    /// section, in arena order. Used by the partition invariant (§4.7).
    pub fn all_page_indices(&self) -> Vec<usize> {
        (0..self.pages.len()).collect()
    }
}
