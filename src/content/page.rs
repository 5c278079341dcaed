//! `Page`: the mutable, build-time companion to [`PageCore`](super::page_core::PageCore).
//!
//! `PageHandle` is the tagged-variant strategy the design notes call for in
//! a language without duck-typing: a page is either fully `Loaded` or a
//! `Lazy` proxy carrying only its cacheable core. Any component that needs
//! body access calls [`PageHandle::promote`], which forces a load through
//! the injected [`PageLoader`] and is a no-op on an already-loaded page.
//! Equality and hashing of the lazy form are by `source_path` alone, so two
//! handles for the same page compare equal regardless of load state.

use crate::cache::parsed_content::TocItem;
use crate::content::page_core::PageCore;
use crate::primitives::SourcePath;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// The key cascades track: keys introduced into `metadata` by cascading,
/// so a later rebuild can clear exactly those before reapplying.
pub const CASCADE_KEYS_FIELD: &str = "_cascade_keys";

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub core: PageCore,
    pub raw_content: String,
    pub rendered_html: String,
    pub toc: String,
    pub toc_items: Vec<TocItem>,
    pub links: Vec<String>,
    pub output_path: Option<PathBuf>,
    pub parsed_ast: Option<String>,
    /// Merged frontmatter + cascade view. `_cascade_keys` here enumerates
    /// which keys were introduced by cascading (see [`CASCADE_KEYS_FIELD`]).
    pub metadata: Map<String, Value>,
    /// Related posts are resolved as source paths rather than owned
    /// `Page`s: the snapshot (§3.7) is where cross-page references become
    /// cheap shared lookups, and keeping them as paths here avoids an
    /// ownership cycle during the mutable build phase.
    pub related_posts: Vec<SourcePath>,
}

impl Page {
    pub fn new(core: PageCore, raw_content: String) -> Self {
        Self {
            core,
            raw_content,
            rendered_html: String::new(),
            toc: String::new(),
            toc_items: Vec::new(),
            links: Vec::new(),
            output_path: None,
            parsed_ast: None,
            metadata: Map::new(),
            related_posts: Vec::new(),
        }
    }

    pub fn source_path(&self) -> &SourcePath {
        &self.core.source_path
    }

    pub fn cascade_keys(&self) -> Vec<String> {
        match self.metadata.get(CASCADE_KEYS_FIELD) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    pub fn set_cascade_keys(&mut self, keys: Vec<String>) {
        if keys.is_empty() {
            self.metadata.remove(CASCADE_KEYS_FIELD);
        } else {
            self.metadata.insert(CASCADE_KEYS_FIELD.to_string(), Value::Array(keys.into_iter().map(Value::String).collect()));
        }
    }
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.source_path() == other.source_path()
    }
}

/// Loads the full `Page` body for a source path known only by its core.
/// Injected by the orchestrator; discovery and cold builds never need it,
/// incremental builds use it to promote a proxy on demand.
pub trait PageLoader: Send + Sync {
    fn load(&self, core: &PageCore) -> anyhow::Result<Page>;
}

/// A `PageLoader` backed by a plain filesystem read plus frontmatter
/// re-split — the common case where "loading" just means re-reading the
/// source file discovery already knows the path of.
pub struct FileSystemLoader {
    pub site_root: PathBuf,
}

impl PageLoader for FileSystemLoader {
    fn load(&self, core: &PageCore) -> anyhow::Result<Page> {
        let fs_path = self.site_root.join(core.source_path.as_str());
        let raw = std::fs::read_to_string(&fs_path).map_err(|e| {
            anyhow::anyhow!(crate::error::BuildError::Discovery {
                path: core.source_path.clone(),
                message: e.to_string(),
            })
        })?;
        let (_frontmatter, body) = crate::content::frontmatter::split(&raw);
        Ok(Page::new(core.clone(), body.to_string()))
    }
}

/// Either a fully loaded page or a lazy proxy over its cacheable core.
/// During incremental builds, unchanged pages stay `Lazy` through
/// discovery, cascading, sectioning, and navigation — paying no parse or
/// disk cost unless something forces a promotion.
pub enum PageHandle {
    Loaded(Page),
    Lazy {
        core: PageCore,
        metadata: Map<String, Value>,
        loader: Arc<dyn PageLoader>,
    },
}

impl std::fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageHandle::Loaded(p) => f.debug_tuple("Loaded").field(&p.source_path()).finish(),
            PageHandle::Lazy { core, .. } => f.debug_tuple("Lazy").field(&core.source_path).finish(),
        }
    }
}

impl PageHandle {
    pub fn lazy(core: PageCore, loader: Arc<dyn PageLoader>) -> Self {
        PageHandle::Lazy {
            core,
            metadata: Map::new(),
            loader,
        }
    }

    pub fn core(&self) -> &PageCore {
        match self {
            PageHandle::Loaded(p) => &p.core,
            PageHandle::Lazy { core, .. } => core,
        }
    }

    pub fn source_path(&self) -> &SourcePath {
        &self.core().source_path
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, PageHandle::Loaded(_))
    }

    /// Read-only access to metadata without forcing a promotion — both
    /// variants carry a metadata map so the cascade engine can inspect and
    /// mutate cascade-introduced keys without paying a parse/disk cost.
    pub fn metadata(&self) -> &Map<String, Value> {
        match self {
            PageHandle::Loaded(p) => &p.metadata,
            PageHandle::Lazy { metadata, .. } => metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        match self {
            PageHandle::Loaded(p) => &mut p.metadata,
            PageHandle::Lazy { metadata, .. } => metadata,
        }
    }

    /// Force the full `Page` to load, if not already. Idempotent.
    pub fn promote(&mut self) -> anyhow::Result<&mut Page> {
        if let PageHandle::Lazy { core, metadata, loader } = self {
            let mut page = loader.load(core)?;
            page.metadata = std::mem::take(metadata);
            *self = PageHandle::Loaded(page);
        }
        match self {
            PageHandle::Loaded(p) => Ok(p),
            PageHandle::Lazy { .. } => unreachable!("just promoted"),
        }
    }

    pub fn as_loaded(&self) -> Option<&Page> {
        match self {
            PageHandle::Loaded(p) => Some(p),
            PageHandle::Lazy { .. } => None,
        }
    }
}

impl PartialEq for PageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.source_path() == other.source_path()
    }
}

impl Eq for PageHandle {}

impl std::hash::Hash for PageHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.source_path().hash(state);
    }
}
