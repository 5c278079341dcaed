//! Persisted build cache: composes the fingerprint, parsed-content,
//! rendered-output, dependency, autodoc, generated-members, and
//! taxonomy-index sub-tables behind one coherent API, plus two top-level
//! scalars (`config_hash`, `asset_manifest_mtime`) that invalidate broad
//! swaths of the others when they change.
//!
//! Owned exclusively by the orchestrator thread while a build runs; once
//! the site snapshot is frozen the cache is read-only to worker threads,
//! with writes collected and flushed in one pass at save time.

pub mod autodoc;
pub mod dependencies;
pub mod fingerprints;
pub mod generated_members;
pub mod page_cores;
pub mod parsed_content;
pub mod rendered_output;
pub mod store;
pub mod taxonomy_index;

use autodoc::{AutodocDependencyEntry, AutodocSourceMetadata, AutodocTracker};
use dependencies::{DependencyEntry, DependencyGraph};
use fingerprints::{FingerprintEntry, FingerprintTable};
use generated_members::{GeneratedMembersCache, GeneratedMembersEntry};
use page_cores::{PageCoreCache, PageCoreEntry};
use parsed_content::{ParsedContentCache, ParsedContentEntry};
use rendered_output::{RenderedOutputCache, RenderedOutputEntry};
use std::path::{Path, PathBuf};
use store::CacheStore;
use taxonomy_index::{TaxonomyIndex, TaxonomyIndexEntry};

use crate::primitives::ContentHash;

const FINGERPRINTS_VERSION: u32 = 1;
const PARSED_CONTENT_VERSION: u32 = 1;
const RENDERED_OUTPUT_VERSION: u32 = 1;
const DEPENDENCIES_VERSION: u32 = 1;
const AUTODOC_DEPS_VERSION: u32 = 1;
const AUTODOC_METADATA_VERSION: u32 = 1;
const GENERATED_MEMBERS_VERSION: u32 = 1;
const TAXONOMY_INDEX_VERSION: u32 = 1;
const PAGE_CORES_VERSION: u32 = 1;
const SCALARS_VERSION: u32 = 1;

pub struct BuildCache {
    dir: PathBuf,
    pub fingerprints: FingerprintTable,
    pub parsed_content: ParsedContentCache,
    pub rendered_output: RenderedOutputCache,
    pub dependencies: DependencyGraph,
    pub autodoc: AutodocTracker,
    pub generated_members: GeneratedMembersCache,
    pub taxonomy_index: TaxonomyIndex,
    pub page_cores: PageCoreCache,
    pub config_hash: Option<ContentHash>,
    pub asset_manifest_mtime: f64,
}

struct ScalarsEntry {
    config_hash: Option<String>,
    asset_manifest_mtime: f64,
}

impl store::Cacheable for ScalarsEntry {
    fn to_cache_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "config_hash": self.config_hash,
            "asset_manifest_mtime": self.asset_manifest_mtime,
        })
    }

    fn from_cache_dict(value: &serde_json::Value) -> Result<Self, String> {
        Ok(ScalarsEntry {
            config_hash: value.get("config_hash").and_then(serde_json::Value::as_str).map(str::to_string),
            asset_manifest_mtime: value.get("asset_manifest_mtime").and_then(serde_json::Value::as_f64).unwrap_or(0.0),
        })
    }
}

impl BuildCache {
    /// Empty cache, as if loading a cold cache directory.
    pub fn empty(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fingerprints: FingerprintTable::default(),
            parsed_content: ParsedContentCache::default(),
            rendered_output: RenderedOutputCache::default(),
            dependencies: DependencyGraph::default(),
            autodoc: AutodocTracker::default(),
            generated_members: GeneratedMembersCache::default(),
            taxonomy_index: TaxonomyIndex::default(),
            page_cores: PageCoreCache::default(),
            config_hash: None,
            asset_manifest_mtime: 0.0,
        }
    }

    fn store_for(&self, name: &str) -> CacheStore {
        CacheStore::new(self.dir.join(name))
    }

    /// Tolerant load of every sub-table; any individual table anomaly only
    /// empties that table, never the whole cache.
    pub fn load(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let mk = |name: &str| CacheStore::new(dir.join(name));

        let fingerprints = FingerprintTable::from_entries(mk("fingerprints.json").load::<FingerprintEntry>(FINGERPRINTS_VERSION));
        let parsed_entries = mk("parsed_content.json").load::<ParsedContentEntry>(PARSED_CONTENT_VERSION);
        let dependency_entries = mk("dependencies.json").load::<DependencyEntry>(DEPENDENCIES_VERSION);
        let parsed_content = ParsedContentCache::from_entries(parsed_entries);
        let rendered_output = RenderedOutputCache::from_entries(mk("rendered_output.json").load::<RenderedOutputEntry>(RENDERED_OUTPUT_VERSION));
        let dependencies = DependencyGraph::from_entries(dependency_entries);
        let autodoc_deps = mk("autodoc_dependencies.json").load::<AutodocDependencyEntry>(AUTODOC_DEPS_VERSION);
        let autodoc_meta = mk("autodoc_source_metadata.json").load::<AutodocSourceMetadata>(AUTODOC_METADATA_VERSION);
        let autodoc = AutodocTracker::from_parts(autodoc_deps, autodoc_meta);
        let generated_members = GeneratedMembersCache::from_entries(mk("generated_page_members.json").load::<GeneratedMembersEntry>(GENERATED_MEMBERS_VERSION));
        let taxonomy_index = TaxonomyIndex::from_entries(mk("taxonomy_index.json").load::<TaxonomyIndexEntry>(TAXONOMY_INDEX_VERSION));
        let page_cores = PageCoreCache::from_entries(mk("page_cores.json").load::<PageCoreEntry>(PAGE_CORES_VERSION));
        let scalars = mk("scalars.json").load::<ScalarsEntry>(SCALARS_VERSION);
        let (config_hash, asset_manifest_mtime) = scalars
            .into_iter()
            .next()
            .map(|s| (s.config_hash.map(|h| ContentHash::from_hex(&h)), s.asset_manifest_mtime))
            .unwrap_or((None, 0.0));

        Self {
            dir,
            fingerprints,
            parsed_content,
            rendered_output,
            dependencies,
            autodoc,
            generated_members,
            taxonomy_index,
            page_cores,
            config_hash,
            asset_manifest_mtime,
        }
    }

    /// Flush every sub-table to disk. Each table's save is independent;
    /// a write failure in one does not prevent the others from saving.
    pub fn save(self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        self.store_for("fingerprints.json").save(&self.fingerprints.into_entries(), FINGERPRINTS_VERSION)?;
        let dependency_entries = self.dependencies.into_entries();
        self.store_for("dependencies.json").save(&dependency_entries, DEPENDENCIES_VERSION)?;
        self.store_for("parsed_content.json").save(&self.parsed_content.into_entries(), PARSED_CONTENT_VERSION)?;
        self.store_for("rendered_output.json").save(&self.rendered_output.into_entries(), RENDERED_OUTPUT_VERSION)?;
        let (autodoc_deps, autodoc_meta) = self.autodoc.into_parts();
        self.store_for("autodoc_dependencies.json").save(&autodoc_deps, AUTODOC_DEPS_VERSION)?;
        self.store_for("autodoc_source_metadata.json").save(&autodoc_meta, AUTODOC_METADATA_VERSION)?;
        self.store_for("generated_page_members.json").save(&self.generated_members.into_entries(), GENERATED_MEMBERS_VERSION)?;
        self.store_for("taxonomy_index.json").save(&self.taxonomy_index.into_entries(), TAXONOMY_INDEX_VERSION)?;
        self.store_for("page_cores.json").save(&self.page_cores.into_entries(), PAGE_CORES_VERSION)?;
        self.store_for("scalars.json").save(
            &[ScalarsEntry {
                config_hash: self.config_hash.as_ref().map(|h| h.as_str().to_string()),
                asset_manifest_mtime: self.asset_manifest_mtime,
            }],
            SCALARS_VERSION,
        )?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
