//! Static assets discovered under `assets/` and theme asset directories.
//!
//! Theme assets are discovered first (lowest priority); site assets with
//! the same output path override them. Fingerprinting/minification
//! mechanics are a collaborator's concern — only the manifest contract the
//! renderer cache depends on (§4.2 of the design notes) lives here.

use crate::primitives::{ContentHash, SourcePath};

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub source_path: SourcePath,
    /// Output-relative path (before any fingerprinting a processor applies).
    pub output_path: SourcePath,
    pub is_theme: bool,
    pub content_hash: Option<ContentHash>,
}

impl Asset {
    pub fn new(source_path: SourcePath, output_path: SourcePath, is_theme: bool) -> Self {
        Self {
            source_path,
            output_path,
            is_theme,
            content_hash: None,
        }
    }
}

/// Merge theme and site asset lists by output path, site assets winning.
/// Theme assets are expected first so the merge preserves discovery order
/// for assets that aren't overridden.
pub fn merge_assets(theme: Vec<Asset>, site: Vec<Asset>) -> Vec<Asset> {
    let mut by_output: std::collections::HashMap<SourcePath, Asset> = theme.into_iter().map(|a| (a.output_path.clone(), a)).collect();
    let mut order: Vec<SourcePath> = by_output.keys().cloned().collect();
    for asset in site {
        if !by_output.contains_key(&asset.output_path) {
            order.push(asset.output_path.clone());
        }
        by_output.insert(asset.output_path.clone(), asset);
    }
    order.into_iter().filter_map(|path| by_output.remove(&path)).collect()
}
