//! Search index assembly: a flat JSON array of `{title, url, tags,
//! content}` ordered newest-first via `query_indexes.by_date`, written to
//! the output root (or under the snapshot's `version_id` when it isn't the
//! default, mirroring the per-version output layout §6.6 describes for
//! multi-version builds).

use super::{PostprocessInput, page_url, strip_html_to_text};
use crate::primitives::atomic::atomic_write;
use anyhow::Context;
use serde_json::json;

pub fn write_search_index(input: &PostprocessInput<'_>) -> anyhow::Result<()> {
    let entries: Vec<_> = input
        .query_indexes
        .by_date
        .iter()
        .filter_map(|&idx| input.snapshot.pages.get(idx))
        .filter(|p| p.output_path.is_some())
        .map(|page| {
            json!({
                "title": page.title,
                "url": page_url(input.config, page),
                "tags": page.tags,
                "content": strip_html_to_text(&page.rendered_html),
            })
        })
        .collect();

    let dir = if input.snapshot.version_id.is_empty() || input.snapshot.version_id == "default" {
        input.config.output_dir.clone()
    } else {
        input.config.output_dir.join(&input.snapshot.version_id)
    };
    let path = dir.join("search-index.json");
    atomic_write(&path, serde_json::to_vec(&entries)?.as_slice()).with_context(|| format!("writing {}", path.display()))
}
