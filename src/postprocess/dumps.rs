//! Per-page JSON and plain-text dumps: a sibling `index.json`/`index.txt`
//! next to every rendered page's `index.html`, for downstream tooling
//! (search, static analysis) that would rather not re-parse HTML.

use super::{PostprocessInput, page_url, strip_html_to_text};
use crate::primitives::atomic::atomic_write;
use anyhow::Context;
use serde_json::json;
use std::path::{Path, PathBuf};

pub fn write_dumps(input: &PostprocessInput<'_>) -> anyhow::Result<()> {
    for page in &input.snapshot.pages {
        let Some(output_path) = &page.output_path else { continue };
        let text = strip_html_to_text(&page.rendered_html);

        let json_path = sibling_path(output_path, "index.json", "json");
        let dump = json!({
            "title": page.title,
            "url": page_url(input.config, page),
            "date": page.date,
            "tags": page.tags,
            "template": page.template,
            "word_count": page.word_count,
            "reading_time_minutes": page.reading_time_minutes,
            "content": text,
        });
        atomic_write(&json_path, serde_json::to_vec_pretty(&dump)?.as_slice()).with_context(|| format!("writing {}", json_path.display()))?;

        let txt_path = sibling_path(output_path, "index.txt", "txt");
        atomic_write(&txt_path, text.as_bytes()).with_context(|| format!("writing {}", txt_path.display()))?;
    }
    Ok(())
}

fn sibling_path(output_path: &Path, index_name: &str, ext: &str) -> PathBuf {
    if output_path.file_name().is_some_and(|name| name == "index.html") {
        output_path.with_file_name(index_name)
    } else {
        output_path.with_extension(ext)
    }
}
