//! Redirect pages for `aliases`: a minimal meta-refresh HTML page at the
//! alias's resolved output path, plus an optional Netlify-style
//! `_redirects` file when `config.generate_redirects_file` is set.
//!
//! Collision rule (first-claimant-wins, §4.11): `claimed` is seeded by the
//! caller with every rendered page's output path, so an alias can never
//! overwrite real content; among aliases themselves, whichever is visited
//! first keeps the path and later ones are skipped with a warning.

use super::{PostprocessInput, alias_output_path, page_url};
use crate::logger;
use crate::primitives::atomic::atomic_write;
use anyhow::Context;
use rustc_hash::FxHashSet;
use std::path::PathBuf;

pub fn write_redirects(input: &PostprocessInput<'_>, claimed: &mut FxHashSet<PathBuf>) -> anyhow::Result<()> {
    let mut lines = Vec::new();

    for page in &input.snapshot.pages {
        if page.output_path.is_none() {
            continue;
        }
        let target = page_url(input.config, page);
        for alias in &page.aliases {
            let dest = alias_output_path(input.config, alias);
            if !claimed.insert(dest.clone()) {
                logger::warn("postprocess", &format!("alias {alias} collides with an existing output path, skipping"));
                continue;
            }
            write_redirect_page(&dest, &target)?;
            lines.push(format!("{} {} 301", normalize_alias(alias), target));
        }
    }

    if input.config.generate_redirects_file && !lines.is_empty() {
        let path = input.config.output_dir.join("_redirects");
        atomic_write(&path, lines.join("\n").as_bytes()).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn normalize_alias(alias: &str) -> String {
    format!("/{}", alias.trim_matches('/'))
}

fn write_redirect_page(dest: &std::path::Path, target: &str) -> anyhow::Result<()> {
    let html = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\n<meta http-equiv=\"refresh\" content=\"0; url={target}\">\n<link rel=\"canonical\" href=\"{target}\">\n</head><body>Redirecting to <a href=\"{target}\">{target}</a>.</body></html>\n"
    );
    atomic_write(dest, html.as_bytes()).with_context(|| format!("writing {}", dest.display()))
}
