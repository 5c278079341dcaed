//! Postprocess invocation (§4.11): drives RSS/Atom feed emission, sitemap
//! XML, redirect pages for `aliases`, per-page JSON/TXT dumps, and search
//! index assembly. Internal formatting of these artifacts is explicitly not
//! specified (§1) — what's owned here is invocation order, atomicity of
//! every write, and the first-claimant-wins collision rule between
//! generated pages and redirect aliases.

mod dumps;
mod feed;
mod redirects;
mod search_index;
mod sitemap;

use crate::config::SiteConfig;
use crate::site::Site;
use crate::snapshot::{PageSnapshot, SiteSnapshot};
use crate::taxonomy::query::QueryIndexes;
use rustc_hash::FxHashSet;
use std::path::PathBuf;
use std::time::{Duration, UNIX_EPOCH};

pub struct PostprocessInput<'a> {
    pub site: &'a Site,
    pub snapshot: &'a SiteSnapshot,
    pub config: &'a SiteConfig,
    pub query_indexes: &'a QueryIndexes,
}

/// Run every emitter in a fixed order (§4.11 "write order is
/// deterministic"). `claimed` seeds with every rendered page's output path
/// so redirects can never clobber real content; whichever alias or
/// generated page reaches a path first keeps it.
pub fn run(input: &PostprocessInput<'_>) -> anyhow::Result<()> {
    let mut claimed: FxHashSet<PathBuf> = input.snapshot.pages.iter().filter_map(|p| p.output_path.clone()).collect();

    feed::write_rss(input)?;
    feed::write_atom(input)?;
    sitemap::write_sitemap(input)?;
    redirects::write_redirects(input, &mut claimed)?;
    dumps::write_dumps(input)?;
    search_index::write_search_index(input)?;
    Ok(())
}

/// RFC 3339 string for a page's `date` field (epoch seconds). Feeds built
/// from `atom_syndication`/`rss` both accept this form: Atom wants it
/// natively, and RSS's `pub_date` is left unvalidated here since byte-exact
/// feed formatting carries no test contract (SPEC_FULL "Postprocess
/// formatting grounding").
fn rfc3339(seconds: f64) -> String {
    let time = UNIX_EPOCH + Duration::from_secs_f64(seconds.max(0.0));
    humantime::format_rfc3339_seconds(time).to_string()
}

/// The canonical URL a page's `output_path` maps to under `base_url`,
/// following the same `section/slug/index.html` convention the orchestrator
/// uses when resolving output paths: a trailing `index.html` collapses to a
/// trailing slash, everything else is kept verbatim.
fn page_url(config: &SiteConfig, page: &PageSnapshot) -> String {
    let Some(output_path) = &page.output_path else {
        return config.base_url.clone();
    };
    let rel = output_path.strip_prefix(&config.output_dir).unwrap_or(output_path);
    let mut rel = rel.to_string_lossy().replace('\\', "/");
    if let Some(stripped) = rel.strip_suffix("index.html") {
        rel = stripped.to_string();
    }
    format!("{}/{}", config.base_url.trim_end_matches('/'), rel.trim_start_matches('/'))
}

/// Output path an alias maps to, following the same convention: `/old-url/`
/// becomes `<output_dir>/old-url/index.html`.
fn alias_output_path(config: &SiteConfig, alias: &str) -> PathBuf {
    config.output_dir.join(alias.trim_matches('/')).join("index.html")
}

/// Rendered HTML reduced to plain text, for search indexing and the
/// per-page `.txt` dumps. Walks the parsed DOM rather than regexing tags
/// out, so script/style contents and entity decoding are handled by `tl`
/// itself rather than by hand.
fn strip_html_to_text(html: &str) -> String {
    let Ok(dom) = tl::parse(html, tl::ParserOptions::default()) else {
        return String::new();
    };
    let parser = dom.parser();
    dom.children()
        .iter()
        .filter_map(|handle| handle.get(parser))
        .map(|node| node.inner_text(parser).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod strip_tests {
    use super::strip_html_to_text;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        assert_eq!(strip_html_to_text("<p>Hello  <b>world</b></p>\n<p>!</p>"), "Hello world !");
    }
}
