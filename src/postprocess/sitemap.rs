//! `sitemap.xml` generation: a hand-built XML string (no crate covers this
//! format), with an `escape_xml` fast-path for entries that need no
//! escaping and a plain `<url>/<loc>/<lastmod>` shape. Writes go through
//! [`atomic_write`], per the write-atomicity requirement carried by every
//! postprocess emitter.

use super::{PostprocessInput, page_url, rfc3339};
use crate::primitives::atomic::atomic_write;
use anyhow::Context;
use std::borrow::Cow;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

struct UrlEntry {
    loc: String,
    lastmod: Option<String>,
}

pub fn write_sitemap(input: &PostprocessInput<'_>) -> anyhow::Result<()> {
    let urls: Vec<UrlEntry> = input
        .snapshot
        .pages
        .iter()
        .filter(|page| page.output_path.is_some())
        .map(|page| UrlEntry {
            loc: page_url(input.config, page),
            lastmod: page.date.map(rfc3339),
        })
        .collect();

    let xml = into_xml(urls);
    let path = input.config.output_dir.join("sitemap.xml");
    atomic_write(&path, xml.as_bytes()).with_context(|| format!("writing {}", path.display()))
}

fn into_xml(urls: Vec<UrlEntry>) -> String {
    let mut xml = String::with_capacity(4096);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"");
    xml.push_str(SITEMAP_NS);
    xml.push_str("\">\n");

    for entry in urls {
        xml.push_str("  <url>\n    <loc>");
        xml.push_str(&escape_xml(&entry.loc));
        xml.push_str("</loc>\n");
        if let Some(lastmod) = entry.lastmod {
            xml.push_str("    <lastmod>");
            xml.push_str(&lastmod);
            xml.push_str("</lastmod>\n");
        }
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}
