//! Markdown parser collaborator (§6.3): `parse(source) -> (html, toc,
//! toc_items, ast, links)`. The contract the build core actually depends
//! on is narrow — this module's `ReferenceParser` is one concrete
//! implementation (pulldown-cmark), not a specified design; any conforming
//! `Parser` works (tests inject a stub).

use crate::cache::parsed_content::TocItem;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser as CmarkParser, Tag, TagEnd};

#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub html: String,
    pub toc: String,
    pub toc_items: Vec<TocItem>,
    pub ast: Option<String>,
    pub links: Vec<String>,
}

/// Injected at orchestrator construction (§9 "Dynamic dispatch for parser
/// and engine"). `parser_version` changing invalidates every parsed-content
/// cache entry (§6.3).
pub trait Parser: Send + Sync {
    fn parse(&self, source: &str) -> anyhow::Result<ParseOutput>;
    fn parser_version(&self) -> &str;
}

/// Reference implementation over `pulldown-cmark`. Headings get their `id`
/// from pulldown-cmark's own slug (or a fallback slug of the heading text)
/// and collect into `toc_items`/`toc`; outbound link destinations are
/// recorded as they're encountered.
pub struct ReferenceParser {
    options: Options,
}

impl Default for ReferenceParser {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        Self { options }
    }
}

impl Parser for ReferenceParser {
    fn parse(&self, source: &str) -> anyhow::Result<ParseOutput> {
        let parser = CmarkParser::new_ext(source, self.options);

        let mut html = String::with_capacity(source.len() * 2);
        let mut toc_items: Vec<TocItem> = Vec::new();
        let mut links: Vec<String> = Vec::new();

        let mut current_heading: Option<(HeadingLevel, Option<String>, String)> = None;
        let mut events = Vec::new();

        for event in parser {
            match &event {
                Event::Start(Tag::Heading { level, id, .. }) => {
                    current_heading = Some((*level, id.as_ref().map(|s| s.to_string()), String::new()));
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some((_, _, buf)) = current_heading.as_mut() {
                        buf.push_str(text);
                    }
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some((level, id, text)) = current_heading.take() {
                        let id = id.unwrap_or_else(|| slugify_heading(&text));
                        toc_items.push(TocItem {
                            id,
                            title: text,
                            level: heading_level_number(level),
                        });
                    }
                }
                Event::Start(Tag::Link { dest_url, .. }) => {
                    links.push(dest_url.to_string());
                }
                _ => {}
            }
            events.push(event);
        }

        pulldown_cmark::html::push_html(&mut html, events.into_iter());

        let toc = render_toc(&toc_items);

        Ok(ParseOutput {
            html,
            toc,
            toc_items,
            ast: None,
            links,
        })
    }

    fn parser_version(&self) -> &str {
        "pulldown-cmark-reference-v1"
    }
}

fn heading_level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn slugify_heading(text: &str) -> String {
    let ascii = deunicode::deunicode(text).to_lowercase();
    let mut slug = String::with_capacity(ascii.len());
    let mut last_was_dash = true;
    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn render_toc(items: &[TocItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut out = String::from("<ul class=\"toc\">");
    for item in items {
        out.push_str(&format!(
            "<li class=\"toc-level-{}\"><a href=\"#{}\">{}</a></li>",
            item.level, item.id, item.title
        ));
    }
    out.push_str("</ul>");
    out
}
