//! RSS/Atom feed emission: builds channel/entry sets via `rss`/
//! `atom_syndication`'s own builder types, skipping any page with an
//! unparsable date rather than failing the whole feed.

use super::{PostprocessInput, page_url, rfc3339};
use crate::primitives::atomic::atomic_write;
use crate::snapshot::PageSnapshot;
use anyhow::Context;
use atom_syndication::{Entry, EntryBuilder, FeedBuilder, FixedDateTime, GeneratorBuilder, Link, LinkBuilder, Person, PersonBuilder, Text};
use rss::{ChannelBuilder, GuidBuilder, Item, ItemBuilder};

/// Newest-first iterator over pages that carry a date, following
/// `query_indexes.by_date` so feed ordering matches search/listing order.
fn dated_pages<'a>(input: &'a PostprocessInput<'a>) -> impl Iterator<Item = &'a PageSnapshot> {
    input
        .query_indexes
        .by_date
        .iter()
        .filter_map(move |&idx| input.snapshot.pages.get(idx))
        .filter(|p| p.date.is_some())
}

pub fn write_rss(input: &PostprocessInput<'_>) -> anyhow::Result<()> {
    let items: Vec<Item> = dated_pages(input).filter_map(|p| page_to_rss_item(input, p)).collect();

    let channel = ChannelBuilder::default()
        .title(input.config.title.clone())
        .link(input.config.base_url.clone())
        .description(format!("{} feed", input.config.title))
        .generator(Some("crucible".to_string()))
        .items(items)
        .build();

    let path = input.config.output_dir.join("rss.xml");
    atomic_write(&path, channel.to_string().as_bytes()).with_context(|| format!("writing {}", path.display()))
}

fn page_to_rss_item(input: &PostprocessInput<'_>, page: &PageSnapshot) -> Option<Item> {
    let date = page.date?;
    let pub_date = rfc3339(date);
    let link = page_url(input.config, page);
    let guid = GuidBuilder::default().permalink(true).value(link.clone()).build();

    Some(
        ItemBuilder::default()
            .title(page.title.clone())
            .link(Some(link))
            .guid(guid)
            .pub_date(pub_date)
            .build(),
    )
}

pub fn write_atom(input: &PostprocessInput<'_>) -> anyhow::Result<()> {
    let entries: Vec<Entry> = dated_pages(input).filter_map(|p| page_to_atom_entry(input, p)).collect();

    // Compare by RFC3339 string: lexicographically sortable for ISO dates.
    let updated_str = dated_pages(input)
        .filter_map(|p| p.date)
        .map(rfc3339)
        .max()
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string());
    let updated: FixedDateTime = updated_str.parse().unwrap_or_else(|_| FixedDateTime::default());

    let author: Person = PersonBuilder::default().name(input.config.title.clone()).build();
    let self_link: Link = LinkBuilder::default()
        .href(format!("{}/atom.xml", input.config.base_url.trim_end_matches('/')))
        .rel("self".to_string())
        .mime_type(Some("application/atom+xml".to_string()))
        .build();
    let alternate_link: Link = LinkBuilder::default().href(input.config.base_url.clone()).rel("alternate".to_string()).build();

    let feed = FeedBuilder::default()
        .title(Text::plain(input.config.title.clone()))
        .id(input.config.base_url.clone())
        .updated(updated)
        .authors(vec![author])
        .links(vec![self_link, alternate_link])
        .generator(Some(GeneratorBuilder::default().value("crucible").build()))
        .entries(entries)
        .build();

    let path = input.config.output_dir.join("atom.xml");
    atomic_write(&path, feed.to_string().as_bytes()).with_context(|| format!("writing {}", path.display()))
}

fn page_to_atom_entry(input: &PostprocessInput<'_>, page: &PageSnapshot) -> Option<Entry> {
    let date = page.date?;
    let updated_str = rfc3339(date);
    let updated: FixedDateTime = updated_str.parse().ok()?;
    let link = page_url(input.config, page);
    let entry_link: Link = LinkBuilder::default().href(link.clone()).rel("alternate".to_string()).build();

    Some(
        EntryBuilder::default()
            .title(Text::plain(page.title.clone()))
            .id(link)
            .updated(updated)
            .links(vec![entry_link])
            .build(),
    )
}
