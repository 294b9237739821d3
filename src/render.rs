//! Builds the RSS 2.0 / Atom 1.0 / HTML views over a page of entries.
//!
//! RSS via `rss::ChannelBuilder`/`ItemBuilder`/`EnclosureBuilder`, grounded
//! on the retrieval pack's `wezm-rsspls`. Atom via `atom_syndication`'s
//! builder API, grounded on `kittyandrew-pail`/`iovxw-babel`. The HTML view
//! substitutes an `askama` template for the XSL transform the original
//! applies via `lxml.etree.XSLT` (spec §9, "Template/XSLT collaborator" —
//! no production XSLT engine exists in this crate's reference corpus).

use askama::Template;
use atom_syndication::{
    Entry as AtomEntry, FeedBuilder, LinkBuilder as AtomLinkBuilder, PersonBuilder,
};
use chrono::{DateTime, Utc};
use rss::{Channel, ChannelBuilder, EnclosureBuilder, GuidBuilder, Item, ItemBuilder};

use crate::models::{PageCursor, StoredEntry};

const TITLE: &str = "feedhub";

fn rfc822(time: i64) -> String {
    DateTime::<Utc>::from_timestamp(time, 0)
        .unwrap_or_default()
        .to_rfc2822()
}

fn rfc3339(time: i64) -> String {
    DateTime::<Utc>::from_timestamp(time, 0)
        .unwrap_or_default()
        .to_rfc3339()
}

fn next_param(cursor: Option<PageCursor>) -> Option<String> {
    cursor.map(PageCursor::to_query_param)
}

fn to_item(stored: &StoredEntry) -> Item {
    let entry = &stored.entry;
    let mut builder = ItemBuilder::default();
    builder
        .title(entry.title.clone())
        .link(entry.link.clone())
        .description(entry.description.clone())
        .pub_date(Some(rfc822(entry.published_time)))
        .guid(Some(
            GuidBuilder::default()
                .value(entry.id.clone())
                .permalink(false)
                .build(),
        ));
    if let Some(first_link) = entry.links.first() {
        builder.enclosure(Some(
            EnclosureBuilder::default()
                .url(first_link.href.clone())
                .mime_type(first_link.link_type.clone().unwrap_or_default())
                .length(first_link.length.to_string())
                .build(),
        ));
    }
    builder.build()
}

pub fn render_rss(entries: &[StoredEntry], cursor: Option<PageCursor>) -> String {
    let items: Vec<Item> = entries.iter().map(to_item).collect();
    let channel: Channel = ChannelBuilder::default()
        .title(TITLE)
        .link("/rss.xml")
        .description("Aggregated entries")
        .items(items)
        .build();
    let mut out = channel.to_string();
    if let Some(next) = next_param(cursor) {
        out.push_str(&format!("<!-- next={next} -->"));
    }
    out
}

fn to_atom_entry(stored: &StoredEntry) -> AtomEntry {
    let entry = &stored.entry;
    let mut builder = AtomEntry::default();
    builder.set_title(entry.title.clone().unwrap_or_default());
    builder.set_id(entry.id.clone());
    builder.set_updated(
        DateTime::<Utc>::from_timestamp(entry.published_time, 0)
            .unwrap_or_default()
            .fixed_offset(),
    );
    if let Some(link) = &entry.link {
        builder.set_links(vec![AtomLinkBuilder::default().href(link.clone()).build()]);
    }
    if let Some(description) = &entry.description {
        builder.set_summary(Some(description.clone().into()));
    }
    if let Some(source_title) = &entry.source_title {
        builder.set_authors(vec![PersonBuilder::default().name(source_title.clone()).build()]);
    }
    builder
}

pub fn render_atom(entries: &[StoredEntry], cursor: Option<PageCursor>) -> String {
    let atom_entries: Vec<AtomEntry> = entries.iter().map(to_atom_entry).collect();
    let feed = FeedBuilder::default()
        .title(TITLE)
        .id("/atom.xml")
        .updated(Utc::now().fixed_offset())
        .entries(atom_entries)
        .build();
    let mut out = feed.to_string();
    if let Some(next) = next_param(cursor) {
        out.push_str(&format!("<!-- next={next} -->"));
    }
    out
}

#[derive(Template)]
#[template(path = "feed.html")]
struct FeedPage<'a> {
    title: &'a str,
    entries: &'a [StoredEntry],
    updated: String,
    next: Option<String>,
}

/// HTML view substituting for `GET /feed.html`'s XSLT transform.
pub fn render_html(
    entries: &[StoredEntry],
    cursor: Option<PageCursor>,
    last_updated_at: i64,
) -> Result<String, askama::Error> {
    let page = FeedPage {
        title: TITLE,
        entries,
        updated: rfc3339(last_updated_at),
        next: next_param(cursor),
    };
    page.render()
}

#[derive(Template)]
#[template(path = "search.html")]
struct SearchPage<'a> {
    title: &'a str,
    query: &'a str,
    entries: &'a [StoredEntry],
}

/// HTML view for `GET /search`, same template family as `feed.html`.
pub fn render_search_html(query: &str, entries: &[StoredEntry]) -> Result<String, askama::Error> {
    let page = SearchPage {
        title: TITLE,
        query,
        entries,
    };
    page.render()
}
