//! RSS 2.0 and Atom decoding into one canonical feed shape.
//!
//! Detection is explicit: the root element selects the schema (`<rss>` or
//! `<feed>`), the document is decoded strictly against that schema with
//! `quick-xml`'s serde support, and the result is carried as a
//! [`FeedFormat`] until it is mapped to a [`CanonicalFeed`].
//!
//! Namespaced extensions (`itunes:title`, `media:content`, `atom:link`, ...)
//! share local names with core elements, so every text field is decoded as a
//! list and the first non-empty value in document order wins.

use quick_xml::de::{DeError, EntityResolver};
use quick_xml::escape::{escape, resolve_predefined_entity};
use quick_xml::events::{BytesText, Event};
use quick_xml::Reader;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::convert::Infallible;
use std::fmt;
use thiserror::Error;

/// Maximum number of characters of the raw payload kept in a [`ParseError`].
pub const SNIPPET_CHARS: usize = 100;

/// Stands in for a named entity that is neither XML nor HTML5.
const UNKNOWN_ENTITY: &str = "\u{fffd}";

/// Errors produced when a payload cannot be decoded as a feed.
///
/// Both variants carry at most [`SNIPPET_CHARS`] characters of the payload,
/// never the whole document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The root element is neither `<rss>` nor `<feed>`, or there is none.
    #[error("document is neither RSS nor Atom (root element: {}); payload starts with {snippet:?}", .root.as_deref().unwrap_or("none"))]
    UnrecognizedFormat {
        root: Option<String>,
        snippet: String,
    },
    /// The root element matched but the document does not fit the schema.
    #[error("malformed {format} document: {reason}; payload starts with {snippet:?}")]
    Malformed {
        format: &'static str,
        reason: String,
        snippet: String,
    },
}

impl ParseError {
    /// The truncated payload prefix kept for diagnostics.
    pub fn snippet(&self) -> &str {
        match self {
            ParseError::UnrecognizedFormat { snippet, .. } => snippet,
            ParseError::Malformed { snippet, .. } => snippet,
        }
    }
}

// ============================================================================
// Canonical Types
// ============================================================================

/// A feed document after format-specific decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub image: FeedImage,
    /// Entries in document order.
    pub items: Vec<CanonicalEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedImage {
    pub url: String,
    pub title: String,
}

/// One item (RSS) or entry (Atom).
///
/// Empty strings stand for absent values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalEntry {
    pub title: String,
    pub url: String,
    pub description: String,
    pub content: String,
    pub author: String,
    /// Publish date exactly as written in the document.
    pub published_raw: String,
}

// ============================================================================
// Format Detection
// ============================================================================

/// A decoded document, tagged with the schema it matched.
#[derive(Debug)]
pub enum FeedFormat {
    Rss(RssDoc),
    Atom(AtomDoc),
}

impl FeedFormat {
    /// Detects the schema of `bytes` and decodes it.
    ///
    /// RSS is tried before Atom.
    ///
    /// # Errors
    ///
    /// - [`ParseError::UnrecognizedFormat`] if the root element is neither
    ///   `<rss>` nor `<feed>` (including non-XML payloads)
    /// - [`ParseError::Malformed`] if the document does not decode against the
    ///   schema its root element selects
    pub fn detect(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_start_matches('\u{feff}');
        let root = root_element(text);

        match root.as_deref() {
            Some("rss") => decode::<RssDoc>(text)
                .map(FeedFormat::Rss)
                .map_err(|e| ParseError::Malformed {
                    format: "RSS",
                    reason: e.to_string(),
                    snippet: snippet(bytes),
                }),
            Some("feed") => decode::<AtomDoc>(text)
                .map(FeedFormat::Atom)
                .map_err(|e| ParseError::Malformed {
                    format: "Atom",
                    reason: e.to_string(),
                    snippet: snippet(bytes),
                }),
            _ => Err(ParseError::UnrecognizedFormat {
                root,
                snippet: snippet(bytes),
            }),
        }
    }

    pub fn into_canonical(self) -> CanonicalFeed {
        match self {
            FeedFormat::Rss(doc) => doc.into_canonical(),
            FeedFormat::Atom(doc) => doc.into_canonical(),
        }
    }
}

/// Parses a raw RSS or Atom payload into a [`CanonicalFeed`].
pub fn parse(bytes: &[u8]) -> Result<CanonicalFeed, ParseError> {
    FeedFormat::detect(bytes).map(FeedFormat::into_canonical)
}

fn decode<'de, T: Deserialize<'de>>(xml: &'de str) -> Result<T, DeError> {
    let mut de = quick_xml::de::Deserializer::from_str_with_resolver(xml, FeedEntities);
    T::deserialize(&mut de)
}

/// Entity resolution for feed text.
///
/// Feeds use HTML named entities (`&nbsp;`, `&eacute;`, ...) that XML does not
/// define; those resolve to their HTML5 values and anything else becomes
/// U+FFFD instead of failing the document. DOCTYPE declarations are ignored,
/// so entities defined inside the document are never expanded.
#[derive(Debug, Default, Clone, Copy)]
struct FeedEntities;

impl EntityResolver for FeedEntities {
    type Error = Infallible;

    fn capture(&mut self, _doctype: BytesText) -> Result<(), Self::Error> {
        Ok(())
    }

    fn resolve(&self, entity: &str) -> Option<&str> {
        Some(resolve_predefined_entity(entity).unwrap_or(UNKNOWN_ENTITY))
    }
}

/// Local name of the first element in the document, if the prolog parses.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

fn snippet(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(SNIPPET_CHARS)
        .collect()
}

// ============================================================================
// Shared Schema Pieces
// ============================================================================

/// Content of an element: character data and child elements in document
/// order, plus the element's attributes.
///
/// Elements that mix text and markup (`Hello <b>bold</b> world`) are common in
/// feeds that embed unescaped HTML, so children are kept instead of rejected.
#[derive(Debug, Default)]
struct Text {
    attrs: Vec<(String, String)>,
    nodes: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Chars(String),
    Element { name: String, body: Text },
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_struct("Text", &["$text"], TextVisitor)
    }
}

struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = Text;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an element with text or child elements")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Text, E> {
        Ok(Text {
            attrs: Vec::new(),
            nodes: vec![Node::Chars(value.to_string())],
        })
    }

    // Keys are `@attr` for attributes, `$text` for each run of character
    // data and the local name for each child element.
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Text, A::Error> {
        let mut text = Text::default();
        while let Some(key) = map.next_key::<String>()? {
            if key == "$text" {
                text.nodes.push(Node::Chars(map.next_value()?));
            } else if let Some(attr) = key.strip_prefix('@') {
                let value: String = map.next_value()?;
                text.attrs.push((attr.to_string(), value));
            } else {
                let body: Text = map.next_value()?;
                text.nodes.push(Node::Element { name: key, body });
            }
        }
        Ok(text)
    }
}

impl Text {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Character data of the element and all its descendants, trimmed and
    /// joined by single spaces.
    fn plain(&self) -> String {
        let mut parts = Vec::new();
        self.collect_chars(&mut parts);
        parts.join(" ")
    }

    fn collect_chars<'a>(&'a self, parts: &mut Vec<&'a str>) {
        for node in &self.nodes {
            match node {
                Node::Chars(chars) => {
                    let chars = chars.trim();
                    if !chars.is_empty() {
                        parts.push(chars);
                    }
                }
                Node::Element { body, .. } => body.collect_chars(parts),
            }
        }
    }

    /// Inner content with child elements written back as markup.
    ///
    /// Character data is emitted as decoded, so escaped or CDATA HTML comes
    /// out as HTML.
    fn markup(&self) -> String {
        let mut out = String::new();
        self.write_inner(&mut out);
        out.trim().to_string()
    }

    /// Atom `type="xhtml"` content sits inside a wrapper `<div>` that is not
    /// part of the content.
    fn atom_markup(&self) -> String {
        if self.attr("type") == Some("xhtml") {
            if let [Node::Element { name, body }] = self.nodes.as_slice() {
                if name == "div" {
                    return body.markup();
                }
            }
        }
        self.markup()
    }

    // The decoder trims whitespace next to tags, so a single space goes back
    // between character data and an adjacent element.
    fn write_inner(&self, out: &mut String) {
        let mut prev_was_chars = None;
        for node in &self.nodes {
            let is_chars = matches!(node, Node::Chars(_));
            if prev_was_chars.is_some_and(|prev| prev != is_chars) {
                out.push(' ');
            }
            match node {
                Node::Chars(chars) => out.push_str(chars),
                Node::Element { name, body } => body.write_element(name, out),
            }
            prev_was_chars = Some(is_chars);
        }
    }

    fn write_element(&self, name: &str, out: &mut String) {
        out.push('<');
        out.push_str(name);
        for (key, value) in &self.attrs {
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.nodes.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        self.write_inner(out);
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
}

/// First non-empty value, as plain text.
fn first_text(values: &[Text]) -> String {
    values
        .iter()
        .map(Text::plain)
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

/// First non-empty value, keeping inline markup.
fn first_markup(values: &[Text], render: fn(&Text) -> String) -> String {
    values
        .iter()
        .map(render)
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

fn looks_like_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

// ============================================================================
// RSS 2.0
// ============================================================================

/// An `<rss>` document.
#[derive(Debug, Deserialize)]
pub struct RssDoc {
    channel: RssChannel,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RssChannel {
    title: Vec<Text>,
    link: Vec<Text>,
    description: Vec<Text>,
    language: Vec<Text>,
    image: Vec<RssImage>,
    item: Vec<RssItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RssImage {
    url: Vec<Text>,
    title: Vec<Text>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RssItem {
    title: Vec<Text>,
    link: Vec<Text>,
    description: Vec<Text>,
    #[serde(rename = "encoded", alias = "content:encoded")]
    encoded: Vec<Text>,
    author: Vec<Text>,
    #[serde(rename = "creator", alias = "dc:creator")]
    creator: Vec<Text>,
    #[serde(rename = "pubDate")]
    pub_date: Vec<Text>,
    #[serde(rename = "date", alias = "dc:date")]
    date: Vec<Text>,
    guid: Vec<Text>,
}

impl RssDoc {
    fn into_canonical(self) -> CanonicalFeed {
        let channel = self.channel;
        let image = channel
            .image
            .iter()
            .map(|img| FeedImage {
                url: first_text(&img.url),
                title: first_text(&img.title),
            })
            .find(|img| !img.url.is_empty())
            .unwrap_or_default();

        CanonicalFeed {
            title: first_text(&channel.title),
            link: first_text(&channel.link),
            description: first_text(&channel.description),
            language: first_text(&channel.language),
            image,
            items: channel
                .item
                .into_iter()
                .map(RssItem::into_entry)
                .collect(),
        }
    }
}

impl RssItem {
    fn into_entry(self) -> CanonicalEntry {
        let mut url = first_text(&self.link);
        if url.is_empty() {
            let guid = first_text(&self.guid);
            if looks_like_url(&guid) {
                url = guid;
            }
        }

        let mut author = first_text(&self.author);
        if author.is_empty() {
            author = first_text(&self.creator);
        }

        let mut published_raw = first_text(&self.pub_date);
        if published_raw.is_empty() {
            published_raw = first_text(&self.date);
        }

        CanonicalEntry {
            title: first_text(&self.title),
            url,
            description: first_markup(&self.description, Text::markup),
            content: first_markup(&self.encoded, Text::markup),
            author,
            published_raw,
        }
    }
}

// ============================================================================
// Atom
// ============================================================================

/// A `<feed>` document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AtomDoc {
    #[serde(rename = "@lang", alias = "@xml:lang")]
    lang: String,
    title: Vec<Text>,
    subtitle: Vec<Text>,
    link: Vec<AtomLink>,
    author: Vec<AtomPerson>,
    logo: Vec<Text>,
    icon: Vec<Text>,
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AtomPerson {
    name: Vec<Text>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AtomEntry {
    id: Vec<Text>,
    title: Vec<Text>,
    link: Vec<AtomLink>,
    summary: Vec<Text>,
    content: Vec<Text>,
    published: Vec<Text>,
    updated: Vec<Text>,
    author: Vec<AtomPerson>,
}

fn first_person(people: &[AtomPerson]) -> String {
    people
        .iter()
        .map(|p| first_text(&p.name))
        .find(|name| !name.is_empty())
        .unwrap_or_default()
}

impl AtomDoc {
    fn into_canonical(self) -> CanonicalFeed {
        // Only an explicit rel="alternate" counts at feed level.
        let link = self
            .link
            .iter()
            .find(|l| l.rel.as_deref() == Some("alternate"))
            .map(|l| l.href.trim().to_string())
            .unwrap_or_default();

        let mut image_url = first_text(&self.logo);
        if image_url.is_empty() {
            image_url = first_text(&self.icon);
        }

        let feed_author = first_person(&self.author);

        CanonicalFeed {
            title: first_text(&self.title),
            link,
            description: first_text(&self.subtitle),
            language: self.lang.trim().to_string(),
            image: FeedImage {
                url: image_url,
                title: String::new(),
            },
            items: self
                .entry
                .into_iter()
                .map(|entry| entry.into_entry(&feed_author))
                .collect(),
        }
    }
}

impl AtomEntry {
    fn into_entry(self, feed_author: &str) -> CanonicalEntry {
        // An entry link without rel is an alternate link.
        let alternate = self
            .link
            .iter()
            .filter(|l| !l.href.trim().is_empty())
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.link.iter().find(|l| !l.href.trim().is_empty()));

        let url = match alternate {
            Some(link) => link.href.trim().to_string(),
            None => {
                let id = first_text(&self.id);
                if looks_like_url(&id) {
                    id
                } else {
                    String::new()
                }
            }
        };

        let mut author = first_person(&self.author);
        if author.is_empty() {
            author = feed_author.to_string();
        }

        let mut published_raw = first_text(&self.published);
        if published_raw.is_empty() {
            published_raw = first_text(&self.updated);
        }

        CanonicalEntry {
            title: first_text(&self.title),
            url,
            description: first_markup(&self.summary, Text::atom_markup),
            content: first_markup(&self.content, Text::atom_markup),
            author,
            published_raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/"
     xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:atom="http://www.w3.org/2005/Atom">
<channel>
    <title>Example News</title>
    <link>https://example.com/</link>
    <atom:link href="https://example.com/rss" rel="self" type="application/rss+xml"/>
    <description>All the news</description>
    <language>en-us</language>
    <image>
        <url>https://example.com/logo.png</url>
        <title>Example logo</title>
    </image>
    <item>
        <title>First</title>
        <link>https://example.com/1</link>
        <description><![CDATA[<p>One</p>]]></description>
        <content:encoded><![CDATA[<p>One, in full</p>]]></content:encoded>
        <author>alice@example.com (Alice)</author>
        <dc:creator>Not Alice</dc:creator>
        <pubDate>Fri, 12 Jul 2024 13:00:00 +0200</pubDate>
    </item>
    <item>
        <title>Second</title>
        <link>https://example.com/2</link>
        <description>Two</description>
        <dc:creator>Bob</dc:creator>
    </item>
    <item>
        <title>Third</title>
        <guid isPermaLink="true">https://example.com/3</guid>
        <author></author>
    </item>
</channel>
</rss>"#;

    #[test]
    fn test_rss_channel_metadata() {
        let feed = parse(RSS.as_bytes()).unwrap();
        assert_eq!(feed.title, "Example News");
        assert_eq!(feed.link, "https://example.com/");
        assert_eq!(feed.description, "All the news");
        assert_eq!(feed.language, "en-us");
        assert_eq!(
            feed.image,
            FeedImage {
                url: "https://example.com/logo.png".into(),
                title: "Example logo".into(),
            }
        );
    }

    #[test]
    fn test_rss_items_in_document_order_with_author_fallback() {
        let feed = parse(RSS.as_bytes()).unwrap();
        let titles: Vec<_> = feed.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);

        assert_eq!(
            feed.items[0],
            CanonicalEntry {
                title: "First".into(),
                url: "https://example.com/1".into(),
                description: "<p>One</p>".into(),
                content: "<p>One, in full</p>".into(),
                author: "alice@example.com (Alice)".into(),
                published_raw: "Fri, 12 Jul 2024 13:00:00 +0200".into(),
            }
        );
        assert_eq!(feed.items[1].author, "Bob");
        assert_eq!(feed.items[2].author, "");
    }

    #[test]
    fn test_rss_guid_permalink_used_when_link_missing() {
        let feed = parse(RSS.as_bytes()).unwrap();
        assert_eq!(feed.items[2].url, "https://example.com/3");
    }

    #[test]
    fn test_rss_opaque_guid_is_not_a_url() {
        let xml = r#"<rss><channel><item><title>x</title><guid isPermaLink="false">abc-123</guid></item></channel></rss>"#;
        let feed = parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.items[0].url, "");
    }

    #[test]
    fn test_rss_dc_date_fallback() {
        let xml = r#"<rss xmlns:dc="http://purl.org/dc/elements/1.1/"><channel><item>
            <link>https://example.com/a</link><dc:date>2024-07-12T11:00:00Z</dc:date>
        </item></channel></rss>"#;
        let feed = parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.items[0].published_raw, "2024-07-12T11:00:00Z");
    }

    #[test]
    fn test_rss_with_podcast_extensions() {
        let xml = r#"<rss xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"><channel>
            <title>Pod</title>
            <itunes:image href="https://example.com/cover.jpg"/>
            <item>
                <title>Episode 1</title>
                <itunes:title>Ep. 1</itunes:title>
                <link>https://example.com/ep1</link>
                <itunes:author>Host</itunes:author>
            </item>
        </channel></rss>"#;
        let feed = parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].title, "Episode 1");
        assert_eq!(feed.items[0].url, "https://example.com/ep1");
    }

    #[test]
    fn test_rss_html_entities_scrubbed() {
        let xml = "<rss><channel><item><title>A&nbsp;B &mdash; C</title>\
                   <link>https://example.com/e</link></item></channel></rss>";
        let feed = parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.items[0].title, "A\u{a0}B \u{2014} C");
    }

    #[test]
    fn test_empty_channel_yields_no_items() {
        let feed = parse(br#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#)
            .unwrap();
        assert!(feed.items.is_empty());
        assert_eq!(feed.title, "");

        let feed = parse(b"<rss><channel/></rss>").unwrap();
        assert!(feed.items.is_empty());
    }

    #[test]
    fn test_rss_without_channel_is_malformed() {
        let err = parse(b"<rss version=\"2.0\"><nothing/></rss>").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { format: "RSS", .. }));
    }

    #[test]
    fn test_rss_mixed_content_keeps_the_item() {
        let xml = r#"<rss><channel>
            <item>
                <title>Breaking: <i>big</i> news</title>
                <link>https://e.com/1</link>
                <description>Hello <b>bold</b> world</description>
            </item>
            <item><title>Plain</title><link>https://e.com/2</link></item>
        </channel></rss>"#;
        let feed = parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title, "Breaking: big news");
        assert_eq!(feed.items[0].description, "Hello <b>bold</b> world");
        assert_eq!(feed.items[1].title, "Plain");
    }

    #[test]
    fn test_rss_inline_markup_keeps_attributes() {
        let xml = r#"<rss><channel><item>
            <link>https://e.com/1</link>
            <description><p>See <a href="https://e.com/?a=1&amp;b=2">this</a></p><br/></description>
        </item></channel></rss>"#;
        let feed = parse(xml.as_bytes()).unwrap();
        assert_eq!(
            feed.items[0].description,
            r#"<p>See <a href="https://e.com/?a=1&amp;b=2">this</a></p><br/>"#
        );
    }

    #[test]
    fn test_html5_entities_resolve() {
        let xml = "<rss><channel><item><title>Caf&eacute; &laquo;menu&raquo;</title>\
                   <link>https://e.com/cafe</link></item></channel></rss>";
        let feed = parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.items[0].title, "Caf\u{e9} \u{ab}menu\u{bb}");
    }

    #[test]
    fn test_unknown_entity_is_replaced() {
        let xml = "<rss><channel><item><title>a &bogus; b</title>\
                   <link>https://e.com/x</link></item></channel></rss>";
        let feed = parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.items[0].title, "a \u{fffd} b");
    }

    #[test]
    fn test_doctype_entities_are_not_expanded() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE rss [<!ENTITY secret "expanded">]>
<rss><channel><item><title>x &secret; y</title><link>https://e.com/d</link></item></channel></rss>"#;
        let feed = parse(xml.as_bytes()).unwrap();
        assert!(!feed.items[0].title.contains("expanded"));
    }

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xml:lang="fr">
    <title>Atom Example</title>
    <subtitle>Things, in Atom</subtitle>
    <link href="https://example.org/feed.atom" rel="self"/>
    <updated>2024-07-12T11:00:00Z</updated>
    <link href="https://example.org/" rel="alternate"/>
    <author><name>Feed Author</name></author>
    <logo>https://example.org/logo.png</logo>
    <entry>
        <title>A</title>
        <link href="http://x/1" rel="alternate"/>
        <summary>s</summary>
    </entry>
    <entry>
        <title type="html">B</title>
        <link href="https://example.org/b/comments" rel="replies"/>
        <link href="https://example.org/b"/>
        <summary type="text">second</summary>
        <content type="html">&lt;p&gt;full&lt;/p&gt;</content>
        <published>2024-07-12T11:00:00Z</published>
        <author><name>Entry Author</name></author>
    </entry>
    <entry>
        <id>https://example.org/c</id>
        <title>C</title>
        <updated>2024-07-13T11:00:00Z</updated>
    </entry>
</feed>"#;

    #[test]
    fn test_atom_feed_metadata() {
        let feed = parse(ATOM.as_bytes()).unwrap();
        assert_eq!(feed.title, "Atom Example");
        assert_eq!(feed.description, "Things, in Atom");
        assert_eq!(feed.link, "https://example.org/");
        assert_eq!(feed.language, "fr");
        assert_eq!(feed.image.url, "https://example.org/logo.png");
        assert_eq!(feed.items.len(), 3);
    }

    #[test]
    fn test_atom_entry_mapping() {
        let feed = parse(ATOM.as_bytes()).unwrap();
        assert_eq!(
            feed.items[0],
            CanonicalEntry {
                title: "A".into(),
                url: "http://x/1".into(),
                description: "s".into(),
                content: String::new(),
                author: "Feed Author".into(),
                published_raw: String::new(),
            }
        );
        assert_eq!(
            feed.items[1],
            CanonicalEntry {
                title: "B".into(),
                url: "https://example.org/b".into(),
                description: "second".into(),
                content: "<p>full</p>".into(),
                author: "Entry Author".into(),
                published_raw: "2024-07-12T11:00:00Z".into(),
            }
        );
        assert_eq!(feed.items[2].url, "https://example.org/c");
        assert_eq!(feed.items[2].published_raw, "2024-07-13T11:00:00Z");
    }

    #[test]
    fn test_atom_xhtml_content_drops_wrapper_div() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <title>X</title>
            <link href="https://e.org/x"/>
            <summary type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml">Short <em>note</em></div></summary>
            <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Hi</p></div></content>
        </entry></feed>"#;
        let feed = parse(xml.as_bytes()).unwrap();
        let entry = &feed.items[0];
        assert_eq!(entry.content, "<p>Hi</p>");
        assert_eq!(entry.description, "Short <em>note</em>");
    }

    #[test]
    fn test_atom_html_content_with_child_elements() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <link href="https://e.org/y"/>
            <content type="html"><div>kept</div></content>
        </entry></feed>"#;
        let feed = parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.items[0].content, "<div>kept</div>");
    }

    #[test]
    fn test_atom_single_entry_example() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><title>A</title><link href="http://x/1" rel="alternate"/><summary>s</summary></entry></feed>"#;
        let feed = parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.items.len(), 1);
        let entry = &feed.items[0];
        assert_eq!(entry.title, "A");
        assert_eq!(entry.url, "http://x/1");
        assert_eq!(entry.description, "s");
    }

    #[test]
    fn test_atom_without_alternate_link_has_empty_link() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
            <title>No alternate</title>
            <link href="https://example.org/feed.atom" rel="self"/>
            <link href="https://example.org/hub" rel="hub"/>
        </feed>"#;
        let feed = parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.link, "");
        assert!(feed.items.is_empty());
    }

    #[test]
    fn test_atom_format_is_detected() {
        let format = FeedFormat::detect(ATOM.as_bytes()).unwrap();
        assert!(matches!(format, FeedFormat::Atom(_)));
        let format = FeedFormat::detect(RSS.as_bytes()).unwrap();
        assert!(matches!(format, FeedFormat::Rss(_)));
    }

    #[test]
    fn test_html_page_is_unrecognized() {
        let err = parse(b"<!DOCTYPE html><html><head><title>Hi</title></head></html>").unwrap_err();
        match err {
            ParseError::UnrecognizedFormat { root, .. } => {
                assert_eq!(root.as_deref(), Some("html"));
            }
            e => panic!("Expected UnrecognizedFormat, got {:?}", e),
        }
    }

    #[test]
    fn test_non_xml_is_unrecognized() {
        let err = parse(b"{\"not\": \"xml\"}").unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedFormat { root: None, .. }));
        assert_eq!(err.snippet(), "{\"not\": \"xml\"}");
    }

    #[test]
    fn test_error_snippet_is_truncated() {
        let payload = "x".repeat(10_000);
        let err = parse(payload.as_bytes()).unwrap_err();
        assert_eq!(err.snippet().chars().count(), SNIPPET_CHARS);
        assert!(err.to_string().len() < 400);
    }

    #[test]
    fn test_error_snippet_respects_char_boundaries() {
        let payload = "日本語".repeat(100);
        let err = parse(payload.as_bytes()).unwrap_err();
        assert_eq!(err.snippet().chars().count(), SNIPPET_CHARS);
    }

    proptest! {
        #[test]
        fn test_parse_never_panics_on_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = parse(&bytes);
        }

        #[test]
        fn test_parse_never_panics_on_xmlish(body in "[a-z<>/=\" &;!\\[\\]]{0,200}") {
            let _ = parse(format!("<rss><channel>{body}</channel></rss>").as_bytes());
            let _ = parse(format!("<feed>{body}</feed>").as_bytes());
        }
    }
}
