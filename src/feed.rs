//! RSS 2.0 feed of the catalog.
//!
//! Every catalog entry that resolves to a file becomes one item whose link
//! and enclosure point at `<url>/books/<name>`, each path component
//! percent-encoded.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tokio::fs;
use tracing::info;

use crate::config::ArchiveConfig;
use crate::library::Archive;

/// Enclosure MIME type for every item
pub const AUDIO_MIME: &str = "audio/mpeg";

/// A single feed item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// File name without extension
    pub title: String,

    /// Absolute URL of the audio file
    pub url: String,

    /// File size in bytes
    pub length: u64,
}

/// Build a URL from the base URL and a path relative to the archive root
pub fn item_url(base_url: &str, relative: &Path) -> String {
    let mut url = base_url.trim_end_matches('/').to_string();

    for component in relative.components() {
        url.push('/');
        url.push_str(&urlencoding::encode(&component.as_os_str().to_string_lossy()));
    }

    url
}

/// Collect feed items for every readable catalog entry
pub async fn collect_items(archive: &Archive) -> Result<Vec<FeedItem>> {
    let root = &archive.paths().root;
    let mut items = Vec::new();

    for entry in archive.catalog().entries().await? {
        let metadata = fs::metadata(&entry.target)
            .await
            .with_context(|| format!("Failed to stat {}", entry.path.display()))?;

        let relative = entry.path.strip_prefix(root).unwrap_or(&entry.path);
        let title = entry
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        items.push(FeedItem {
            title,
            url: item_url(&archive.config().url, relative),
            length: metadata.len(),
        });
    }

    Ok(items)
}

/// Render the feed document
pub fn render_rss(config: &ArchiveConfig, items: &[FeedItem], now: DateTime<Utc>) -> Result<String> {
    let date = now.to_rfc2822();
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("rss").with_attributes([("version", "2.0")]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &config.feed.title)?;
    text_element(&mut writer, "link", &config.url)?;
    text_element(&mut writer, "description", &config.feed.description)?;
    text_element(&mut writer, "pubDate", &date)?;
    text_element(&mut writer, "lastBuildDate", &date)?;

    for item in items {
        let length = item.length.to_string();

        writer.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", &item.title)?;
        text_element(&mut writer, "link", &item.url)?;
        text_element(&mut writer, "guid", &item.url)?;
        writer.write_event(Event::Empty(BytesStart::new("enclosure").with_attributes([
            ("url", item.url.as_str()),
            ("length", length.as_str()),
            ("type", AUDIO_MIME),
        ])))?;
        text_element(&mut writer, "pubDate", &date)?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(writer.into_inner()).context("Feed is not valid UTF-8")
}

/// Render the feed for `archive` and write it to `out`
pub async fn write_rss(archive: &Archive, out: &Path) -> Result<()> {
    let items = collect_items(archive).await?;
    let rss = render_rss(archive.config(), &items, Utc::now())?;

    fs::write(out, rss)
        .await
        .with_context(|| format!("Failed to write feed: {}", out.display()))?;

    info!(path = %out.display(), items = items.len(), "Wrote feed");
    Ok(())
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_item_url_escapes_components() {
        assert_eq!(
            item_url("https://example.com/audio/", Path::new("books/My Book #1.mp3")),
            "https://example.com/audio/books/My%20Book%20%231.mp3"
        );
    }

    #[test]
    fn test_render_rss() {
        let config = ArchiveConfig::new("https://example.com");
        let items = vec![FeedItem {
            title: "Tom & Jerry".to_string(),
            url: "https://example.com/books/Tom%20%26%20Jerry.mp3".to_string(),
            length: 1234,
        }];
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let rss = render_rss(&config, &items, now).unwrap();

        assert!(rss.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(rss.contains("<rss version=\"2.0\">"));
        assert!(rss.contains("<title>Audiobooks</title>"));
        assert!(rss.contains("<description>A list of Audiobooks</description>"));
        assert!(rss.contains("<title>Tom &amp; Jerry</title>"));
        assert!(rss.contains(
            "<enclosure url=\"https://example.com/books/Tom%20%26%20Jerry.mp3\" length=\"1234\" type=\"audio/mpeg\"/>"
        ));
        assert!(rss.contains("2 Jan 2024 03:04:05 +0000</pubDate>"));
    }

    #[test]
    fn test_render_empty_feed() {
        let config = ArchiveConfig::new("https://example.com");
        let rss = render_rss(&config, &[], Utc::now()).unwrap();

        assert!(!rss.contains("<item>"));
        assert!(rss.trim_end().ends_with("</rss>"));
    }
}
