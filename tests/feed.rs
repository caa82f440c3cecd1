//! Feed Integration Tests
//!
//! Tests for generating the RSS document from a populated catalog.

#![cfg(unix)]

use podshelf::feed::{collect_items, write_rss};
use podshelf::{Archive, ArchiveConfig};
use tempfile::TempDir;
use tokio::fs;

async fn import(archive: &Archive, name: &str, source_id: &str, content: &[u8]) {
    let workspace = archive.create_workspace().unwrap();
    let file = workspace.path().join(name);
    fs::write(&file, content).await.unwrap();
    archive.import(&file, source_id).await.unwrap();
}

#[tokio::test]
async fn test_feed_lists_catalog_entries() {
    let temp = TempDir::new().unwrap();
    let archive = Archive::init(temp.path(), ArchiveConfig::new("https://example.com/audio")).unwrap();

    import(&archive, "Book One.mp3", "https://example.com/1", b"12345").await;
    import(&archive, "book2.mp3", "https://example.com/2", b"1").await;

    // Broken links are not published
    fs::symlink("../.archive/db/missing.mp3", archive.paths().catalog.join("gone.mp3"))
        .await
        .unwrap();

    let items = collect_items(&archive).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Book One");
    assert_eq!(items[0].url, "https://example.com/audio/books/Book%20One.mp3");
    assert_eq!(items[0].length, 5);
    assert_eq!(items[1].title, "book2");
    assert_eq!(items[1].length, 1);
}

#[tokio::test]
async fn test_write_rss_file() {
    let temp = TempDir::new().unwrap();
    let archive = Archive::init(temp.path(), ArchiveConfig::new("https://example.com/audio")).unwrap();
    import(&archive, "book1.mp3", "test", b"audio").await;

    let out = temp.path().join("feed.xml");
    write_rss(&archive, &out).await.unwrap();

    let rss = fs::read_to_string(&out).await.unwrap();
    assert!(rss.contains("<title>book1</title>"));
    assert!(rss.contains("url=\"https://example.com/audio/books/book1.mp3\""));
    assert!(rss.contains("length=\"5\""));
}
