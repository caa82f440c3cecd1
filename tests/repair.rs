//! Catalog Repair Integration Tests
//!
//! Tests for detecting, relinking and removing broken catalog links.

#![cfg(unix)]

use podshelf::{Archive, ArchiveConfig};
use tempfile::TempDir;
use tokio::fs;

const TEST_STORE_FILE: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08.mp3";

async fn archive_with_book(temp: &TempDir) -> Archive {
    let archive =
        Archive::init(temp.path(), ArchiveConfig::new("https://example.com/books")).unwrap();

    let workspace = archive.create_workspace().unwrap();
    let file = workspace.path().join("book1.mp3");
    fs::write(&file, b"audio").await.unwrap();
    archive.import(&file, "test").await.unwrap();

    archive
}

#[tokio::test]
async fn test_healthy_catalog_needs_no_repair() {
    let temp = TempDir::new().unwrap();
    let archive = archive_with_book(&temp).await;

    let report = archive.catalog().scan_and_repair().await.unwrap();

    assert_eq!(report.checked, 1);
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_stale_link_is_repointed_at_store() {
    let temp = TempDir::new().unwrap();
    let archive = archive_with_book(&temp).await;
    let link = archive.paths().catalog.join("book1.mp3");

    // Simulate a catalog that was moved relative to the store
    fs::remove_file(&link).await.unwrap();
    fs::symlink(format!("../old-location/db/{}", TEST_STORE_FILE), &link)
        .await
        .unwrap();
    assert!(fs::metadata(&link).await.is_err());

    let report = archive.catalog().scan_and_repair().await.unwrap();

    assert_eq!(report.repaired, vec![link.clone()]);
    assert!(report.unrepairable.is_empty());
    assert_eq!(fs::read(&link).await.unwrap(), b"audio");
    assert_eq!(
        fs::read_link(&link).await.unwrap(),
        std::path::Path::new("../.archive/db").join(TEST_STORE_FILE)
    );
}

#[tokio::test]
async fn test_link_with_missing_store_file_is_removed() {
    let temp = TempDir::new().unwrap();
    let archive = archive_with_book(&temp).await;
    let link = archive.paths().catalog.join("book1.mp3");

    fs::remove_file(archive.store().resolve("test")).await.unwrap();

    let report = archive.catalog().scan_and_repair().await.unwrap();

    assert!(report.repaired.is_empty());
    assert_eq!(report.unrepairable, vec![link.clone()]);
    assert!(fs::symlink_metadata(&link).await.is_err());
}

#[tokio::test]
async fn test_nested_links_are_repaired_relative_to_their_directory() {
    let temp = TempDir::new().unwrap();
    let archive = archive_with_book(&temp).await;

    let series = archive.paths().catalog.join("series");
    fs::create_dir(&series).await.unwrap();
    let nested = series.join("part1.mp3");
    fs::symlink(format!("../gone/{}", TEST_STORE_FILE), &nested)
        .await
        .unwrap();

    let report = archive.catalog().scan_and_repair().await.unwrap();

    assert_eq!(report.checked, 2);
    assert_eq!(report.repaired, vec![nested.clone()]);
    assert_eq!(
        fs::read_link(&nested).await.unwrap(),
        std::path::Path::new("../../.archive/db").join(TEST_STORE_FILE)
    );
    assert_eq!(fs::read(&nested).await.unwrap(), b"audio");
}

#[tokio::test]
async fn test_repair_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let archive = archive_with_book(&temp).await;
    let catalog = &archive.paths().catalog;

    fs::symlink(format!("../elsewhere/{}", TEST_STORE_FILE), catalog.join("moved.mp3"))
        .await
        .unwrap();
    fs::symlink("../elsewhere/unknown.mp3", catalog.join("lost.mp3"))
        .await
        .unwrap();

    let first = archive.catalog().scan_and_repair().await.unwrap();
    assert_eq!(first.repaired.len(), 1);
    assert_eq!(first.unrepairable.len(), 1);

    let second = archive.catalog().scan_and_repair().await.unwrap();
    assert!(second.is_empty());
    assert_eq!(second.checked, 2);
}

#[tokio::test]
async fn test_regular_files_in_catalog_are_left_alone() {
    let temp = TempDir::new().unwrap();
    let archive = archive_with_book(&temp).await;
    let plain = archive.paths().catalog.join("notes.txt");
    fs::write(&plain, b"hand-written").await.unwrap();

    let report = archive.catalog().scan_and_repair().await.unwrap();

    assert_eq!(report.checked, 1);
    assert!(report.is_empty());
    assert!(plain.is_file());
}
