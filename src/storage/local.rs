//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── YYYY-MM-DD                  # One sample per line
//! └── YYYY-MM-DD_compressed.zip   # Deflated copy of an ended day
//! ```

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{AppError, Result};
use crate::pipeline::DayKey;
use crate::storage::{ArchiveMetadata, DayArchiver, SampleStorage};

const ARCHIVE_SUFFIX: &str = "_compressed.zip";

/// Local filesystem storage backend for one currency pair.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

/// Files found in a storage directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    /// Day files, oldest first
    pub days: Vec<String>,
    /// Archives, oldest first
    pub archives: Vec<String>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    fn day_key(day: &DayKey) -> String {
        day.to_string()
    }

    fn archive_key(day: &DayKey) -> String {
        format!("{day}{ARCHIVE_SUFFIX}")
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// List day files and archives present in the directory.
    pub async fn inventory(&self) -> Result<Inventory> {
        let mut inventory = Inventory::default();
        let mut entries = match tokio::fs::read_dir(&self.root_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(inventory),
            Err(e) => return Err(AppError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(day) = name.strip_suffix(ARCHIVE_SUFFIX) {
                if DayKey::parse(day).is_some() {
                    inventory.archives.push(name);
                }
            } else if DayKey::parse(&name).is_some() {
                inventory.days.push(name);
            }
        }

        inventory.days.sort();
        inventory.archives.sort();
        Ok(inventory)
    }
}

/// Deflate `data` into a single-entry zip held in memory.
///
/// The entry timestamp is fixed so the same input always yields the same bytes.
fn compress(entry_name: &str, data: &[u8]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    zip.start_file(entry_name, options)?;
    zip.write_all(data)?;
    Ok(zip.finish()?.into_inner())
}

#[async_trait]
impl SampleStorage for LocalStorage {
    async fn append_line(&self, day: &DayKey, line: &str) -> Result<()> {
        let path = self.path(&Self::day_key(day));
        self.ensure_dir(&path).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl DayArchiver for LocalStorage {
    async fn archive(&self, day: &DayKey) -> Result<ArchiveMetadata> {
        let source_key = Self::day_key(day);
        let data = self.read_bytes(&source_key).await?.ok_or_else(|| {
            AppError::archive(
                day,
                format!("no day file at {}", self.path(&source_key).display()),
            )
        })?;

        let original_bytes = data.len();
        let sample_count = data.iter().filter(|b| **b == b'\n').count();

        let entry_name = source_key.clone();
        let compressed = tokio::task::spawn_blocking(move || compress(&entry_name, &data))
            .await
            .map_err(|e| AppError::archive(day, e))??;

        let archive_key = Self::archive_key(day);
        self.write_bytes(&archive_key, &compressed).await?;

        log::info!(
            "Archived {} ({} samples, {} -> {} bytes)",
            day,
            sample_count,
            original_bytes,
            compressed.len()
        );

        Ok(ArchiveMetadata {
            day: *day,
            location: self.path(&archive_key).display().to_string(),
            sample_count,
            original_bytes,
            compressed_bytes: compressed.len(),
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn day(s: &str) -> DayKey {
        DayKey::parse(s).unwrap()
    }

    fn unzip(bytes: &[u8]) -> (String, String) {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_index(0).unwrap();
        let name = entry.name().to_string();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        (name, content)
    }

    #[tokio::test]
    async fn test_append_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("btc_krw"));
        let d = day("2026-10-17");

        storage.append_line(&d, "first\n").await.unwrap();
        storage.append_line(&d, "second\n").await.unwrap();

        let data = storage.read_bytes("2026-10-17").await.unwrap().unwrap();
        assert_eq!(data, b"first\nsecond\n".to_vec());
    }

    #[tokio::test]
    async fn test_archive_round_trips_day_file() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let d = day("2026-10-17");

        storage.append_line(&d, "a\n").await.unwrap();
        storage.append_line(&d, "b\n").await.unwrap();

        let metadata = storage.archive(&d).await.unwrap();
        assert_eq!(metadata.day, d);
        assert_eq!(metadata.sample_count, 2);
        assert_eq!(metadata.original_bytes, 4);
        assert!(metadata.location.ends_with("2026-10-17_compressed.zip"));

        let bytes = storage
            .read_bytes("2026-10-17_compressed.zip")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unzip(&bytes), ("2026-10-17".to_string(), "a\nb\n".to_string()));

        // Source day file is left in place.
        assert!(storage.read_bytes("2026-10-17").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_archive_twice_is_identical() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let d = day("2026-10-17");
        storage.append_line(&d, "sample\n").await.unwrap();

        storage.archive(&d).await.unwrap();
        let first = storage.read_bytes("2026-10-17_compressed.zip").await.unwrap();
        storage.archive(&d).await.unwrap();
        let second = storage.read_bytes("2026-10-17_compressed.zip").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_archive_missing_day_fails() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let err = storage.archive(&day("2026-01-01")).await.unwrap_err();
        assert!(matches!(err, AppError::Archive { .. }));
    }

    #[tokio::test]
    async fn test_inventory() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert_eq!(storage.inventory().await.unwrap(), Inventory::default());

        storage.append_line(&day("2026-10-18"), "x\n").await.unwrap();
        storage.append_line(&day("2026-10-17"), "y\n").await.unwrap();
        storage.archive(&day("2026-10-17")).await.unwrap();
        storage.write_bytes("notes.txt", b"ignored").await.unwrap();

        let inventory = storage.inventory().await.unwrap();
        assert_eq!(inventory.days, vec!["2026-10-17", "2026-10-18"]);
        assert_eq!(inventory.archives, vec!["2026-10-17_compressed.zip"]);
    }
}
