//! Storage abstractions for ticker samples.
//!
//! Samples are appended to one plain-text file per calendar day. Once a day
//! has ended its file is compressed into a sibling archive.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! └── btc_krw/
//!     ├── 2026-10-17                  # Day file (append-only)
//!     ├── 2026-10-17_compressed.zip   # Archive of the ended day
//!     └── 2026-10-18                  # Current day
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::pipeline::DayKey;

// Re-export for convenience
pub use local::LocalStorage;

/// Metadata about an archive operation.
#[derive(Debug, Clone)]
pub struct ArchiveMetadata {
    /// Day that was archived
    pub day: DayKey,
    /// Path of the written archive
    pub location: String,
    /// Number of samples in the day file
    pub sample_count: usize,
    /// Size of the day file in bytes
    pub original_bytes: usize,
    /// Size of the archive in bytes
    pub compressed_bytes: usize,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// Append-only sample persistence.
#[async_trait]
pub trait SampleStorage: Send + Sync {
    /// Append one formatted line to the file of `day`.
    async fn append_line(&self, day: &DayKey, line: &str) -> Result<()>;
}

/// Compression of ended days.
#[async_trait]
pub trait DayArchiver: Send + Sync {
    /// Compress the file of `day`. Archiving the same day twice rewrites the
    /// same artifact.
    async fn archive(&self, day: &DayKey) -> Result<ArchiveMetadata>;
}
