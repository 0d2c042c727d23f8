// src/pipeline/archive.rs

use std::path::Path;

use crate::error::Result;
use crate::models::CurrencyPair;
use crate::pipeline::clock::DayKey;
use crate::storage::{ArchiveMetadata, DayArchiver, LocalStorage};

/// Archive one day of samples on demand.
pub async fn run_archive(
    data_root: &Path,
    pair: &CurrencyPair,
    day: &DayKey,
) -> Result<ArchiveMetadata> {
    let storage = LocalStorage::new(data_root.join(pair.as_str()));
    let metadata = storage.archive(day).await?;

    log::info!("Archive location: {}", metadata.location);
    log::info!("Archive timestamp: {}", metadata.timestamp);

    Ok(metadata)
}
