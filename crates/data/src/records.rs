//! One-file-per-card object store. Records are named by their position so
//! a directory listing comes back in deck order. A full save is written to
//! a staging directory and swapped in whole.

use log::{debug, info, warn};
use loteria_core::{
    duplicate_key, Card, CardRepository, StorageError, StorageProvider, StorageUsage,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const RECORDS_DIR: &str = "cards";
const RECORD_EXT: &str = "json";
const STAGING_EXT: &str = "tmp";
const PREVIOUS_EXT: &str = "old";

#[derive(Debug, Clone)]
pub struct RecordStorage {
    dir: PathBuf,
}

impl RecordStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl StorageProvider for RecordStorage {
    type Repository = RecordRepository;

    async fn open(&self) -> Result<RecordRepository, StorageError> {
        let dir = self.dir.join(RECORDS_DIR);
        let unavailable = |err: std::io::Error| {
            StorageError::Unavailable(format!("{}: {err}", dir.display()))
        };
        let previous = dir.with_extension(PREVIOUS_EXT);
        if fs::metadata(&dir).await.is_err() && fs::metadata(&previous).await.is_ok() {
            warn!("recovering record store from {}", previous.display());
            fs::rename(&previous, &dir).await.map_err(unavailable)?;
        }
        fs::create_dir_all(&dir).await.map_err(unavailable)?;
        info!("opened record store at {}", dir.display());
        Ok(RecordRepository { dir })
    }
}

#[derive(Debug, Clone)]
pub struct RecordRepository {
    dir: PathBuf,
}

impl RecordRepository {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn record_paths(&self) -> Result<Vec<(u64, PathBuf)>, StorageError> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(position) = record_position(&path) {
                records.push((position, path));
            }
        }
        records.sort_by_key(|(position, _)| *position);
        Ok(records)
    }

    /// Moves the live directory aside, puts `staging` in its place, then
    /// drops the old copy. A failed first rename leaves the live records as
    /// they were; a failed second rename moves them back.
    async fn swap_in(&self, staging: &Path) -> Result<(), StorageError> {
        let previous = self.dir.with_extension(PREVIOUS_EXT);
        remove_dir_if_present(&previous).await?;
        fs::rename(&self.dir, &previous).await?;
        if let Err(err) = fs::rename(staging, &self.dir).await {
            if let Err(restore) = fs::rename(&previous, &self.dir).await {
                warn!("could not restore {}: {restore}", previous.display());
            }
            return Err(err.into());
        }
        if let Err(err) = fs::remove_dir_all(&previous).await {
            warn!("could not remove {}: {err}", previous.display());
        }
        Ok(())
    }
}

impl CardRepository for RecordRepository {
    async fn get_all(&self) -> Result<Vec<Card>, StorageError> {
        let mut cards = Vec::new();
        for (_, path) in self.record_paths().await? {
            cards.push(read_record(&path).await?);
        }
        Ok(cards)
    }

    async fn put_all(&self, cards: &[Card]) -> Result<(), StorageError> {
        let staging = self.dir.with_extension(STAGING_EXT);
        remove_dir_if_present(&staging).await?;
        fs::create_dir(&staging).await?;
        let mut result = Ok(());
        for (position, card) in cards.iter().enumerate() {
            result = write_record(&staging, position as u64, card).await;
            if result.is_err() {
                break;
            }
        }
        if result.is_ok() {
            result = self.swap_in(&staging).await;
        }
        if let Err(err) = result {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(err);
        }
        info!("saved {} cards to {}", cards.len(), self.dir.display());
        Ok(())
    }

    async fn put_one(&self, card: &Card) -> Result<(), StorageError> {
        let records = self.record_paths().await?;
        for (_, path) in &records {
            if read_record(path).await?.id == card.id {
                return Err(duplicate_key(&card.id));
            }
        }
        let position = records.last().map_or(0, |(position, _)| position + 1);
        write_record(&self.dir, position, card).await?;
        debug!("stored card {:?} at record {position}", card.name);
        Ok(())
    }

    async fn usage(&self) -> Result<StorageUsage, StorageError> {
        let mut bytes = 0;
        for (_, path) in self.record_paths().await? {
            bytes += fs::metadata(&path).await?.len() as usize;
        }
        Ok(StorageUsage {
            bytes,
            quota_bytes: None,
        })
    }
}

async fn read_record(path: &Path) -> Result<Card, StorageError> {
    let body = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&body)?)
}

async fn write_record(dir: &Path, position: u64, card: &Card) -> Result<(), StorageError> {
    let body = serde_json::to_string(card)?;
    fs::write(dir.join(record_name(position)), body).await?;
    Ok(())
}

async fn remove_dir_if_present(path: &Path) -> Result<(), StorageError> {
    match fs::remove_dir_all(path).await {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

fn record_name(position: u64) -> String {
    format!("{position:06}.{RECORD_EXT}")
}

fn record_position(path: &Path) -> Option<u64> {
    if path.extension()? != RECORD_EXT {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}
