//! Single-key JSON store: the whole deck lives under one key, rewritten on
//! every save, with an optional size quota.

use log::{info, warn};
use loteria_core::{
    duplicate_key, Card, CardRepository, StorageError, StorageProvider, StorageUsage,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const CARDS_KEY: &str = "loteria-cards";
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;
const USAGE_WARN_PERCENT: u32 = 80;

#[derive(Debug, Clone)]
pub struct KeyValueStorage {
    dir: PathBuf,
    quota_bytes: Option<usize>,
}

impl KeyValueStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
        }
    }

    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }
}

impl StorageProvider for KeyValueStorage {
    type Repository = KeyValueRepository;

    async fn open(&self) -> Result<KeyValueRepository, StorageError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| StorageError::Unavailable(format!("{}: {err}", self.dir.display())))?;
        Ok(KeyValueRepository {
            path: self.dir.join(format!("{CARDS_KEY}.json")),
            quota_bytes: self.quota_bytes,
        })
    }
}

#[derive(Debug, Clone)]
pub struct KeyValueRepository {
    path: PathBuf,
    quota_bytes: Option<usize>,
}

impl KeyValueRepository {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The previous value stays in place until the new one is fully on disk.
    async fn write(&self, cards: &[Card]) -> Result<(), StorageError> {
        let body = serde_json::to_string(cards)?;
        if let Some(quota) = self.quota_bytes {
            if body.len() > quota {
                warn!("deck needs {} bytes, quota is {quota}", body.len());
                return Err(StorageError::QuotaExceeded {
                    needed: body.len(),
                    quota,
                });
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        if let Err(err) = fs::write(&tmp, body.as_bytes()).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        fs::rename(&tmp, &self.path).await?;
        let usage = StorageUsage {
            bytes: body.len(),
            quota_bytes: self.quota_bytes,
        };
        match usage.percent() {
            Some(percent) if percent > USAGE_WARN_PERCENT => warn!(
                "storage usage is high: {:.2}MB ({percent}% of quota)",
                usage.megabytes()
            ),
            Some(percent) => info!("storage usage: {:.2}MB ({percent}%)", usage.megabytes()),
            None => info!("storage usage: {:.2}MB", usage.megabytes()),
        }
        Ok(())
    }
}

impl CardRepository for KeyValueRepository {
    async fn get_all(&self) -> Result<Vec<Card>, StorageError> {
        let body = match fs::read_to_string(&self.path).await {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&body)?)
    }

    async fn put_all(&self, cards: &[Card]) -> Result<(), StorageError> {
        self.write(cards).await
    }

    async fn put_one(&self, card: &Card) -> Result<(), StorageError> {
        let mut cards = self.get_all().await?;
        if cards.iter().any(|stored| stored.id == card.id) {
            return Err(duplicate_key(&card.id));
        }
        cards.push(card.clone());
        self.write(&cards).await
    }

    async fn usage(&self) -> Result<StorageUsage, StorageError> {
        let bytes = match fs::metadata(&self.path).await {
            Ok(meta) => meta.len() as usize,
            Err(err) if err.kind() == ErrorKind::NotFound => 0,
            Err(err) => return Err(err.into()),
        };
        Ok(StorageUsage {
            bytes,
            quota_bytes: self.quota_bytes,
        })
    }
}
