//! Best-effort offline copies of static assets and of the deck itself.
//! Nothing here may fail a deck operation: failures are logged and
//! reported through return values only.

use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

pub const CACHE_VERSION: &str = "v1.0";
const BACKUP_FILE: &str = "cards-backup.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{0} is not available offline")]
    Unavailable(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmUpReport {
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatus {
    pub caches: Vec<String>,
    pub static_entries: usize,
    pub has_backup: bool,
}

#[derive(Debug, Clone)]
pub struct OfflineCache {
    root: PathBuf,
}

impl OfflineCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn static_dir(&self) -> PathBuf {
        self.root.join(format!("loteria-{CACHE_VERSION}"))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(format!("loteria-data-{CACHE_VERSION}"))
    }

    pub async fn warm_up(&self, assets: &[PathBuf]) -> WarmUpReport {
        let mut report = WarmUpReport::default();
        if let Err(err) = fs::create_dir_all(self.static_dir()).await {
            error!("cache initialization failed: {err}");
            report.failed = assets.iter().map(|p| p.display().to_string()).collect();
            return report;
        }
        for asset in assets {
            let name = asset.display().to_string();
            match self.store_from_source(asset).await {
                Ok(_) => {
                    debug!("cached {name}");
                    report.cached.push(name);
                }
                Err(err) => {
                    warn!("failed to cache {name}: {err}");
                    report.failed.push(name);
                }
            }
        }
        info!(
            "offline cache warm-up: {} cached, {} failed",
            report.cached.len(),
            report.failed.len()
        );
        report
    }

    pub async fn backup(&self, bytes: &[u8]) -> bool {
        match write_entry(&self.data_dir(), Path::new(BACKUP_FILE), bytes).await {
            Ok(()) => {
                debug!("deck backed up to cache ({} bytes)", bytes.len());
                true
            }
            Err(err) => {
                warn!("deck backup failed: {err}");
                false
            }
        }
    }

    pub async fn restore_backup(&self) -> Option<Vec<u8>> {
        match fs::read(self.data_dir().join(BACKUP_FILE)).await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                debug!("no deck backup available: {err}");
                None
            }
        }
    }

    /// Serves the cached copy when there is one, otherwise reads the
    /// source and caches it.
    pub async fn cache_first(&self, source: &Path) -> Result<Vec<u8>, CacheError> {
        if let Some(bytes) = self.cached(source).await {
            debug!("cache hit: {}", source.display());
            return Ok(bytes);
        }
        debug!("cache miss, reading {}", source.display());
        self.store_from_source(source)
            .await
            .map_err(|_| CacheError::Unavailable(source.display().to_string()))
    }

    /// Reads the source and refreshes the cache, falling back to the
    /// cached copy when the source is gone.
    pub async fn network_first(&self, source: &Path) -> Result<Vec<u8>, CacheError> {
        match self.store_from_source(source).await {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                debug!("source failed ({err}), trying cache: {}", source.display());
                self.cached(source)
                    .await
                    .ok_or_else(|| CacheError::Unavailable(source.display().to_string()))
            }
        }
    }

    /// Removes cache directories left behind by other versions.
    pub async fn prune_stale(&self) -> usize {
        let keep = [self.static_dir(), self.data_dir()];
        let mut removed = 0;
        for dir in self.cache_dirs().await {
            if keep.contains(&dir) {
                continue;
            }
            match fs::remove_dir_all(&dir).await {
                Ok(()) => {
                    info!("deleted old cache {}", dir.display());
                    removed += 1;
                }
                Err(err) => warn!("failed to delete old cache {}: {err}", dir.display()),
            }
        }
        removed
    }

    pub async fn clear_all(&self) -> usize {
        let mut removed = 0;
        for dir in self.cache_dirs().await {
            match fs::remove_dir_all(&dir).await {
                Ok(()) => removed += 1,
                Err(err) => error!("cache clearing failed for {}: {err}", dir.display()),
            }
        }
        removed
    }

    pub async fn status(&self) -> CacheStatus {
        let mut caches: Vec<String> = self
            .cache_dirs()
            .await
            .iter()
            .filter_map(|dir| dir.file_name()?.to_str().map(str::to_string))
            .collect();
        caches.sort();
        let mut static_entries = 0;
        if let Ok(mut entries) = fs::read_dir(self.static_dir()).await {
            while let Ok(Some(_)) = entries.next_entry().await {
                static_entries += 1;
            }
        }
        CacheStatus {
            caches,
            static_entries,
            has_backup: fs::metadata(self.data_dir().join(BACKUP_FILE)).await.is_ok(),
        }
    }

    async fn cache_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        let Ok(mut entries) = fs::read_dir(&self.root).await else {
            return dirs;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_cache = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("loteria-"));
            if is_cache && path.is_dir() {
                dirs.push(path);
            }
        }
        dirs
    }

    async fn cached(&self, source: &Path) -> Option<Vec<u8>> {
        fs::read(self.entry_path(source)?).await.ok()
    }

    async fn store_from_source(&self, source: &Path) -> std::io::Result<Vec<u8>> {
        let bytes = fs::read(source).await?;
        if let Some(name) = source.file_name() {
            if let Err(err) = write_entry(&self.static_dir(), Path::new(name), &bytes).await {
                warn!("could not cache {}: {err}", source.display());
            }
        }
        Ok(bytes)
    }

    fn entry_path(&self, source: &Path) -> Option<PathBuf> {
        source.file_name().map(|name| self.static_dir().join(name))
    }
}

async fn write_entry(dir: &Path, name: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::create_dir_all(dir).await?;
    fs::write(dir.join(name), bytes).await
}
