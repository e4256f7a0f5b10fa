use crate::snapshot::DEFAULT_DECK_NAME;
use crate::kv::DEFAULT_QUOTA_BYTES;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "loteria.json";
pub const HOME_ENV: &str = "LOTERIA_HOME";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    KeyValue,
    #[default]
    Records,
}

impl StorageKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "key_value" | "kv" => Some(Self::KeyValue),
            "records" | "record" => Some(Self::Records),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageKind,
    pub data_dir: PathBuf,
    pub deck_name: String,
    pub quota_bytes: Option<usize>,
    pub cache_dir: PathBuf,
    pub assets: Vec<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::default(),
            data_dir: PathBuf::from("data"),
            deck_name: DEFAULT_DECK_NAME.to_string(),
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
            cache_dir: PathBuf::from("cache"),
            assets: Vec::new(),
        }
    }
}

impl AppConfig {
    fn resolve_paths(mut self, home: &Path) -> Self {
        self.data_dir = home.join(&self.data_dir);
        self.cache_dir = home.join(&self.cache_dir);
        self.assets = self.assets.iter().map(|asset| home.join(asset)).collect();
        self
    }
}

pub fn default_home() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(HOME_ENV) {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".loteria"))
}

/// Reads `<home>/loteria.json` when present. Relative paths in the file
/// resolve against `home`.
pub fn load_config(home: &Path) -> anyhow::Result<AppConfig> {
    let path = home.join(CONFIG_FILE);
    let config = if path.exists() {
        load_json(&path)?
    } else {
        AppConfig::default()
    };
    Ok(config.resolve_paths(home))
}

fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(value)
}
