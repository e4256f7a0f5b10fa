//! Persistence seam for decks. Backends live outside this crate; the
//! in-memory provider here backs tests and ephemeral sessions.

use crate::{Card, CardId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("write error: {0}")]
    Write(String),
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("storage io error: {0}")]
    Io(String),
    #[error("card encoding error: {0}")]
    Encoding(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// Bytes held by a store, against its quota when it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    pub bytes: usize,
    pub quota_bytes: Option<usize>,
}

impl StorageUsage {
    pub fn percent(&self) -> Option<u32> {
        self.quota_bytes
            .filter(|quota| *quota > 0)
            .map(|quota| ((self.bytes as f64 / quota as f64) * 100.0).round() as u32)
    }

    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0)
    }
}

/// An opened card store. Writes replace or extend the stored collection;
/// none of them check name uniqueness.
#[allow(async_fn_in_trait)]
pub trait CardRepository {
    async fn get_all(&self) -> Result<Vec<Card>, StorageError>;

    /// Overwrites the whole stored collection.
    async fn put_all(&self, cards: &[Card]) -> Result<(), StorageError>;

    /// Adds one record; fails if a record with the same id exists.
    async fn put_one(&self, card: &Card) -> Result<(), StorageError>;

    async fn usage(&self) -> Result<StorageUsage, StorageError>;
}

#[allow(async_fn_in_trait)]
pub trait StorageProvider {
    type Repository: CardRepository;

    async fn open(&self) -> Result<Self::Repository, StorageError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    cards: Vec<Card>,
    fail_open: bool,
    fail_writes: bool,
    writes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cards(cards: Vec<Card>) -> Self {
        let storage = Self::default();
        storage.lock().cards = cards;
        storage
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn stored(&self) -> Vec<Card> {
        self.lock().cards.clone()
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock_state(&self.state)
    }
}

impl StorageProvider for MemoryStorage {
    type Repository = MemoryRepository;

    async fn open(&self) -> Result<MemoryRepository, StorageError> {
        if self.lock().fail_open {
            return Err(StorageError::Unavailable("memory store closed".to_string()));
        }
        Ok(MemoryRepository {
            state: Arc::clone(&self.state),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl CardRepository for MemoryRepository {
    async fn get_all(&self) -> Result<Vec<Card>, StorageError> {
        Ok(lock_state(&self.state).cards.clone())
    }

    async fn put_all(&self, cards: &[Card]) -> Result<(), StorageError> {
        let mut state = lock_state(&self.state);
        if state.fail_writes {
            return Err(StorageError::Write("memory store rejected write".to_string()));
        }
        state.cards = cards.to_vec();
        state.writes += 1;
        Ok(())
    }

    async fn put_one(&self, card: &Card) -> Result<(), StorageError> {
        let mut state = lock_state(&self.state);
        if state.fail_writes {
            return Err(StorageError::Write("memory store rejected write".to_string()));
        }
        if state.cards.iter().any(|stored| stored.id == card.id) {
            return Err(duplicate_key(&card.id));
        }
        state.cards.push(card.clone());
        state.writes += 1;
        Ok(())
    }

    async fn usage(&self) -> Result<StorageUsage, StorageError> {
        let bytes = serde_json::to_vec(&lock_state(&self.state).cards)?.len();
        Ok(StorageUsage {
            bytes,
            quota_bytes: None,
        })
    }
}

pub fn duplicate_key(id: &CardId) -> StorageError {
    StorageError::Write(format!("record {id} already exists"))
}

fn lock_state(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
