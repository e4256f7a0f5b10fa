use crate::{
    Card, CardId, CardRepository, Deck, RngState, StorageError, StorageProvider, StorageUsage,
};
use log::{error, info};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("card name is empty")]
    EmptyName,
    #[error("a card named {0:?} already exists")]
    DuplicateName(String),
    #[error("no card with id {0}")]
    CardNotFound(CardId),
    #[error("card storage unavailable: {0}")]
    StorageUnavailable(StorageError),
    #[error("failed to persist deck: {0}")]
    PersistenceFailed(StorageError),
}

/// In-memory mirror of a card repository.
///
/// Every mutation writes the whole deck back in one `put_all` call. When
/// the write fails the in-memory deck is restored, so it never drifts
/// from the last state that reached storage.
#[derive(Debug)]
pub struct DeckManager<R> {
    repository: R,
    deck: Deck,
    rng: RngState,
}

impl<R: CardRepository> DeckManager<R> {
    pub async fn load<P>(provider: &P, rng: RngState) -> Result<Self, DeckError>
    where
        P: StorageProvider<Repository = R>,
    {
        let repository = provider.open().await.map_err(DeckError::StorageUnavailable)?;
        let cards = repository
            .get_all()
            .await
            .map_err(DeckError::StorageUnavailable)?;
        info!("loaded {} cards", cards.len());
        Ok(Self {
            repository,
            deck: Deck::from_cards(cards),
            rng,
        })
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub async fn usage(&self) -> Result<StorageUsage, StorageError> {
        self.repository.usage().await
    }

    /// Splits the borrow so callers can draw from the deck with the
    /// manager's RNG.
    pub fn deck_and_rng(&mut self) -> (&Deck, &mut RngState) {
        (&self.deck, &mut self.rng)
    }

    pub async fn add_card(&mut self, name: &str, image: impl Into<String>) -> Result<Card, DeckError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DeckError::EmptyName);
        }
        if self.deck.contains_name(name) {
            return Err(DeckError::DuplicateName(name.to_string()));
        }
        let card = Card {
            id: CardId::generate(&mut self.rng),
            name: name.to_string(),
            image: image.into(),
            number: self.deck.next_number(),
        };
        self.deck.push(card.clone());
        if let Err(err) = self.persist().await {
            self.deck.pop();
            error!("failed to save card {:?}: {err}", card.name);
            return Err(DeckError::PersistenceFailed(err));
        }
        info!("added card {:?} as #{}", card.name, card.number);
        Ok(card)
    }

    pub async fn remove_card(&mut self, id: &CardId) -> Result<Card, DeckError> {
        let removed = self
            .deck
            .get(id)
            .cloned()
            .ok_or_else(|| DeckError::CardNotFound(id.clone()))?;
        let remaining = self
            .deck
            .iter()
            .filter(|card| &card.id != id)
            .cloned()
            .collect();
        self.commit(remaining).await?;
        Ok(removed)
    }

    /// Irreversible. Confirmation is the caller's job.
    pub async fn clear(&mut self) -> Result<(), DeckError> {
        self.commit(Vec::new()).await
    }

    /// Swaps in a whole new collection, keeping card numbers as given.
    pub async fn replace_all(&mut self, cards: Vec<Card>) -> Result<(), DeckError> {
        self.commit(cards).await
    }

    /// Reassigns numbers `1..=n` in deck order.
    pub async fn renumber(&mut self) -> Result<(), DeckError> {
        let cards = self
            .deck
            .iter()
            .zip(1u32..)
            .map(|(card, number)| Card {
                number,
                ..card.clone()
            })
            .collect();
        self.commit(cards).await
    }

    async fn commit(&mut self, cards: Vec<Card>) -> Result<(), DeckError> {
        let previous = self.deck.replace_cards(cards);
        if let Err(err) = self.persist().await {
            self.deck.replace_cards(previous);
            error!("failed to save deck: {err}");
            return Err(DeckError::PersistenceFailed(err));
        }
        info!("saved {} cards", self.deck.len());
        Ok(())
    }

    async fn persist(&self) -> Result<(), StorageError> {
        self.repository.put_all(self.deck.cards()).await
    }
}
