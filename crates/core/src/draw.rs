use crate::{Card, CardId, Deck, RngState};
use log::debug;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DrawError {
    #[error("all cards have been drawn")]
    DeckExhausted,
}

/// Sequential draw without replacement, independent of any tabla.
#[derive(Debug, Default, Clone)]
pub struct DrawSession {
    drawn: HashSet<CardId>,
    history: VecDeque<Card>,
}

impl DrawSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw_next(&mut self, deck: &Deck, rng: &mut RngState) -> Result<Card, DrawError> {
        let available: Vec<&Card> = deck
            .iter()
            .filter(|card| !self.drawn.contains(&card.id))
            .collect();
        let idx = rng.index(available.len()).ok_or(DrawError::DeckExhausted)?;
        let card = available[idx].clone();
        self.drawn.insert(card.id.clone());
        self.history.push_front(card.clone());
        debug!(
            "drew {:?} (#{}), {} left",
            card.name,
            card.number,
            available.len() - 1
        );
        Ok(card)
    }

    pub fn reset(&mut self) {
        self.drawn.clear();
        self.history.clear();
    }

    /// Most recent first.
    pub fn history(&self) -> impl Iterator<Item = &Card> {
        self.history.iter()
    }

    pub fn current(&self) -> Option<&Card> {
        self.history.front()
    }

    pub fn has_drawn(&self, id: &CardId) -> bool {
        self.drawn.contains(id)
    }

    pub fn drawn_count(&self) -> usize {
        self.drawn.len()
    }

    pub fn remaining(&self, deck: &Deck) -> usize {
        deck.iter()
            .filter(|card| !self.drawn.contains(&card.id))
            .count()
    }

    pub fn is_exhausted(&self, deck: &Deck) -> bool {
        self.remaining(deck) == 0
    }
}
