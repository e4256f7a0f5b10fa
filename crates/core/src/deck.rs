use crate::{Card, CardId};
use serde::{Deserialize, Serialize};

/// Ordered card collection. Name uniqueness is enforced by `DeckManager`
/// on add; bulk replacement (append imports) may bypass it.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|card| &card.id == id)
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.get(id).is_some()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.has_name(name))
    }

    pub fn find_by_number(&self, number: u32) -> Option<&Card> {
        self.cards.iter().find(|card| card.number == number)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    pub fn next_number(&self) -> u32 {
        self.cards.len() as u32 + 1
    }

    /// Cards in print order. Stable, so equal numbers keep deck order.
    pub fn sorted_by_number(&self) -> Vec<&Card> {
        let mut sorted: Vec<&Card> = self.cards.iter().collect();
        sorted.sort_by_key(|card| card.number);
        sorted
    }

    pub fn into_cards(self) -> Vec<Card> {
        self.cards
    }

    pub(crate) fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub(crate) fn pop(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub(crate) fn replace_cards(&mut self, cards: Vec<Card>) -> Vec<Card> {
        std::mem::replace(&mut self.cards, cards)
    }
}
