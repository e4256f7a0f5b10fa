use crate::{Card, CardId, Deck, RngState};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TABLA_SIDE: usize = 4;
pub const TABLA_SIZE: usize = TABLA_SIDE * TABLA_SIDE;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TablaError {
    #[error("need at least {needed} cards to generate a tabla, deck has {available}")]
    InsufficientCards { available: usize, needed: usize },
}

/// A 4x4 board laid out row-major: index `i` sits at row `i / 4`,
/// column `i % 4`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tabla {
    cells: Vec<Card>,
}

impl Tabla {
    /// Samples 16 distinct deck cards via a uniform shuffle of the whole deck.
    pub fn generate(deck: &Deck, rng: &mut RngState) -> Result<Self, TablaError> {
        if deck.len() < TABLA_SIZE {
            return Err(TablaError::InsufficientCards {
                available: deck.len(),
                needed: TABLA_SIZE,
            });
        }
        let mut pool: Vec<&Card> = deck.iter().collect();
        rng.shuffle(&mut pool);
        let cells: Vec<Card> = pool.into_iter().take(TABLA_SIZE).cloned().collect();
        debug!(
            "generated tabla from {} cards: {:?}",
            deck.len(),
            cells.iter().map(|card| card.number).collect::<Vec<_>>()
        );
        Ok(Self { cells })
    }

    /// Lays out the first 16 cards in the given order.
    pub fn from_ordered(cards: Vec<Card>) -> Result<Self, TablaError> {
        if cards.len() < TABLA_SIZE {
            return Err(TablaError::InsufficientCards {
                available: cards.len(),
                needed: TABLA_SIZE,
            });
        }
        let mut cells = cards;
        cells.truncate(TABLA_SIZE);
        Ok(Self { cells })
    }

    pub fn cells(&self) -> &[Card] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cells.get(index)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Card> {
        if row >= TABLA_SIDE || col >= TABLA_SIDE {
            return None;
        }
        self.cells.get(row * TABLA_SIDE + col)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Card]> {
        self.cells.chunks(TABLA_SIDE)
    }

    /// First index holding `id`.
    pub fn position_of(&self, id: &CardId) -> Option<usize> {
        self.cells.iter().position(|card| &card.id == id)
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.position_of(id).is_some()
    }
}

pub fn grid_position(index: usize) -> (usize, usize) {
    (index / TABLA_SIDE, index % TABLA_SIDE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn numbered_deck(size: usize) -> Deck {
        Deck::from_cards(
            (1..=size)
                .map(|n| Card::new(n as i64, format!("Card {n}"), format!("data:,{n}"), n as u32))
                .collect(),
        )
    }

    #[test]
    fn small_deck_is_rejected() {
        let deck = numbered_deck(15);
        let before = deck.clone();
        let mut rng = RngState::from_seed(1);
        assert_eq!(
            Tabla::generate(&deck, &mut rng),
            Err(TablaError::InsufficientCards {
                available: 15,
                needed: 16
            })
        );
        assert_eq!(deck, before);
    }

    #[test]
    fn exact_deck_uses_every_card() {
        let deck = numbered_deck(16);
        let mut rng = RngState::from_seed(7);
        let tabla = Tabla::generate(&deck, &mut rng).expect("tabla");
        let mut numbers: Vec<u32> = tabla.cells().iter().map(|c| c.number).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=16).collect::<Vec<_>>());
    }

    #[test]
    fn grid_is_row_major() {
        let deck = numbered_deck(20);
        let tabla = Tabla::from_ordered(deck.into_cards()).expect("tabla");
        assert_eq!(tabla.cells().len(), TABLA_SIZE);
        assert_eq!(tabla.cell(0, 3).map(|c| c.number), Some(4));
        assert_eq!(tabla.cell(2, 1).map(|c| c.number), Some(10));
        assert_eq!(tabla.cell(4, 0), None);
        assert_eq!(grid_position(9), (2, 1));
        assert_eq!(tabla.rows().count(), 4);
        assert_eq!(tabla.position_of(&CardId::Int(16)), Some(15));
        assert!(!tabla.contains(&CardId::Int(17)));
    }

    #[test]
    fn same_seed_same_tabla() {
        let deck = numbered_deck(40);
        let a = Tabla::generate(&deck, &mut RngState::from_seed(11)).expect("tabla");
        let b = Tabla::generate(&deck, &mut RngState::from_seed(11)).expect("tabla");
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn tabla_cards_are_distinct_deck_members(seed in any::<u64>(), size in 16usize..80) {
            let deck = numbered_deck(size);
            let mut rng = RngState::from_seed(seed);
            let tabla = Tabla::generate(&deck, &mut rng).expect("tabla");
            prop_assert_eq!(tabla.cells().len(), TABLA_SIZE);
            let ids: HashSet<&CardId> = tabla.cells().iter().map(|c| &c.id).collect();
            prop_assert_eq!(ids.len(), TABLA_SIZE);
            for card in tabla.cells() {
                prop_assert!(deck.contains(&card.id));
            }
        }
    }
}
