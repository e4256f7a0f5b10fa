//! Deck and tabla logic. Keep this crate free of IO and platform concerns;
//! storage comes in through the `StorageProvider` trait.

pub mod cards;
pub mod deck;
pub mod draw;
pub mod manager;
pub mod reconcile;
pub mod rng;
pub mod storage;
pub mod tabla;
pub mod win;

pub use cards::*;
pub use deck::*;
pub use draw::*;
pub use manager::*;
pub use reconcile::*;
pub use rng::*;
pub use storage::*;
pub use tabla::*;
pub use win::*;
