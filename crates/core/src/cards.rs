use crate::RngState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Card identifier as it appears in stored decks and snapshots.
///
/// Decks written by older clients use fractional numeric ids
/// (timestamp plus a random fraction), so numbers keep their JSON type
/// on the way back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl CardId {
    pub fn generate(rng: &mut RngState) -> Self {
        Self::Text(format!("card-{:016x}", rng.next_u64()))
    }

    /// False for ids an importer must treat as missing: empty text, zero, NaN.
    pub fn is_present(&self) -> bool {
        match self {
            Self::Int(value) => *value != 0,
            Self::Float(value) => *value != 0.0 && !value.is_nan(),
            Self::Text(value) => !value.is_empty(),
        }
    }
}

impl PartialEq for CardId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CardId {}

impl Hash for CardId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Int(value) => {
                0u8.hash(state);
                value.hash(state);
            }
            Self::Float(value) => {
                1u8.hash(state);
                value.to_bits().hash(state);
            }
            Self::Text(value) => {
                2u8.hash(state);
                value.hash(state);
            }
        }
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for CardId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for CardId {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    /// Encoded image data, usually a `data:` URI.
    pub image: String,
    pub number: u32,
}

impl Card {
    pub fn new(
        id: impl Into<CardId>,
        name: impl Into<String>,
        image: impl Into<String>,
        number: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: image.into(),
            number,
        }
    }

    pub fn has_name(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }
}

pub fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
