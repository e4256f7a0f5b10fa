//! Deck export and import in the versioned JSON snapshot format.

use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use loteria_core::{reconcile, Card, CardId, Deck, ImportMode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const SNAPSHOT_VERSION: &str = "1.0";
pub const DEFAULT_DECK_NAME: &str = "Custom Lotería Deck";
const IMPORTED_DECK_NAME: &str = "Imported Deck";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSnapshot {
    pub version: String,
    pub deck_name: String,
    pub export_date: String,
    pub card_count: usize,
    pub cards: Vec<Card>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed deck file: {0}")]
    MalformedInput(String),
    #[error("invalid deck file: {0}")]
    InvalidSnapshot(&'static str),
    #[error("no valid cards found in the deck file")]
    NoValidCards,
}

pub fn export_snapshot(deck: &Deck, deck_name: &str) -> DeckSnapshot {
    export_snapshot_at(deck, deck_name, Utc::now())
}

pub fn export_snapshot_at(deck: &Deck, deck_name: &str, at: DateTime<Utc>) -> DeckSnapshot {
    DeckSnapshot {
        version: SNAPSHOT_VERSION.to_string(),
        deck_name: deck_name.to_string(),
        export_date: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        card_count: deck.len(),
        cards: deck.cards().to_vec(),
    }
}

pub fn snapshot_to_json(snapshot: &DeckSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(snapshot)
}

pub fn export_filename(at: DateTime<Utc>) -> String {
    format!("loteria-deck-{}.json", at.format("%Y-%m-%d"))
}

/// A parsed snapshot with unusable cards filtered out. Applying it is a
/// separate step.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSnapshot {
    pub version: String,
    pub deck_name: Option<String>,
    pub export_date: Option<String>,
    pub declared_count: Option<u64>,
    pub cards: Vec<Card>,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPreview {
    pub deck_name: String,
    pub declared_count: usize,
    pub export_date: Option<String>,
    pub valid_cards: usize,
    pub skipped: usize,
    pub current_cards: usize,
}

impl ImportedSnapshot {
    pub fn display_name(&self) -> &str {
        self.deck_name.as_deref().unwrap_or(IMPORTED_DECK_NAME)
    }

    pub fn preview(&self, current: &Deck) -> ImportPreview {
        ImportPreview {
            deck_name: self.display_name().to_string(),
            declared_count: self
                .declared_count
                .map_or(self.cards.len() + self.skipped, |count| count as usize),
            export_date: self.export_date.clone(),
            valid_cards: self.cards.len(),
            skipped: self.skipped,
            current_cards: current.len(),
        }
    }

    pub fn reconcile(&self, current: &Deck, mode: ImportMode) -> Vec<Card> {
        reconcile(current, &self.cards, mode)
    }
}

pub fn import_snapshot(raw: &str) -> Result<ImportedSnapshot, ImportError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| ImportError::MalformedInput(err.to_string()))?;
    let Value::Object(root) = value else {
        return Err(ImportError::MalformedInput(
            "expected a JSON object at the top level".to_string(),
        ));
    };
    let version = match root.get("version") {
        Some(Value::String(text)) if !text.is_empty() => text.clone(),
        Some(Value::Number(number)) if number.as_f64().is_some_and(|n| n != 0.0) => {
            number.to_string()
        }
        _ => return Err(ImportError::InvalidSnapshot("missing version")),
    };
    let Some(Value::Array(entries)) = root.get("cards") else {
        return Err(ImportError::InvalidSnapshot("missing cards list"));
    };
    let cards: Vec<Card> = entries.iter().filter_map(parse_card).collect();
    if cards.is_empty() {
        return Err(ImportError::NoValidCards);
    }
    let skipped = entries.len() - cards.len();
    if skipped > 0 {
        warn!("skipped {skipped} invalid cards during import validation");
    }
    let declared_count = root.get("cardCount").and_then(Value::as_u64);
    if let Some(count) = declared_count {
        if count as usize != entries.len() {
            warn!(
                "snapshot declares {count} cards but lists {}; using the list",
                entries.len()
            );
        }
    }
    Ok(ImportedSnapshot {
        version,
        deck_name: string_field(&root, "deckName"),
        export_date: string_field(&root, "exportDate"),
        declared_count,
        cards,
        skipped,
    })
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn parse_card(entry: &Value) -> Option<Card> {
    let fields = entry.as_object()?;
    let id: CardId = serde_json::from_value(fields.get("id")?.clone()).ok()?;
    if !id.is_present() {
        return None;
    }
    let name = string_field(fields, "name")?;
    let image = string_field(fields, "image")?;
    let number = card_number(fields.get("number")?)?;
    Some(Card {
        id,
        name,
        image,
        number,
    })
}

/// Integers, integral floats (`2.0`) and numeric strings (`"3"`) are card
/// numbers. `null`, fractions and anything outside `u32` have no ordinal
/// to keep, so those cards are skipped.
fn card_number(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(number) => match number.as_u64() {
            Some(n) => n,
            None => integral(number.as_f64()?)?,
        },
        Value::String(text) => integral(text.trim().parse::<f64>().ok()?)?,
        _ => return None,
    };
    u32::try_from(number).ok()
}

fn integral(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then_some(value as u64)
}
