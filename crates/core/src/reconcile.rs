use crate::{names_match, Card, Deck};
use serde::{Deserialize, Serialize};

/// How imported cards combine with the current deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    #[default]
    Replace,
    /// Skips incoming cards whose name is already taken.
    Merge,
    /// Keeps every incoming card, duplicate names included.
    Append,
}

impl ImportMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "replace" => Some(Self::Replace),
            "merge" => Some(Self::Merge),
            "append" => Some(Self::Append),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Merge => "merge",
            Self::Append => "append",
        }
    }
}

pub fn reconcile(current: &Deck, incoming: &[Card], mode: ImportMode) -> Vec<Card> {
    match mode {
        ImportMode::Replace => incoming.to_vec(),
        ImportMode::Merge => {
            let mut merged = current.cards().to_vec();
            for card in incoming {
                // Checked against the growing result, so repeats inside
                // the import collapse too.
                if !merged.iter().any(|kept| names_match(&kept.name, &card.name)) {
                    merged.push(card.clone());
                }
            }
            merged
        }
        ImportMode::Append => current.iter().chain(incoming).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn current() -> Deck {
        Deck::from_cards(vec![
            Card::new("a", "El Diablito", "data:,a", 1),
            Card::new("b", "La Dama", "data:,b", 2),
        ])
    }

    fn incoming() -> Vec<Card> {
        vec![
            Card::new("x", "la dama", "data:,x", 1),
            Card::new("y", "El Borracho", "data:,y", 2),
            Card::new("z", "EL BORRACHO", "data:,z", 3),
        ]
    }

    fn names(cards: &[Card]) -> Vec<&str> {
        cards.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn replace_takes_import_verbatim() {
        let result = reconcile(&current(), &incoming(), ImportMode::Replace);
        assert_eq!(result, incoming());
    }

    #[test]
    fn merge_skips_name_collisions() {
        let result = reconcile(&current(), &incoming(), ImportMode::Merge);
        assert_eq!(names(&result), vec!["El Diablito", "La Dama", "El Borracho"]);
        assert_eq!(result[2].number, 2);
    }

    #[test]
    fn append_keeps_duplicates() {
        let result = reconcile(&current(), &incoming(), ImportMode::Append);
        assert_eq!(result.len(), 5);
        assert_eq!(
            names(&result),
            vec!["El Diablito", "La Dama", "la dama", "El Borracho", "EL BORRACHO"]
        );
    }

    #[test]
    fn mode_names() {
        assert_eq!(ImportMode::parse(" Merge "), Some(ImportMode::Merge));
        assert_eq!(ImportMode::parse("append"), Some(ImportMode::Append));
        assert_eq!(ImportMode::parse("overwrite"), None);
        assert_eq!(ImportMode::default().as_str(), "replace");
    }

    proptest! {
        #[test]
        fn merge_never_introduces_duplicate_names(names in proptest::collection::vec("[a-cA-C]{1,2}", 0..12)) {
            let incoming: Vec<Card> = names
                .iter()
                .enumerate()
                .map(|(i, name)| Card::new(i as i64 + 1, name.clone(), "data:,", i as u32 + 1))
                .collect();
            let result = reconcile(&Deck::new(), &incoming, ImportMode::Merge);
            let lowered: HashSet<String> = result.iter().map(|c| c.name.to_lowercase()).collect();
            prop_assert_eq!(lowered.len(), result.len());
        }
    }
}
