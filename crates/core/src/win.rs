use crate::{CardId, Deck, RngState, Tabla, TablaError, TABLA_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinLine {
    Row,
    Column,
    Diagonal,
}

impl WinLine {
    pub fn label(self) -> &'static str {
        match self {
            Self::Row => "Row",
            Self::Column => "Column",
            Self::Diagonal => "Diagonal",
        }
    }
}

impl fmt::Display for WinLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Checked in order; the first complete line wins.
pub const WIN_PATTERNS: [(WinLine, [usize; 4]); 10] = [
    (WinLine::Row, [0, 1, 2, 3]),
    (WinLine::Row, [4, 5, 6, 7]),
    (WinLine::Row, [8, 9, 10, 11]),
    (WinLine::Row, [12, 13, 14, 15]),
    (WinLine::Column, [0, 4, 8, 12]),
    (WinLine::Column, [1, 5, 9, 13]),
    (WinLine::Column, [2, 6, 10, 14]),
    (WinLine::Column, [3, 7, 11, 15]),
    (WinLine::Diagonal, [0, 5, 10, 15]),
    (WinLine::Diagonal, [3, 6, 9, 12]),
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WinError {
    #[error("card {0} is not on the current tabla")]
    CardNotOnTabla(CardId),
    #[error("cell {0} is outside the tabla")]
    CellOutOfRange(usize),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarkedCells {
    ids: HashSet<CardId>,
}

impl MarkedCells {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the card is marked after the toggle.
    pub fn toggle(&mut self, tabla: &Tabla, id: &CardId) -> Result<bool, WinError> {
        if !tabla.contains(id) {
            return Err(WinError::CardNotOnTabla(id.clone()));
        }
        if self.ids.remove(id) {
            return Ok(false);
        }
        self.ids.insert(id.clone());
        Ok(true)
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardId> {
        self.ids.iter()
    }
}

impl FromIterator<CardId> for MarkedCells {
    fn from_iter<T: IntoIterator<Item = CardId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

pub fn check_win(tabla: &Tabla, marked: &MarkedCells) -> Option<WinLine> {
    if marked.len() < 4 {
        return None;
    }
    let mut covered = [false; TABLA_SIZE];
    for pos in marked.iter().filter_map(|id| tabla.position_of(id)) {
        covered[pos] = true;
    }
    WIN_PATTERNS
        .iter()
        .find(|(_, cells)| cells.iter().all(|&idx| covered[idx]))
        .map(|(line, _)| *line)
}

/// A tabla being played, with the cells marked so far.
#[derive(Debug, Clone)]
pub struct ActiveTabla {
    tabla: Tabla,
    marked: MarkedCells,
}

impl ActiveTabla {
    pub fn new(tabla: Tabla) -> Self {
        Self {
            tabla,
            marked: MarkedCells::new(),
        }
    }

    pub fn generate(deck: &Deck, rng: &mut RngState) -> Result<Self, TablaError> {
        Tabla::generate(deck, rng).map(Self::new)
    }

    /// Replaces the board and clears every mark.
    pub fn regenerate(&mut self, deck: &Deck, rng: &mut RngState) -> Result<(), TablaError> {
        self.tabla = Tabla::generate(deck, rng)?;
        self.marked.clear();
        Ok(())
    }

    pub fn tabla(&self) -> &Tabla {
        &self.tabla
    }

    pub fn marked(&self) -> &MarkedCells {
        &self.marked
    }

    pub fn is_marked(&self, index: usize) -> bool {
        self.tabla
            .get(index)
            .is_some_and(|card| self.marked.contains(&card.id))
    }

    pub fn toggle(&mut self, id: &CardId) -> Result<Option<WinLine>, WinError> {
        self.marked.toggle(&self.tabla, id)?;
        Ok(self.check())
    }

    pub fn toggle_cell(&mut self, index: usize) -> Result<Option<WinLine>, WinError> {
        let id = self
            .tabla
            .get(index)
            .map(|card| card.id.clone())
            .ok_or(WinError::CellOutOfRange(index))?;
        self.toggle(&id)
    }

    pub fn check(&self) -> Option<WinLine> {
        check_win(&self.tabla, &self.marked)
    }
}
