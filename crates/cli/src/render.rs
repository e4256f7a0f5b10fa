use loteria_core::{Card, Deck, DrawSession, MarkedCells, StorageUsage, Tabla, TABLA_SIDE};
use loteria_data::{CacheStatus, ImportPreview};
use std::fmt::Write;

const CELL_WIDTH: usize = 18;

pub fn deck_list(deck: &Deck) -> String {
    if deck.is_empty() {
        return "No cards in deck. Add some images to get started!\n".to_string();
    }
    let mut out = String::new();
    for card in deck.iter() {
        let _ = writeln!(out, "#{:<4} {:<30} {}", card.number, card.name, card.id);
    }
    let _ = writeln!(out, "{} cards", deck.len());
    out
}

/// Printable sheet of every card, in number order.
pub fn card_sheet(deck: &Deck) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "LOTERÍA - {} cards", deck.len());
    let _ = writeln!(out, "{}", "=".repeat(40));
    for card in deck.sorted_by_number() {
        let _ = writeln!(out, "#{:<4} {}", card.number, card.name);
    }
    out
}

pub fn tabla_grid(tabla: &Tabla, marked: Option<&MarkedCells>, title: &str) -> String {
    let border = format!(
        "+{}\n",
        format!("{}+", "-".repeat(CELL_WIDTH)).repeat(TABLA_SIDE)
    );
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    out.push_str(&border);
    for (row, cards) in tabla.rows().enumerate() {
        let mut names = String::from("|");
        let mut numbers = String::from("|");
        for (col, card) in cards.iter().enumerate() {
            let index = row * TABLA_SIDE + col;
            let is_marked = marked.is_some_and(|m| m.contains(&card.id));
            let tag = if is_marked { "[X]" } else { "" };
            names.push_str(&pad(&truncate(&card.name, CELL_WIDTH - 1)));
            names.push('|');
            numbers.push_str(&pad(&format!("{index:>2}: #{} {tag}", card.number)));
            numbers.push('|');
        }
        let _ = writeln!(out, "{names}");
        let _ = writeln!(out, "{numbers}");
        out.push_str(&border);
    }
    out
}

pub fn drawn_card(card: &Card) -> String {
    format!(">>> #{} {} <<<", card.number, card.name.to_uppercase())
}

pub fn draw_status(session: &DrawSession, deck: &Deck) -> String {
    let remaining = session.remaining(deck);
    if remaining == 0 {
        return format!("All Cards Drawn ({} drawn)", session.drawn_count());
    }
    format!(
        "Drawn: {}  Remaining: {}",
        session.drawn_count(),
        remaining
    )
}

pub fn draw_history(session: &DrawSession) -> String {
    let mut out = String::new();
    for (i, card) in session.history().enumerate() {
        let _ = writeln!(out, "{:>3}. #{} {}", i + 1, card.number, card.name);
    }
    if out.is_empty() {
        out.push_str("No cards drawn yet.\n");
    }
    out
}

pub fn import_preview(preview: &ImportPreview) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", preview.deck_name);
    let _ = writeln!(out, "  Cards:        {}", preview.declared_count);
    if let Some(date) = &preview.export_date {
        let _ = writeln!(out, "  Export date:  {date}");
    }
    let _ = writeln!(out, "  Valid cards:  {}", preview.valid_cards);
    if preview.skipped > 0 {
        let _ = writeln!(out, "  Skipped:      {}", preview.skipped);
    }
    let _ = writeln!(out, "  Current deck: {} cards", preview.current_cards);
    out
}

pub fn storage_usage(usage: &StorageUsage) -> String {
    match usage.percent() {
        Some(percent) => format!("{:.2}MB ({percent}% of quota)", usage.megabytes()),
        None => format!("{:.2}MB", usage.megabytes()),
    }
}

pub fn cache_status(status: &CacheStatus) -> String {
    let mut out = String::new();
    if status.caches.is_empty() {
        out.push_str("No caches yet.\n");
    } else {
        let _ = writeln!(out, "{} caches ready: {}", status.caches.len(), status.caches.join(", "));
    }
    let _ = writeln!(out, "Cached assets: {}", status.static_entries);
    let _ = writeln!(
        out,
        "Deck backup:   {}",
        if status.has_backup { "yes" } else { "no" }
    );
    out
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

fn pad(text: &str) -> String {
    let len = text.chars().count();
    format!(" {text}{}", " ".repeat(CELL_WIDTH.saturating_sub(len + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use loteria_core::{CardId, RngState};

    fn numbered_deck(size: usize) -> Deck {
        Deck::from_cards(
            (1..=size)
                .map(|n| Card::new(n as i64, format!("Card {n}"), format!("data:,{n}"), n as u32))
                .collect(),
        )
    }

    #[test]
    fn empty_deck_message() {
        assert!(deck_list(&Deck::new()).starts_with("No cards in deck"));
    }

    #[test]
    fn sheet_is_sorted_by_number() {
        let deck = Deck::from_cards(vec![
            Card::new("b", "La Dama", "data:,", 2),
            Card::new("a", "El Gallo", "data:,", 1),
        ]);
        let sheet = card_sheet(&deck);
        let gallo = sheet.find("El Gallo").expect("gallo");
        let dama = sheet.find("La Dama").expect("dama");
        assert!(gallo < dama);
    }

    #[test]
    fn grid_lines_have_equal_width() {
        let mut deck_cards = numbered_deck(16).into_cards();
        deck_cards[0].name = "El Valiente de la Sierra Madre".to_string();
        let tabla = Tabla::from_ordered(deck_cards).expect("tabla");
        let marked: MarkedCells = [CardId::Int(1)].into_iter().collect();
        let grid = tabla_grid(&tabla, Some(&marked), "Tabla 1");
        let lines: Vec<&str> = grid.lines().skip(1).collect();
        assert_eq!(lines.len(), 13);
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|line| line.chars().count() == width));
        assert!(grid.contains("[X]"));
        assert!(grid.contains('~'));
        assert!(grid.contains("15: #16"));
    }

    #[test]
    fn draw_views() {
        let deck = numbered_deck(2);
        let mut session = DrawSession::new();
        let mut rng = RngState::from_seed(1);
        assert_eq!(draw_history(&session), "No cards drawn yet.\n");
        assert_eq!(draw_status(&session, &deck), "Drawn: 0  Remaining: 2");
        session.draw_next(&deck, &mut rng).expect("draw");
        session.draw_next(&deck, &mut rng).expect("draw");
        assert_eq!(draw_status(&session, &deck), "All Cards Drawn (2 drawn)");
        assert_eq!(draw_history(&session).lines().count(), 2);
        assert_eq!(drawn_card(&deck.cards()[0]), ">>> #1 CARD 1 <<<");
    }
}
