use crate::render;
use loteria_core::{ActiveTabla, Deck, DrawSession, RngState, WinLine};
use std::io::{self, Write};

pub trait Input {
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

pub struct StdinInput;

impl Input for StdinInput {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = io::stdout().flush();
        let mut line = String::new();
        if io::stdin().read_line(&mut line).ok()? == 0 {
            return None;
        }
        Some(line.trim_end_matches(&['\n', '\r'][..]).to_string())
    }
}

pub fn confirm(input: &mut impl Input, question: &str) -> bool {
    input
        .read_line(&format!("{question} [y/N] "))
        .is_some_and(|answer| matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

const DRAW_HELP: &str = "Enter/d: draw  h: history  s: status  r: reset  q: quit";
const PLAY_HELP: &str = "0-15 or card name: mark/unmark  n: new tabla  q: quit";

pub fn run_draw(
    deck: &Deck,
    rng: &mut RngState,
    input: &mut impl Input,
    out: &mut impl Write,
) -> io::Result<DrawSession> {
    let mut session = DrawSession::new();
    if deck.is_empty() {
        writeln!(out, "No cards available to draw. Add some cards first.")?;
        return Ok(session);
    }
    writeln!(out, "{DRAW_HELP}")?;
    writeln!(out, "{}", render::draw_status(&session, deck))?;
    while let Some(line) = input.read_line("draw> ") {
        match line.trim() {
            "" | "d" | "draw" => match session.draw_next(deck, rng) {
                Ok(card) => {
                    writeln!(out, "{}", render::drawn_card(&card))?;
                    writeln!(out, "{}", render::draw_status(&session, deck))?;
                }
                Err(err) => writeln!(out, "{err}. Type `r` to start a new game.")?,
            },
            "h" | "history" => write!(out, "{}", render::draw_history(&session))?,
            "s" | "status" => writeln!(out, "{}", render::draw_status(&session, deck))?,
            "r" | "reset" => {
                if confirm(input, "Reset the game? Drawn cards go back into the deck.") {
                    session.reset();
                    writeln!(out, "{}", render::draw_status(&session, deck))?;
                }
            }
            "q" | "quit" | "exit" => break,
            "?" | "help" => writeln!(out, "{DRAW_HELP}")?,
            other => writeln!(out, "unknown command {other:?}; {DRAW_HELP}")?,
        }
    }
    Ok(session)
}

pub fn run_play(
    deck: &Deck,
    rng: &mut RngState,
    input: &mut impl Input,
    out: &mut impl Write,
) -> anyhow::Result<ActiveTabla> {
    let mut active = ActiveTabla::generate(deck, rng)?;
    writeln!(out, "{PLAY_HELP}")?;
    write!(out, "{}", board(&active))?;
    while let Some(line) = input.read_line("play> ") {
        let command = line.trim();
        let outcome = match command {
            "" => continue,
            "q" | "quit" | "exit" => break,
            "?" | "help" => {
                writeln!(out, "{PLAY_HELP}")?;
                continue;
            }
            "n" | "new" => {
                active.regenerate(deck, rng)?;
                write!(out, "{}", board(&active))?;
                continue;
            }
            _ => match command.parse::<usize>() {
                Ok(index) => active.toggle_cell(index),
                Err(_) => match active.tabla().cells().iter().find(|card| card.has_name(command)) {
                    Some(card) => {
                        let id = card.id.clone();
                        active.toggle(&id)
                    }
                    None => {
                        writeln!(out, "{command:?} is not on this tabla")?;
                        continue;
                    }
                },
            },
        };
        match outcome {
            Ok(win) => {
                write!(out, "{}", board(&active))?;
                if let Some(line) = win {
                    writeln!(out, "{}", announce(line))?;
                }
            }
            Err(err) => writeln!(out, "{err}")?,
        }
    }
    Ok(active)
}

fn board(active: &ActiveTabla) -> String {
    let title = format!("Tabla ({} marked)", active.marked().len());
    render::tabla_grid(active.tabla(), Some(active.marked()), &title)
}

fn announce(line: WinLine) -> String {
    format!("¡LOTERÍA! {line} complete")
}

#[cfg(test)]
mod tests {
    use super::*;
    use loteria_core::{Card, TABLA_SIZE};
    use std::collections::VecDeque;

    impl Input for VecDeque<String> {
        fn read_line(&mut self, _prompt: &str) -> Option<String> {
            self.pop_front()
        }
    }

    fn numbered_deck(size: usize) -> Deck {
        Deck::from_cards(
            (1..=size)
                .map(|n| Card::new(n as i64, format!("Card {n}"), format!("data:,{n}"), n as u32))
                .collect(),
        )
    }

    fn script(lines: &[&str]) -> VecDeque<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn draws_until_exhausted() {
        let deck = numbered_deck(3);
        let mut rng = RngState::from_seed(5);
        let mut input = script(&["", "d", "draw", "", "h"]);
        let mut out = Vec::new();
        let session = run_draw(&deck, &mut rng, &mut input, &mut out).expect("draw");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(session.drawn_count(), 3);
        assert!(session.is_exhausted(&deck));
        assert!(text.contains("All Cards Drawn"));
        assert!(text.contains("start a new game"));
    }

    #[test]
    fn reset_needs_confirmation() {
        let deck = numbered_deck(3);
        let mut rng = RngState::from_seed(5);
        let mut input = script(&["d", "r", "n", "d"]);
        let session = run_draw(&deck, &mut rng, &mut input, &mut Vec::new()).expect("draw");
        assert_eq!(session.drawn_count(), 2);

        let mut input = script(&["d", "r", "yes"]);
        let session = run_draw(&deck, &mut rng, &mut input, &mut Vec::new()).expect("draw");
        assert_eq!(session.drawn_count(), 0);
    }

    #[test]
    fn empty_deck_draw_is_refused() {
        let mut input = script(&["d"]);
        let mut out = Vec::new();
        let session =
            run_draw(&Deck::new(), &mut RngState::from_seed(1), &mut input, &mut out).expect("draw");
        assert_eq!(session.drawn_count(), 0);
        assert!(String::from_utf8(out).expect("utf8").starts_with("No cards available"));
    }

    #[test]
    fn marking_a_row_announces_a_win() {
        let deck = numbered_deck(TABLA_SIZE);
        let mut rng = RngState::from_seed(9);
        let mut input = script(&["4", "5", "6", "7", "q"]);
        let mut out = Vec::new();
        let active = run_play(&deck, &mut rng, &mut input, &mut out).expect("play");
        assert_eq!(active.check(), Some(WinLine::Row));
        assert!(String::from_utf8(out).expect("utf8").contains("¡LOTERÍA! Row complete"));
    }

    #[test]
    fn marks_by_name_and_reports_misses() {
        let deck = numbered_deck(TABLA_SIZE);
        let mut rng = RngState::from_seed(2);
        let mut input = script(&["card 3", "Missing", "99"]);
        let mut out = Vec::new();
        let active = run_play(&deck, &mut rng, &mut input, &mut out).expect("play");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(active.marked().len(), 1);
        assert!(active.marked().contains(&loteria_core::CardId::Int(3)));
        assert!(text.contains("\"Missing\" is not on this tabla"));
        assert!(text.contains("99"));
    }

    #[test]
    fn new_tabla_clears_marks() {
        let deck = numbered_deck(20);
        let mut rng = RngState::from_seed(4);
        let mut input = script(&["0", "1", "n"]);
        let active = run_play(&deck, &mut rng, &mut input, &mut Vec::new()).expect("play");
        assert!(active.marked().is_empty());
    }

    #[test]
    fn small_deck_cannot_play() {
        let deck = numbered_deck(15);
        let mut input = script(&[]);
        let err = run_play(&deck, &mut RngState::from_seed(1), &mut input, &mut Vec::new())
            .expect_err("too few cards");
        assert!(err.to_string().contains("16"));
    }
}
