//! Interactive view of all tokens, refreshed every second.

use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result};
use arboard::Clipboard;
use crossbeam_channel::select;
use crossterm::event::KeyCode;
use keyfob_core::Token;
use keyfob_gen::Codes;
use keyfob_store::{Backend, TokenStore};
use tracing::warn;
use tui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::{
    terminal,
    widgets::{Dialog, HelpDialog, List, ListState, ScrollBar},
};

enum Showing {
    None,
    Help,
    Codes(Codes),
    ConfirmDelete,
}

pub fn run<B: Backend>(store: &mut TokenStore<B>) -> Result<()> {
    let mut tokens = load(store);

    let mut terminal = terminal::create()?;
    let events = terminal::create_event_listener();
    let ticker = crossbeam_channel::tick(Duration::from_millis(1000));
    let mut clipboard = None;

    let mut list_state = ListState::default();
    let mut showing = Showing::None;
    let mut moving = false;

    'draw: loop {
        let now = UNIX_EPOCH.elapsed()?.as_secs();

        if let Showing::Codes(codes) = &showing {
            if now >= codes.expires() {
                showing = Showing::None;
            }
        }

        let selected = tokens.get(list_state.selection());
        let (remaining, total) = match (&showing, selected) {
            (Showing::Codes(codes), _) => codes
                .active(now)
                .map_or((0, 1), |c| (c.window.remaining(now), c.window.until - c.window.start)),
            (_, Some(token)) => {
                let period = token.effective_period();
                (period - now % period, period)
            }
            (_, None) => (0, 1),
        };

        terminal.draw(|f| {
            let area = f.size();
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(5), Constraint::Percentage(100)])
                .split(area);

            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL))
                .gauge_style(Style::default().fg(Color::Green).bg(Color::DarkGray))
                .label(format!("{remaining}s"))
                .ratio((remaining as f64 / total as f64).clamp(0.0, 1.0));
            f.render_widget(gauge, chunks[0]);

            if tokens.is_empty() {
                let empty = Paragraph::new("No tokens yet, add one with `keyfob add <URI>`.")
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL));
                f.render_widget(empty, chunks[1]);
            } else {
                let list = List::new(&tokens)
                    .block(Block::default().borders(Borders::ALL).title("Tokens"))
                    .scrollbar(ScrollBar::default(), 2)
                    .moving(moving);
                f.render_stateful_widget(list, chunks[1], &mut list_state);
            }

            match &showing {
                Showing::None => {}
                Showing::Help => f.render_widget(HelpDialog, area),
                Showing::Codes(codes) => f.render_widget(code_dialog(codes, now), area),
                Showing::ConfirmDelete => {
                    let name = selected.map(ToString::to_string).unwrap_or_default();
                    f.render_widget(
                        Dialog::new("Delete")
                            .line(name)
                            .line("")
                            .line("y - yes, any other key - no"),
                        area,
                    );
                }
            }
        })?;

        let value = select! {
            recv(ticker) -> _ => None,
            recv(events) -> event => event.ok(),
        };

        let Some(event) = value else {
            continue;
        };

        if matches!(showing, Showing::ConfirmDelete) {
            showing = Showing::None;
            if event.code == KeyCode::Char('y') {
                if let Some(token) = tokens.get(list_state.selection()) {
                    store.del(token)?;
                }
                tokens = load(store);
                list_state.clamp(tokens.len());
            }
            continue;
        }

        match event.code {
            KeyCode::Esc | KeyCode::Char('q') => break 'draw,
            KeyCode::Up => {
                let selection = list_state.selection();
                if moving && selection > 0 {
                    swap(store, &mut tokens, selection, selection - 1)?;
                }
                list_state.up();
            }
            KeyCode::Down => {
                let selection = list_state.selection();
                if moving && selection + 1 < tokens.len() {
                    swap(store, &mut tokens, selection, selection + 1)?;
                }
                list_state.down(tokens.len());
            }
            KeyCode::Char('m') => moving = !moving && !tokens.is_empty(),
            KeyCode::Char('h') => {
                showing = match showing {
                    Showing::Help => Showing::None,
                    _ => Showing::Help,
                };
            }
            KeyCode::Char('s') | KeyCode::Enter => {
                showing = match showing {
                    Showing::Codes(_) => Showing::None,
                    _ => match generate(store, &mut tokens, list_state.selection())? {
                        Some(codes) => Showing::Codes(codes),
                        None => Showing::None,
                    },
                };
            }
            KeyCode::Char('c') => {
                let codes = match &showing {
                    Showing::Codes(codes) => Some(*codes),
                    _ => generate(store, &mut tokens, list_state.selection())?,
                };

                if let Some(code) = codes.as_ref().and_then(|c| c.active(now)) {
                    if clipboard.is_none() {
                        clipboard = Some(Clipboard::new().context("clipboard unavailable")?);
                    }
                    if let Some(clipboard) = &mut clipboard {
                        clipboard.set_text(code.code.to_string())?;
                    }
                }
            }
            KeyCode::Char('d') if !tokens.is_empty() => showing = Showing::ConfirmDelete,
            _ => {}
        }
    }

    Ok(())
}

/// Load all readable tokens. Unreadable ones are skipped, so positions in the returned list can
/// differ from the store positions only if a record is broken.
fn load<B: Backend>(store: &TokenStore<B>) -> Vec<Token> {
    store
        .iter()
        .filter_map(|(position, token)| match token {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(position, error = ?e, "skipping unreadable token");
                None
            }
        })
        .collect()
}

/// Move the token at list index `from` into the place of the one at `to`. Store positions are
/// looked up by id, as the list may lack unreadable tokens.
fn swap<B: Backend>(
    store: &mut TokenStore<B>,
    tokens: &mut [Token],
    from: usize,
    to: usize,
) -> Result<()> {
    if let (Some(from_pos), Some(to_pos)) =
        (store.position(&tokens[from]), store.position(&tokens[to]))
    {
        store.move_token(from_pos, to_pos)?;
        tokens.swap(from, to);
    }

    Ok(())
}

fn generate<B: Backend>(
    store: &mut TokenStore<B>,
    tokens: &mut [Token],
    selection: usize,
) -> Result<Option<Codes>> {
    let Some(token) = tokens.get_mut(selection) else {
        return Ok(None);
    };

    keyfob_gen::generate(token, store)
        .map(Some)
        .context("failed generating code")
}

fn code_dialog(codes: &Codes, now: u64) -> Dialog<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut dialog = Dialog::new("Code");

    if let Some(code) = codes.active(now) {
        dialog = dialog.line(Span::styled(code.code.to_string(), bold));
    }

    match codes.next {
        Some(next) if next.window.start > now => {
            dialog.line(Spans::from(format!("next: {}", next.code)))
        }
        _ => dialog,
    }
}
