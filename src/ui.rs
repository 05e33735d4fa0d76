use crate::client::AppSnapshot;
use collection_crafting::{
    Rarity,
    command::PanelCommand,
    panel::Recipe,
};
use color_eyre::eyre::{
    Report,
    Result,
    eyre,
};
use crossterm::event::{
    self,
    Event,
    KeyCode,
    KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode,
    enable_raw_mode,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::io::stdout;
use tokio::sync::mpsc;

pub type InputEventReceiver = mpsc::UnboundedReceiver<Result<Event>>;

pub enum UserEvent {
    Quit,
    Redraw,
    OpenTradeUp,
    OpenCrate,
    Command(PanelCommand),
    Picked(Option<u64>),
}

#[derive(Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    backpack: Vec<(u64, String)>,
}

impl UiState {
    pub fn open_picker(&mut self, slot: usize) {
        self.mode = Mode::Picker(PickerState { slot, idx: 0 });
    }
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    Picker(PickerState),
    QuitModal,
}

#[derive(Clone, Debug)]
struct PickerState {
    slot: usize,
    idx: usize,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

/// Keyboard events read on a dedicated thread, since crossterm's reader
/// blocks.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            let event = event::read().map_err(Report::from);
            let failed = event.is_err();
            if tx.send(event).is_err() || failed {
                break;
            }
        }
    });
    rx
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    events
        .recv()
        .await
        .ok_or_else(|| eyre!("input thread stopped"))?
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let Event::Key(k) = event else {
        return matches!(event, Event::Resize(..)).then_some(UserEvent::Redraw);
    };
    if k.kind != KeyEventKind::Press {
        return None;
    }
    match &mut state.mode {
        Mode::QuitModal => match k.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(UserEvent::Quit),
            _ => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
        },
        Mode::Picker(picker) => match k.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Picked(None))
            }
            KeyCode::Up => {
                picker.idx = picker.idx.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down => {
                let max = state.backpack.len().saturating_sub(1);
                picker.idx = (picker.idx + 1).min(max);
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let picked = state.backpack.get(picker.idx).map(|(id, _)| *id);
                state.mode = Mode::Normal;
                Some(UserEvent::Picked(picked))
            }
            _ => None,
        },
        Mode::Normal => {
            let command = match k.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    state.mode = Mode::QuitModal;
                    return Some(UserEvent::Redraw);
                }
                KeyCode::Char('t') => return Some(UserEvent::OpenTradeUp),
                KeyCode::Char('c') => return Some(UserEvent::OpenCrate),
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    let digit = c.to_digit(10)? as usize;
                    // '0' is the tenth slot
                    let slot = if digit == 0 { 9 } else { digit - 1 };
                    PanelCommand::SelectSlot(slot)
                }
                KeyCode::Char('d') => PanelCommand::DoneSelectingItems,
                KeyCode::Char('s') => PanelCommand::PlaceStamp,
                KeyCode::Char('e') | KeyCode::Enter => PanelCommand::SendEnvelope,
                KeyCode::Char('n') => PanelCommand::NextItem,
                KeyCode::Char(' ') => PanelCommand::Dismiss,
                KeyCode::Char('x') => PanelCommand::Cancel,
                _ => return None,
            };
            Some(UserEvent::Command(command))
        }
    }
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    // picker works off the backpack as of the last frame
    state.backpack = snap.backpack.clone();
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),  // status
            Constraint::Min(12),    // slots + reveal
            Constraint::Length(10), // feedback log
            Constraint::Length(3),  // help
        ])
        .split(f.area());

    draw_top(f, chunks[0], snap);
    draw_middle(f, chunks[1], snap);
    draw_log(f, chunks[2], snap);
    draw_help(f, chunks[3]);
    draw_modals(f, state);
}

fn draw_top(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let recipe = match snap.recipe {
        Recipe::CollectionUpgrade => "Collection upgrade",
        Recipe::CommonStatClock => "Stat clock",
    };
    let countdown = snap
        .response_remaining
        .map(|left| format!(" | Timeout in {:.1}s", left.as_secs_f32()))
        .unwrap_or_default();
    let backend = if snap.offline { " | Backend: offline" } else { "" };
    let closure = if snap.prevents_closure { "locked" } else { "free" };
    let status = Paragraph::new(format!(
        "State: {}{} | Recipe: {} | Collection: {} | Close: {}{}\n{}",
        snap.state,
        countdown,
        recipe,
        snap.collection.as_deref().unwrap_or("none"),
        closure,
        backend,
        snap.status
    ))
    .block(Block::default().borders(Borders::ALL).title("Crafting Panel"));
    f.render_widget(status, area);
}

fn draw_middle(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let mut slot_lines = Vec::new();
    if !snap.visible {
        slot_lines.push(Line::styled(
            "Panel hidden (t trade-up, c open crate)",
            Style::default().fg(Color::DarkGray),
        ));
    }
    for (idx, slot) in snap.slots.iter().enumerate() {
        let label = format!("{:>2}. {}", idx + 1, slot.name);
        let style = if snap.selecting_slot == Some(idx) {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if slot.item_id.is_none() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        slot_lines.push(Line::styled(label, style));
    }
    let ok = if snap.can_submit { "OK ready" } else { "fill every slot" };
    let slots = Paragraph::new(slot_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Inputs ({ok})")),
    );
    f.render_widget(slots, halves[0]);

    let mut reveal_lines = Vec::new();
    match &snap.current_reveal {
        Some(item) => {
            reveal_lines.push(Line::styled(
                item.name.clone(),
                rarity_style(item.rarity).add_modifier(Modifier::BOLD),
            ));
            reveal_lines.push(Line::from(format!("{} | {}", item.rarity, item.quality)));
            reveal_lines.push(Line::from(format!("Origin: {}", item.origin)));
            let source = if item.is_local { "local fallback" } else { "backend" };
            reveal_lines.push(Line::from(format!("Item #{} ({source})", item.item_id)));
        }
        None => reveal_lines.push(Line::styled("Nothing to reveal", Style::default().fg(Color::DarkGray))),
    }
    reveal_lines.push(Line::from(""));
    reveal_lines.push(Line::from(format!("Pending rewards: {}", snap.pending_rewards)));
    if snap.can_show_next {
        reveal_lines.push(Line::styled("n for the next item", Style::default().fg(Color::Green)));
    }
    let reveal = Paragraph::new(reveal_lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Reward"));
    f.render_widget(reveal, halves[1]);
}

fn draw_log(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines: Vec<Line> = snap.log.iter().map(|l| Line::from(l.clone())).collect();
    for e in &snap.errors {
        lines.push(Line::styled(e.clone(), Style::default().fg(Color::Red)));
    }
    if lines.is_empty() {
        lines.push(Line::styled("No events", Style::default().fg(Color::DarkGray)));
    }
    let log = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Events"));
    f.render_widget(log, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "t trade-up | c crate | 1-9,0 pick slot | d done | s stamp | Enter/e send | n next | Space dismiss | x cancel | q quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState) {
    match &state.mode {
        Mode::Normal => {}
        Mode::Picker(picker) => {
            let area = centered_rect(50, 60, f.area());
            let items: Vec<ListItem> = state
                .backpack
                .iter()
                .enumerate()
                .map(|(idx, (id, name))| {
                    let style = if idx == picker.idx {
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    ListItem::new(Line::styled(format!("#{id} {name}"), style))
                })
                .collect();
            let list = List::new(items).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Pick item for slot {} (Enter/Esc)", picker.slot + 1)),
            );
            f.render_widget(Clear, area);
            f.render_widget(list, area);
        }
        Mode::QuitModal => {
            let area = centered_rect(30, 20, f.area());
            let body = Paragraph::new("Quit? (y/Enter to confirm)")
                .block(Block::default().borders(Borders::ALL).title("Quit"));
            f.render_widget(Clear, area);
            f.render_widget(body, area);
        }
    }
}

fn rarity_style(rarity: Rarity) -> Style {
    let color = match rarity {
        Rarity::Default => Color::Gray,
        Rarity::Mercenary => Color::Blue,
        Rarity::Commando => Color::Magenta,
        Rarity::Assassin => Color::LightMagenta,
        Rarity::Elite => Color::Red,
    };
    Style::default().fg(color)
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}
