//! Turns terminal events into session events.

use ratatui::{
    crossterm::event::{
        Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
        MouseEventKind,
    },
    layout::{Position, Rect},
};
use searchbar_core::{Key, UiEvent, View};

/// Sent once before the first frame. The text field is the only widget, so
/// it has focus from the start, and terminals only report focus changes.
pub fn startup_events() -> Vec<UiEvent> {
    vec![UiEvent::FocusGained]
}

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Send(UiEvent),
    Quit,
}

/// The text field and the screen geometry needed to map clicks.
#[derive(Debug, Default)]
pub struct Input {
    text: String,
    epoch: u64,
    /// Where the last frame drew the rows of the result list.
    pub list_rows: Rect,
    /// Index of the first result the last frame showed.
    pub list_offset: usize,
}

impl Input {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Takes over the query when the session rewrote it.
    pub fn sync(&mut self, view: &View) {
        if view.query_epoch != self.epoch {
            self.epoch = view.query_epoch;
            self.text = view.query.clone();
        }
    }

    pub fn handle(&mut self, event: Event, view: &View) -> Option<Action> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse, view),
            Event::FocusGained => Some(Action::Send(UiEvent::FocusGained)),
            Event::FocusLost => Some(Action::Send(UiEvent::FocusLost)),
            Event::Paste(pasted) => {
                self.text.push_str(&pasted.replace(['\r', '\n'], " "));
                Some(self.text_changed())
            }
            _ => None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => Some(Action::Quit),
            KeyCode::Char('u') if ctrl => {
                self.text.clear();
                Some(self.text_changed())
            }
            KeyCode::Char('n') if ctrl => Some(Action::Send(UiEvent::KeyPressed(Key::Down))),
            KeyCode::Char('p') if ctrl => Some(Action::Send(UiEvent::KeyPressed(Key::Up))),
            KeyCode::Char(_) if ctrl => None,
            KeyCode::Char(c) => {
                self.text.push(c);
                Some(self.text_changed())
            }
            KeyCode::Backspace => self.text.pop().map(|_| self.text_changed()),
            KeyCode::Down => Some(Action::Send(UiEvent::KeyPressed(Key::Down))),
            KeyCode::Up => Some(Action::Send(UiEvent::KeyPressed(Key::Up))),
            KeyCode::Enter => Some(Action::Send(UiEvent::KeyPressed(Key::Enter))),
            _ => None,
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, view: &View) -> Option<Action> {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) || !view.visible {
            return None;
        }
        if !self.list_rows.contains(Position::new(mouse.column, mouse.row)) {
            return None;
        }

        let index = self.list_offset + usize::from(mouse.row - self.list_rows.y);
        view.results
            .get(index)
            .map(|item| Action::Send(UiEvent::ItemClicked(item.id.clone())))
    }

    fn text_changed(&self) -> Action {
        Action::Send(UiEvent::TextChanged(self.text.clone()))
    }
}
