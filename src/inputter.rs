use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use tracing::trace;

pub const PLACEHOLDER: &str = "Search...";

/// What a key press did to a controlled input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// The text the input would show next. The owner decides whether to
    /// store it.
    Changed(String),
    Finished,
    Canceled,
    Ignored,
}

/// A single-line text box that only displays what its owner hands it.
///
/// It keeps no text of its own: `read` turns a key press into the value the
/// owner should store, `line` renders the owner's current value.
#[derive(Debug, Clone, Copy)]
pub struct Inputter<'a> {
    value: &'a str,
    focused: bool,
    digits_only: bool,
}

impl<'a> Inputter<'a> {
    pub fn new(value: &'a str) -> Self {
        Self {
            value,
            focused: false,
            digits_only: false,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn digits_only(mut self) -> Self {
        self.digits_only = true;
        self
    }

    pub fn read(&self, key: KeyEvent) -> InputEvent {
        let event = match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => InputEvent::Finished,
            (KeyCode::Esc, _) => InputEvent::Canceled,
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.clear(),
            (KeyCode::Char(chr), KeyModifiers::NONE | KeyModifiers::SHIFT) => self.key(chr),
            _ => InputEvent::Ignored,
        };
        trace!("Input {:?} => {:?}", key.code, event);
        event
    }

    fn backspace(&self) -> InputEvent {
        let mut next = self.value.to_string();
        match next.pop() {
            Some(_) => InputEvent::Changed(next),
            None => InputEvent::Ignored,
        }
    }

    fn clear(&self) -> InputEvent {
        if self.value.is_empty() {
            InputEvent::Ignored
        } else {
            InputEvent::Changed(String::new())
        }
    }

    fn key(&self, chr: char) -> InputEvent {
        if chr.is_control() || (self.digits_only && !chr.is_ascii_digit()) {
            return InputEvent::Ignored;
        }
        let mut next = String::with_capacity(self.value.len() + chr.len_utf8());
        next.push_str(self.value);
        next.push(chr);
        InputEvent::Changed(next)
    }

    pub fn line(&self) -> Line<'a> {
        let style = if self.focused {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };
        let mut spans = vec![Span::styled("[", style)];
        if self.value.is_empty() && !self.focused {
            spans.push(Span::styled(PLACEHOLDER, style).italic().dim());
        } else {
            spans.push(Span::styled(self.value, style));
        }
        if self.focused {
            spans.push(Span::styled("▏", style));
        }
        spans.push(Span::styled("]", style));
        Line::from(spans)
    }
}
