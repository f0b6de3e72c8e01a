use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, ViewerConfig, ViewerError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &ViewerConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, ViewerError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            return Ok(Self::map_key(key, model.raw_keyevents()));
        }
        Ok(None)
    }

    fn map_key(key: KeyEvent, raw: bool) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Tab, _) => Some(Message::FocusNext),
            (KeyCode::BackTab, _) => Some(Message::FocusPrev),
            _ if raw => Some(Message::RawKey(key)),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Home, _) | (KeyCode::Char('g'), _) => Some(Message::FirstPage),
            (KeyCode::Left, _) | (KeyCode::Char('h'), _) => Some(Message::PreviousPage),
            (KeyCode::Right, _) | (KeyCode::Char('l'), _) => Some(Message::NextPage),
            (KeyCode::End, _) | (KeyCode::Char('G'), _) => Some(Message::LastPage),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Char('+'), _) => Some(Message::PageSizeUp),
            (KeyCode::Char('-'), _) => Some(Message::PageSizeDown),
            (KeyCode::Char('/'), _) => Some(Message::FocusFilter),
            (KeyCode::Char(':'), _) => Some(Message::FocusPageJump),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Char('r'), _) => Some(Message::Reload),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
