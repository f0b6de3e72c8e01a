use std::fmt;
use std::io::Error;
use std::time::Duration;

use chrono::Locale;
use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;

use crate::records::{FilterKey, PageSize};

pub const DEFAULT_API_URL: &str = "http://localhost:3001";
pub const API_URL_ENV: &str = "MESSAGES_API_URL";

pub const HELP_TEXT: &str = "\
Navigation
  Left  / h      previous page
  Right / l      next page
  Home  / g      first page
  End   / G      last page
  Up / Down      select row (k / j)
  + / -          change page size
  :              go to page
  r              reload

Filters
  / or Tab       edit filters (Tab / Shift-Tab cycle)
  Esc / Enter    leave the input

Other
  Enter          show selected message
  ?              this help
  q              quit";

#[derive(Debug)]
pub enum ViewerError {
    IoError(Error),
    HttpError(reqwest::Error),
    Status(u16),
    Decode(serde_json::Error),
    InvalidConfig(String),
    LoggingFailed(String),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::IoError(e) => write!(f, "io error: {e}"),
            ViewerError::HttpError(e) => write!(f, "request failed: {e}"),
            ViewerError::Status(code) => write!(f, "server responded with status {code}"),
            ViewerError::Decode(e) => write!(f, "unexpected response body: {e}"),
            ViewerError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            ViewerError::LoggingFailed(msg) => write!(f, "failed to set up logging: {msg}"),
        }
    }
}

impl std::error::Error for ViewerError {}

impl From<Error> for ViewerError {
    fn from(err: Error) -> Self {
        ViewerError::IoError(err)
    }
}

impl From<reqwest::Error> for ViewerError {
    fn from(err: reqwest::Error) -> Self {
        ViewerError::HttpError(err)
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        ViewerError::Decode(err)
    }
}

impl From<tracing_subscriber::util::TryInitError> for ViewerError {
    fn from(err: tracing_subscriber::util::TryInitError) -> Self {
        ViewerError::LoggingFailed(err.to_string())
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct ViewerConfig {
    pub api_url: String,
    pub page_size: PageSize,
    pub debounce: Duration,
    pub event_poll_time: u64,
    pub max_message_lines: usize,
    pub date_format: String,
    pub date_locale: Locale,
    pub request_timeout: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: PageSize::default(),
            debounce: Duration::from_millis(1000),
            event_poll_time: 100,
            max_message_lines: 3,
            date_format: "%x".to_string(),
            date_locale: Locale::POSIX,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Which part of the surface receives raw key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Table,
    Filter(FilterKey),
    PageJump,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Table => Focus::Filter(FilterKey::SenderFio),
            Focus::Filter(FilterKey::SenderFio) => Focus::Filter(FilterKey::SenderEmail),
            Focus::Filter(FilterKey::SenderEmail) => Focus::Filter(FilterKey::Message),
            Focus::Filter(FilterKey::Message) => Focus::PageJump,
            Focus::PageJump => Focus::Table,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Table => Focus::PageJump,
            Focus::Filter(FilterKey::SenderFio) => Focus::Table,
            Focus::Filter(FilterKey::SenderEmail) => Focus::Filter(FilterKey::SenderFio),
            Focus::Filter(FilterKey::Message) => Focus::Filter(FilterKey::SenderEmail),
            Focus::PageJump => Focus::Filter(FilterKey::Message),
        }
    }

    pub fn takes_raw_keys(self) -> bool {
        !matches!(self, Focus::Table)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    FirstPage,
    PreviousPage,
    NextPage,
    LastPage,
    PageSizeUp,
    PageSizeDown,
    MoveUp,
    MoveDown,
    FocusNext,
    FocusPrev,
    FocusFilter,
    FocusPageJump,
    Enter,
    Exit,
    Help,
    Reload,
    RawKey(KeyEvent),
}
