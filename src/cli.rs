use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::domain::{API_URL_ENV, DEFAULT_API_URL, ViewerConfig, ViewerError};
use crate::records::PageSize;
use crate::table::{locale_from_tag, system_locale};

/// Browse the message table of a remote API.
#[derive(Parser, Debug)]
#[command(name = "msgtv", version, about)]
pub struct Args {
    /// Base url of the messages API
    #[arg(long, env = API_URL_ENV, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Rows per page (10, 20, 30, 40 or 50)
    #[arg(long, default_value_t = 10, value_parser = parse_page_size)]
    pub page_size: u32,

    /// Quiet window for filter edits in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub debounce_ms: u64,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,

    /// Maximum lines shown per message in the table
    #[arg(long, default_value_t = 3)]
    pub max_message_lines: usize,

    /// chrono format string for the date column
    #[arg(long, default_value = "%x")]
    pub date_format: String,

    /// Locale for the date column, e.g. `ru_RU`; detected from the session when unset
    #[arg(long)]
    pub date_locale: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Log file, `~` and environment variables are expanded
    #[arg(long, default_value = "~/.msgtv.log")]
    pub log_file: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn parse_page_size(s: &str) -> Result<u32, String> {
    let value: u32 = s.parse().map_err(|e| format!("{e}"))?;
    PageSize::from_value(value)
        .map(PageSize::get)
        .ok_or_else(|| format!("page size must be one of 10, 20, 30, 40, 50; got {value}"))
}

impl Args {
    pub fn config(&self) -> Result<ViewerConfig, ViewerError> {
        let page_size = PageSize::from_value(self.page_size).ok_or_else(|| {
            ViewerError::InvalidConfig(format!("unsupported page size {}", self.page_size))
        })?;
        if self.max_message_lines == 0 {
            return Err(ViewerError::InvalidConfig(
                "max-message-lines must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ViewerError::InvalidConfig(
                "timeout-secs must be at least 1".to_string(),
            ));
        }
        let date_locale = match &self.date_locale {
            Some(tag) => locale_from_tag(tag).ok_or_else(|| {
                ViewerError::InvalidConfig(format!("unknown date locale {tag:?}"))
            })?,
            None => system_locale(),
        };
        Ok(ViewerConfig::default()
            .with_api_url(self.api_url.clone())
            .with_page_size(page_size)
            .with_debounce(Duration::from_millis(self.debounce_ms))
            .with_event_poll_time(self.poll_ms)
            .with_max_message_lines(self.max_message_lines)
            .with_date_format(self.date_format.clone())
            .with_date_locale(date_locale)
            .with_request_timeout(Duration::from_secs(self.timeout_secs)))
    }

    pub fn log_path(&self) -> Result<PathBuf, ViewerError> {
        shellexpand::full(&self.log_file)
            .map(|p| PathBuf::from(p.as_ref()))
            .map_err(|e| ViewerError::InvalidConfig(format!("log file: {e}")))
    }
}
