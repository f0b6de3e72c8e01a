use std::fmt::Display;

use chrono::{DateTime, Local, Locale, TimeZone};
use ratatui::layout::Constraint;
use ratatui::text::{Line, Text};

use crate::records::{FilterKey, MessageRow};
use crate::sanitize::message_lines;

/// Field of a `MessageRow` shown by a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    SenderFio,
    SenderEmail,
    MessageDate,
    Message,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub header: &'static str,
    pub accessor: Accessor,
    pub filter: Option<FilterKey>,
    pub width: Constraint,
}

pub const COLUMNS: [ColumnDef; 4] = [
    ColumnDef {
        header: "Sender",
        accessor: Accessor::SenderFio,
        filter: Some(FilterKey::SenderFio),
        width: Constraint::Percentage(18),
    },
    ColumnDef {
        header: "Email",
        accessor: Accessor::SenderEmail,
        filter: Some(FilterKey::SenderEmail),
        width: Constraint::Percentage(20),
    },
    ColumnDef {
        header: "Date",
        accessor: Accessor::MessageDate,
        filter: None,
        width: Constraint::Length(10),
    },
    ColumnDef {
        header: "Message",
        accessor: Accessor::Message,
        filter: Some(FilterKey::Message),
        width: Constraint::Fill(1),
    },
];

/// Settings that influence cell rendering.
#[derive(Debug, Clone)]
pub struct CellContext<'a> {
    pub date_format: &'a str,
    pub date_locale: Locale,
    pub max_lines: usize,
}

impl ColumnDef {
    pub fn render_cell(&self, row: &MessageRow, ctx: &CellContext) -> Text<'static> {
        match self.accessor {
            Accessor::SenderFio => Text::from(row.sender_fio.clone()),
            Accessor::SenderEmail => Text::from(row.sender_email.clone()),
            Accessor::MessageDate => Text::from(format_date(
                row.message_date,
                ctx.date_format,
                ctx.date_locale,
            )),
            Accessor::Message => {
                let mut lines = message_lines(&row.message);
                if lines.len() > ctx.max_lines {
                    lines.truncate(ctx.max_lines.max(1));
                    if let Some(last) = lines.last_mut() {
                        last.push_span("…");
                    }
                }
                Text::from(lines)
            }
        }
    }
}

/// Unix seconds as a calendar date in the local time zone.
pub fn format_date(seconds: i64, format: &str, locale: Locale) -> String {
    format_in_zone(&Local, seconds, format, locale)
}

fn format_in_zone<Tz>(zone: &Tz, seconds: i64, format: &str, locale: Locale) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match zone.timestamp_opt(seconds, 0).single() {
        Some(date) => date.format_localized(format, locale).to_string(),
        None => DateTime::from_timestamp(seconds, 0)
            .map(|d| d.format_localized(format, locale).to_string())
            .unwrap_or_else(|| "Invalid Date".to_string()),
    }
}

/// Maps `ru-RU`, `de_DE.UTF-8` or `C` to a chrono locale.
pub fn locale_from_tag(tag: &str) -> Option<Locale> {
    let name = tag.split(['.', '@']).next().unwrap_or_default().replace('-', "_");
    match name.as_str() {
        "" => None,
        "C" | "POSIX" => Some(Locale::POSIX),
        name => Locale::try_from(name).ok(),
    }
}

/// Locale of the running session, POSIX when unknown.
pub fn system_locale() -> Locale {
    sys_locale::get_locale()
        .and_then(|tag| locale_from_tag(&tag))
        .unwrap_or(Locale::POSIX)
}

/// Height of the tallest cell, at least one line.
pub fn row_height(cells: &[Text]) -> u16 {
    cells.iter().map(|c| c.height()).max().unwrap_or(1).max(1) as u16
}

/// Header cell: label plus, for filterable columns, the filter line.
pub fn header_text<'a>(column: &ColumnDef, filter: Option<Line<'a>>) -> Text<'a> {
    let mut text = Text::from(Line::from(column.header));
    if let Some(filter) = filter {
        text.push_line(filter);
    }
    text
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn ctx() -> CellContext<'static> {
        CellContext {
            date_format: "%x",
            date_locale: Locale::ru_RU,
            max_lines: 2,
        }
    }

    fn plain(text: &Text) -> String {
        text.lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn column(accessor: Accessor) -> ColumnDef {
        *COLUMNS.iter().find(|c| c.accessor == accessor).unwrap()
    }

    #[test]
    fn only_date_column_lacks_filter() {
        let filterable: Vec<_> = COLUMNS.iter().filter_map(|c| c.filter).collect();
        assert_eq!(
            filterable,
            vec![FilterKey::SenderFio, FilterKey::SenderEmail, FilterKey::Message]
        );
        assert!(column(Accessor::MessageDate).filter.is_none());
    }

    #[test]
    fn epoch_follows_the_locale_date_pattern() {
        assert_eq!(format_in_zone(&Utc, 0, "%x", Locale::ru_RU), "01.01.1970");
        assert_eq!(format_in_zone(&Utc, 0, "%x", Locale::de_DE), "01.01.1970");
        assert_eq!(format_in_zone(&Utc, 0, "%x", Locale::en_US), "01/01/1970");
        assert_eq!(format_in_zone(&Utc, 0, "%x", Locale::POSIX), "01/01/70");
    }

    #[test]
    fn explicit_format_overrides_the_locale_pattern() {
        assert_eq!(format_in_zone(&Utc, 86_400, "%Y-%m-%d", Locale::ru_RU), "1970-01-02");
    }

    #[test]
    fn locale_tags_from_the_environment() {
        assert_eq!(locale_from_tag("ru-RU"), Some(Locale::ru_RU));
        assert_eq!(locale_from_tag("de_DE.UTF-8"), Some(Locale::de_DE));
        assert_eq!(locale_from_tag("C"), Some(Locale::POSIX));
        assert_eq!(locale_from_tag("xx-YY"), None);
        assert_eq!(locale_from_tag(""), None);
    }

    #[test]
    fn date_cell_uses_timestamp() {
        let row = MessageRow {
            message_date: 86_400 * 365,
            ..Default::default()
        };
        let text = column(Accessor::MessageDate).render_cell(&row, &ctx());
        assert_eq!(plain(&text), format_date(86_400 * 365, "%x", Locale::ru_RU));
    }

    #[test]
    fn message_cell_is_sanitized_and_capped() {
        let row = MessageRow {
            message: "<br>one<br>two<br>three<script>x()</script>".to_string(),
            ..Default::default()
        };
        let text = column(Accessor::Message).render_cell(&row, &ctx());
        assert_eq!(plain(&text), "one\ntwo…");
        assert_eq!(row_height(&[text, Text::from("x")]), 2);
    }

    #[test]
    fn header_has_filter_line_only_when_given() {
        assert_eq!(header_text(&COLUMNS[2], None).height(), 1);
        assert_eq!(header_text(&COLUMNS[0], Some(Line::from("[]"))).height(), 2);
    }
}
