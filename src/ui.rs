use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::{Focus, HELP_TEXT, ViewerConfig};
use crate::inputter::Inputter;
use crate::model::{Modus, UIData};
use crate::records::PageState;
use crate::table::{COLUMNS, CellContext, format_date, header_text, row_height};
use crate::sanitize::message_lines;

pub const LOADING_TEXT: &str = "Loading...";
const HEADER_HEIGHT: u16 = 2;

#[derive(Debug)]
pub struct TableUI {
    title: String,
}

impl TableUI {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            title: format!(" Messages @ {} ", config.api_url),
        }
    }

    pub fn draw(&self, data: &UIData, frame: &mut Frame) {
        let instructions = Line::from(vec![
            " Pages ".into(),
            "<←/→>".blue().bold(),
            " Filter ".into(),
            "</>".blue().bold(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<Q> ".blue().bold(),
        ]);
        let block = Block::bordered()
            .title(Line::from(self.title.as_str().bold()).centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK);
        let inner = block.inner(frame.area());
        frame.render_widget(block, frame.area());

        if data.loading {
            let [_, middle, _] = Layout::vertical([
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Fill(1),
            ])
            .areas(inner);
            frame.render_widget(
                Paragraph::new(LOADING_TEXT).alignment(Alignment::Center),
                middle,
            );
            return;
        }

        let [table_area, pager_area, status_area] = Layout::vertical([
            Constraint::Min(HEADER_HEIGHT + 1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        self.draw_table(data, frame, table_area);
        frame.render_widget(Paragraph::new(pager_line(data)), pager_area);
        let status = if data.refresh_pending {
            format!("{} (filter changed, waiting for input to settle)", data.status_message)
        } else {
            data.status_message.to_string()
        };
        frame.render_widget(Paragraph::new(status).dim(), status_area);

        match data.modus {
            Modus::Table => {}
            Modus::Record => self.draw_record(data, frame),
            Modus::Help => draw_popup(frame, " Help ", Text::from(HELP_TEXT)),
        }
    }

    fn draw_table(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        let ctx = CellContext {
            date_format: data.date_format,
            date_locale: data.date_locale,
            max_lines: data.max_message_lines,
        };

        let header = Row::new(COLUMNS.iter().map(|column| {
            let filter = column.filter.map(|key| {
                Inputter::new(data.filters.get(key))
                    .focused(data.focus == Focus::Filter(key))
                    .line()
            });
            Cell::from(header_text(column, filter))
        }))
        .height(HEADER_HEIGHT)
        .bold()
        .bottom_margin(1);

        let rows = data.rows.iter().map(|row| {
            let cells: Vec<Text> = COLUMNS.iter().map(|c| c.render_cell(row, &ctx)).collect();
            let height = row_height(&cells);
            Row::new(cells.into_iter().map(Cell::from)).height(height)
        });

        let table = Table::new(rows, COLUMNS.map(|c| c.width))
            .header(header)
            .column_spacing(1)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = TableState::default();
        if data.focus == Focus::Table && !data.rows.is_empty() {
            state.select(Some(data.selected_row));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_record(&self, data: &UIData, frame: &mut Frame) {
        let Some(row) = data.rows.get(data.selected_row) else {
            return;
        };
        let mut text = Text::from(vec![
            Line::from(vec!["Sender: ".bold(), Span::raw(row.sender_fio.clone())]),
            Line::from(vec!["Email:  ".bold(), Span::raw(row.sender_email.clone())]),
            Line::from(vec![
                "Date:   ".bold(),
                Span::raw(format_date(row.message_date, data.date_format, data.date_locale)),
            ]),
            Line::default(),
        ]);
        text.extend(message_lines(&row.message));
        draw_popup(frame, " Message ", text);
    }
}

fn button(label: &'static str, enabled: bool) -> Span<'static> {
    let span = Span::raw(format!("[{label}]"));
    if enabled { span.bold() } else { span.dim() }
}

/// `[<<] [<] [>] [>>]  Page x of y | Go to page: [..] | Show n`
pub fn pager_line<'a>(data: &UIData<'a>) -> Line<'a> {
    let pagination = PageState::pagination(&data.page);
    let mut spans = vec![
        button("<<", pagination.first_enabled),
        Span::raw(" "),
        button("<", pagination.previous_enabled),
        Span::raw(" "),
        button(">", pagination.next_enabled),
        Span::raw(" "),
        button(">>", pagination.last_enabled),
        Span::raw("  Page "),
        Span::raw(pagination.label).bold(),
        Span::raw(" | Go to page: "),
    ];
    let jump = Inputter::new(data.page_jump)
        .digits_only()
        .focused(data.focus == Focus::PageJump);
    spans.extend(jump.line().spans);
    spans.push(Span::raw(format!(" | Show {}", data.page.page_size.get())));
    Line::from(spans)
}

fn draw_popup(frame: &mut Frame, title: &str, text: Text) {
    let area = centered(frame.area(), 80, 70);
    let block = Block::bordered()
        .title(Line::from(title.to_string()).centered())
        .title_bottom(Line::from(" <Esc> close ").centered())
        .border_set(border::DOUBLE);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, vertical, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, horizontal, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(vertical);
    horizontal
}
