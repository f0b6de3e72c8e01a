use std::time::Instant;

use chrono::Locale;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace};

use crate::client::{DataClient, FetchOutcome, FetchResult};
use crate::domain::{Focus, Message, ViewerConfig};
use crate::inputter::{InputEvent, Inputter};
use crate::records::{FilterKey, FilterSet, MessageRow, PageQuery, PageSize, PageState};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modus {
    Table,
    Record,
    Help,
}

/// Everything the UI needs to draw one frame.
pub struct UIData<'a> {
    pub rows: &'a [MessageRow],
    pub filters: &'a FilterSet,
    pub page: PageState,
    pub loading: bool,
    pub refresh_pending: bool,
    pub focus: Focus,
    pub modus: Modus,
    pub selected_row: usize,
    pub page_jump: &'a str,
    pub status_message: &'a str,
    pub date_format: &'a str,
    pub date_locale: Locale,
    pub max_message_lines: usize,
}

/// The table surface: owns paging, filters, rows and the loading flag and
/// turns every interaction into a fetch.
pub struct Model {
    config: ViewerConfig,
    pub status: Status,
    client: DataClient,
    filters: FilterSet,
    page: PageState,
    rows: Vec<MessageRow>,
    loading: bool,
    focus: Focus,
    modus: Modus,
    selected_row: usize,
    page_jump: String,
    status_message: String,
}

impl Model {
    pub fn init(config: &ViewerConfig, client: DataClient) -> Self {
        Self {
            config: config.clone(),
            status: Status::Ready,
            client,
            filters: FilterSet::default(),
            page: PageState::new(config.page_size),
            rows: Vec::new(),
            loading: false,
            focus: Focus::Table,
            modus: Modus::Table,
            selected_row: 0,
            page_jump: String::new(),
            status_message: "Started msgtv!".to_string(),
        }
    }

    /// Initial load with empty filters.
    pub fn mount(&mut self) {
        info!(api_url = %self.config.api_url, "Mounting message table");
        self.start_fetch();
    }

    pub fn uidata(&self) -> UIData<'_> {
        UIData {
            rows: &self.rows,
            filters: &self.filters,
            page: self.page,
            loading: self.loading,
            refresh_pending: self.client.has_pending(),
            focus: self.focus,
            modus: self.modus,
            selected_row: self.selected_row,
            page_jump: &self.page_jump,
            status_message: &self.status_message,
            date_format: &self.config.date_format,
            date_locale: self.config.date_locale,
            max_message_lines: self.config.max_message_lines,
        }
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::Table && self.focus.takes_raw_keys()
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    fn query(&self) -> PageQuery {
        PageQuery {
            page: self.page.current_page,
            size: self.page.page_size,
            filters: self.filters.clone(),
        }
    }

    fn start_fetch(&mut self) {
        self.client.fetch(self.query());
        self.loading = true;
        self.set_status_message("Loading...");
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    // -------------------- Table surface operations ---------------------- //

    pub fn on_filter_change(&mut self, key: FilterKey, value: String) {
        self.filter_change_at(key, value, Instant::now());
    }

    fn filter_change_at(&mut self, key: FilterKey, value: String, now: Instant) {
        trace!("Filter {} => {:?}", key.wire_name(), value);
        self.filters = self.filters.with(key, value);
        self.page.current_page = 1;
        self.client.fetch_debounced(self.query(), now);
    }

    pub fn on_page_change(&mut self, page: u32) {
        trace!("Page {} => {}", self.page.current_page, page);
        self.page.current_page = page;
        self.start_fetch();
    }

    pub fn on_page_size_change(&mut self, size: PageSize) {
        trace!("Page size {} => {}", self.page.page_size.get(), size.get());
        self.page.page_size = size;
        self.page.current_page = 1;
        self.start_fetch();
    }

    /// Drives the debouncer and applies settled fetches.
    pub fn poll(&mut self, now: Instant) {
        if self.client.tick(now).is_some() {
            self.loading = true;
            self.set_status_message("Loading...");
        }
        while let Some(outcome) = self.client.try_next() {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        if !self.client.is_current(outcome.generation) {
            debug!(
                generation = outcome.generation,
                page = outcome.query.page,
                "Dropping stale fetch outcome"
            );
            return;
        }
        self.loading = false;
        match outcome.result {
            FetchResult::Loaded(page) => {
                self.rows = page.data;
                self.page.total_pages = page.total_pages;
                self.selected_row = self.selected_row.min(self.rows.len().saturating_sub(1));
                self.set_status_message(format!(
                    "Loaded {} messages, page {} of {}",
                    self.rows.len(),
                    outcome.query.page,
                    self.page.total_pages
                ));
            }
            FetchResult::Cancelled => {}
            FetchResult::Failed(e) => {
                self.set_status_message(format!("Failed to fetch data: {e}"));
            }
        }
    }

    // -------------------- Message handling ---------------------- //

    pub fn update(&mut self, message: Option<Message>) {
        let Some(msg) = message else {
            return;
        };
        match self.modus {
            Modus::Table => match msg {
                Message::Quit => self.quit(),
                Message::FirstPage => self.first_page(),
                Message::PreviousPage => self.previous_page(),
                Message::NextPage => self.next_page(),
                Message::LastPage => self.last_page(),
                Message::PageSizeUp => self.change_page_size(self.page.page_size.next()),
                Message::PageSizeDown => self.change_page_size(self.page.page_size.prev()),
                Message::MoveUp => self.selected_row = self.selected_row.saturating_sub(1),
                Message::MoveDown => {
                    if self.selected_row + 1 < self.rows.len() {
                        self.selected_row += 1;
                    }
                }
                Message::FocusNext => self.set_focus(self.focus.next()),
                Message::FocusPrev => self.set_focus(self.focus.prev()),
                Message::FocusFilter => self.set_focus(Focus::Filter(FilterKey::SenderFio)),
                Message::FocusPageJump => self.set_focus(Focus::PageJump),
                Message::Enter => {
                    if !self.loading && self.selected_row < self.rows.len() {
                        self.modus = Modus::Record;
                    }
                }
                Message::Exit => self.set_focus(Focus::Table),
                Message::Help => self.modus = Modus::Help,
                Message::Reload => self.start_fetch(),
                Message::RawKey(key) => self.raw_input(key),
            },
            Modus::Record | Modus::Help => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter | Message::Help => self.modus = Modus::Table,
                _ => (),
            },
        }
    }

    fn set_focus(&mut self, focus: Focus) {
        if self.focus == Focus::PageJump && focus != Focus::PageJump {
            self.page_jump.clear();
        }
        self.focus = focus;
    }

    fn first_page(&mut self) {
        if self.page.pagination().first_enabled {
            self.on_page_change(1);
        }
    }

    fn previous_page(&mut self) {
        if self.page.pagination().previous_enabled {
            self.on_page_change(self.page.previous_page());
        }
    }

    fn next_page(&mut self) {
        if self.page.pagination().next_enabled {
            self.on_page_change(self.page.next_page());
        }
    }

    fn last_page(&mut self) {
        if self.page.pagination().last_enabled {
            self.on_page_change(self.page.total_pages);
        }
    }

    fn change_page_size(&mut self, size: PageSize) {
        if size != self.page.page_size {
            self.on_page_size_change(size);
        }
    }

    fn raw_input(&mut self, key: KeyEvent) {
        match self.focus {
            Focus::Filter(filter) => {
                let event = Inputter::new(self.filters.get(filter)).read(key);
                match event {
                    InputEvent::Changed(value) => self.on_filter_change(filter, value),
                    InputEvent::Finished | InputEvent::Canceled => self.set_focus(Focus::Table),
                    InputEvent::Ignored => {}
                }
            }
            Focus::PageJump => {
                let event = Inputter::new(&self.page_jump).digits_only().read(key);
                match event {
                    InputEvent::Changed(value) => {
                        self.page_jump = value;
                        if let Some(page) = self.jump_target() {
                            self.on_page_change(page);
                        }
                    }
                    InputEvent::Finished | InputEvent::Canceled => self.set_focus(Focus::Table),
                    InputEvent::Ignored => {}
                }
            }
            Focus::Table => {}
        }
    }

    // Zero and empty input are ignored, pages past the end go to the last page.
    fn jump_target(&self) -> Option<u32> {
        let page = self.page_jump.parse::<u32>().ok().filter(|&p| p > 0)?;
        if self.page.total_pages > 0 {
            Some(page.min(self.page.total_pages))
        } else {
            Some(page)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use tokio::runtime::Handle;

    use super::*;
    use crate::client::fake::FakeSource;
    use crate::records::PageResponse;

    fn model(source: FakeSource) -> (Model, Arc<FakeSource>) {
        let source = Arc::new(source);
        let config = ViewerConfig::default();
        let client = DataClient::new(source.clone(), Handle::current(), &config);
        (Model::init(&config, client), source)
    }

    async fn settle(model: &mut Model) {
        let outcome = model.client.next_outcome().await.unwrap();
        model.apply_outcome(outcome);
    }

    async fn mounted(source: FakeSource) -> (Model, Arc<FakeSource>) {
        let (mut model, source) = model(source);
        model.mount();
        settle(&mut model).await;
        (model, source)
    }

    fn key(chr: char) -> Message {
        Message::RawKey(KeyEvent::new(KeyCode::Char(chr), KeyModifiers::NONE))
    }

    #[tokio::test(start_paused = true)]
    async fn mount_loads_first_page_with_defaults() {
        let (mut model, source) = model(FakeSource::new(4));
        model.mount();
        assert!(model.loading);

        settle(&mut model).await;
        assert!(!model.loading);
        assert_eq!(model.page.total_pages, 4);
        assert_eq!(model.rows[0].sender_fio, "page 1");

        let calls = source.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].page, 1);
        assert_eq!(calls[0].size, PageSize::Ten);
        assert_eq!(calls[0].filters, FilterSet::default());
    }

    #[tokio::test(start_paused = true)]
    async fn filter_burst_runs_one_fetch_with_combined_filters() {
        let (mut model, source) = mounted(FakeSource::new(4)).await;
        model.on_page_change(3);
        settle(&mut model).await;

        let start = Instant::now();
        let ms = |v: u64| start + Duration::from_millis(v);
        model.filter_change_at(FilterKey::SenderFio, "I".into(), ms(0));
        model.filter_change_at(FilterKey::SenderFio, "Iv".into(), ms(100));
        model.filter_change_at(FilterKey::SenderFio, "Iva".into(), ms(200));
        model.filter_change_at(FilterKey::SenderEmail, "x@".into(), ms(300));
        assert_eq!(model.page.current_page, 1);

        model.poll(ms(1000));
        assert!(!model.loading);
        model.poll(ms(1300));
        assert!(model.loading);
        settle(&mut model).await;
        model.poll(ms(5000));

        let calls = source.calls();
        assert_eq!(calls.len(), 3);
        let last = calls.last().unwrap();
        assert_eq!(last.page, 1);
        assert_eq!(last.filters.get(FilterKey::SenderFio), "Iva");
        assert_eq!(last.filters.get(FilterKey::SenderEmail), "x@");
        assert!(!model.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_older_response_never_wins() {
        let source = FakeSource::new(5).with_delay(2, Duration::from_millis(500));
        let (mut model, _) = mounted(source).await;

        model.on_page_change(2);
        model.on_page_change(3);
        settle(&mut model).await;
        settle(&mut model).await;

        assert_eq!(model.page.current_page, 3);
        assert_eq!(model.rows[0].sender_fio, "page 3");
        assert!(!model.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_outcome_leaves_state_and_flag_alone() {
        let (mut model, _) = mounted(FakeSource::new(5)).await;
        let before = model.rows.clone();

        model.on_page_change(2);
        assert!(model.loading);
        model.apply_outcome(FetchOutcome {
            generation: 1,
            query: model.query(),
            result: FetchResult::Loaded(PageResponse {
                data: Vec::new(),
                total_pages: 99,
            }),
        });

        assert!(model.loading);
        assert_eq!(model.rows, before);
        assert_eq!(model.page.total_pages, 5);

        settle(&mut model).await;
        assert!(!model.loading);
        assert_eq!(model.rows[0].sender_fio, "page 2");
    }

    #[tokio::test(start_paused = true)]
    async fn page_size_change_resets_page_and_fetches_now() {
        let (mut model, source) = mounted(FakeSource::new(5)).await;
        model.update(Some(Message::LastPage));
        settle(&mut model).await;
        assert_eq!(model.page.current_page, 5);

        model.update(Some(Message::PageSizeUp));
        assert_eq!(model.page.current_page, 1);
        assert_eq!(model.page.page_size, PageSize::Twenty);
        assert!(model.loading);
        assert!(!model.client.has_pending());

        settle(&mut model).await;
        let last = source.calls().last().cloned().unwrap();
        assert_eq!(last.page, 1);
        assert_eq!(last.size, PageSize::Twenty);
        assert_eq!(model.rows[0].sender_email, "size 20");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_keeps_previous_rows() {
        let (mut model, _) = mounted(FakeSource::new(5).failing(2)).await;
        model.update(Some(Message::NextPage));
        settle(&mut model).await;

        assert!(!model.loading);
        assert_eq!(model.rows[0].sender_fio, "page 1");
        assert_eq!(model.page.total_pages, 5);
        assert!(model.status_message.starts_with("Failed to fetch data"));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_navigation_does_not_fetch() {
        let (mut model, source) = mounted(FakeSource::new(0)).await;
        for msg in [
            Message::FirstPage,
            Message::PreviousPage,
            Message::NextPage,
            Message::LastPage,
            Message::PageSizeDown,
        ] {
            model.update(Some(msg));
        }
        assert!(!model.loading);
        assert_eq!(source.calls().len(), 1);
        assert_eq!(model.page.pagination().label, "1 of 0");
    }

    #[tokio::test(start_paused = true)]
    async fn page_jump_fetches_immediately_and_clamps() {
        let (mut model, source) = mounted(FakeSource::new(5)).await;
        model.update(Some(Message::FocusPageJump));
        assert!(model.raw_keyevents());

        model.update(Some(key('x')));
        model.update(Some(key('0')));
        assert_eq!(source.calls().len(), 1);

        model.update(Some(Message::RawKey(KeyEvent::new(
            KeyCode::Backspace,
            KeyModifiers::NONE,
        ))));
        model.update(Some(key('4')));
        assert!(model.loading);
        settle(&mut model).await;
        assert_eq!(model.page.current_page, 4);

        model.update(Some(key('2')));
        settle(&mut model).await;
        assert_eq!(model.page.current_page, 5);
        assert_eq!(source.calls().last().unwrap().page, 5);

        model.update(Some(Message::Exit));
        assert!(!model.raw_keyevents());
        assert!(model.page_jump.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn typed_filter_reads_back_unchanged() {
        let (mut model, _) = mounted(FakeSource::new(5)).await;
        model.update(Some(Message::FocusNext));
        model.update(Some(Message::FocusNext));
        assert_eq!(model.focus, Focus::Filter(FilterKey::SenderEmail));

        for chr in "ann@".chars() {
            model.update(Some(key(chr)));
        }
        assert_eq!(model.uidata().filters.get(FilterKey::SenderEmail), "ann@");
        assert!(model.client.has_pending());
        assert!(!model.loading);

        model.on_filter_change(FilterKey::Message, "Привет".to_string());
        assert_eq!(model.uidata().filters.get(FilterKey::Message), "Привет");
    }

    #[tokio::test(start_paused = true)]
    async fn record_and_help_popups() {
        let (mut model, _) = mounted(FakeSource::new(5)).await;
        model.update(Some(Message::Enter));
        assert_eq!(model.modus, Modus::Record);
        model.update(Some(Message::NextPage));
        assert_eq!(model.page.current_page, 1);
        model.update(Some(Message::Exit));
        assert_eq!(model.modus, Modus::Table);

        model.update(Some(Message::Help));
        assert_eq!(model.modus, Modus::Help);
        model.update(Some(Message::Quit));
        assert_eq!(model.status, Status::Quitting);
    }
}
