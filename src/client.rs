use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::debounce::Debouncer;
use crate::domain::{ViewerConfig, ViewerError};
use crate::records::{PageQuery, PageResponse};

/// Anything that can serve one page of filtered messages.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, ViewerError>;
}

/// `GET {base}/messages?page=..&size=..&filters[..]=..`
///
/// Requests that outlive the timeout fail like any other transport error.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ViewerError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ViewerError::InvalidConfig(format!(
                "api url must start with http:// or https://, got {base_url:?}"
            )));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, ViewerError> {
        let url = format!("{}/messages", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&query.query_pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ViewerError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[derive(Debug)]
pub enum FetchResult {
    Loaded(PageResponse),
    Cancelled,
    Failed(String),
}

/// Settlement of one fetch, tagged with the generation that issued it.
#[derive(Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub query: PageQuery,
    pub result: FetchResult,
}

/// Issues page requests with at most one request whose result counts.
///
/// Every new fetch cancels the previous one's token and bumps the
/// generation. Settled requests are delivered through a channel and the
/// owner decides with `is_current` whether to apply them.
pub struct DataClient {
    source: Arc<dyn PageSource>,
    runtime: Handle,
    tx: UnboundedSender<FetchOutcome>,
    rx: UnboundedReceiver<FetchOutcome>,
    cancel: Option<CancellationToken>,
    generation: u64,
    debouncer: Debouncer<PageQuery>,
}

impl DataClient {
    pub fn new(source: Arc<dyn PageSource>, runtime: Handle, config: &ViewerConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            runtime,
            tx,
            rx,
            cancel: None,
            generation: 0,
            debouncer: Debouncer::new(config.debounce),
        }
    }

    /// Starts `query` right away. A pending debounced query is dropped, the
    /// new request already carries the latest state.
    pub fn fetch(&mut self, query: PageQuery) -> u64 {
        if self.debouncer.cancel() {
            trace!("Dropped pending debounced fetch");
        }
        if let Some(previous) = self.cancel.take() {
            previous.cancel();
        }

        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());

        info!(
            generation,
            page = query.page,
            size = query.size.get(),
            "Fetching messages"
        );

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => FetchResult::Cancelled,
                res = source.fetch_page(&query) => match res {
                    Ok(page) => FetchResult::Loaded(page),
                    Err(e) => FetchResult::Failed(e.to_string()),
                },
            };
            match &result {
                FetchResult::Loaded(page) => debug!(
                    generation,
                    rows = page.data.len(),
                    total_pages = page.total_pages,
                    "Fetch finished"
                ),
                FetchResult::Cancelled => {
                    info!(generation, "Request canceled: superseded by a newer request")
                }
                FetchResult::Failed(e) => error!(generation, "Failed to fetch data: {e}"),
            }
            // The receiver only goes away on shutdown.
            let _ = tx.send(FetchOutcome {
                generation,
                query,
                result,
            });
        });

        generation
    }

    pub fn fetch_debounced(&mut self, query: PageQuery, now: Instant) {
        trace!(page = query.page, "Scheduling debounced fetch");
        self.debouncer.schedule(query, now);
    }

    /// Starts the debounced query once its quiet window passed.
    pub fn tick(&mut self, now: Instant) -> Option<u64> {
        let query = self.debouncer.poll(now)?;
        Some(self.fetch(query))
    }

    pub fn has_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.cancel.is_some() && generation == self.generation
    }

    pub fn try_next(&mut self) -> Option<FetchOutcome> {
        self.rx.try_recv().ok()
    }

    #[cfg(test)]
    pub async fn next_outcome(&mut self) -> Option<FetchOutcome> {
        self.rx.recv().await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::records::{FilterKey, MessageRow};

    /// Serves one row per page describing the query it answered.
    #[derive(Default)]
    pub struct FakeSource {
        pub total_pages: u32,
        pub delays: HashMap<u32, Duration>,
        pub failing_pages: Vec<u32>,
        pub calls: Mutex<Vec<PageQuery>>,
    }

    impl FakeSource {
        pub fn new(total_pages: u32) -> Self {
            Self {
                total_pages,
                ..Default::default()
            }
        }

        pub fn with_delay(mut self, page: u32, delay: Duration) -> Self {
            self.delays.insert(page, delay);
            self
        }

        pub fn failing(mut self, page: u32) -> Self {
            self.failing_pages.push(page);
            self
        }

        pub fn calls(&self) -> Vec<PageQuery> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch_page(&self, query: &PageQuery) -> Result<PageResponse, ViewerError> {
            self.calls.lock().unwrap().push(query.clone());
            if let Some(delay) = self.delays.get(&query.page) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing_pages.contains(&query.page) {
                return Err(ViewerError::Status(500));
            }
            Ok(PageResponse {
                data: vec![MessageRow {
                    sender_fio: format!("page {}", query.page),
                    sender_email: format!("size {}", query.size.get()),
                    message_date: 0,
                    message: query.filters.get(FilterKey::Message).to_string(),
                }],
                total_pages: self.total_pages,
            })
        }
    }
}
