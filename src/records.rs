use serde::{Deserialize, Deserializer};

/// Columns the backend can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    SenderFio,
    SenderEmail,
    Message,
}

impl FilterKey {
    pub const ALL: [FilterKey; 3] = [
        FilterKey::SenderFio,
        FilterKey::SenderEmail,
        FilterKey::Message,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            FilterKey::SenderFio => "sender_FIO",
            FilterKey::SenderEmail => "sender_email",
            FilterKey::Message => "message",
        }
    }

    fn slot(self) -> usize {
        match self {
            FilterKey::SenderFio => 0,
            FilterKey::SenderEmail => 1,
            FilterKey::Message => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    values: [String; 3],
}

impl FilterSet {
    pub fn get(&self, key: FilterKey) -> &str {
        &self.values[key.slot()]
    }

    /// Returns a copy of the set with `key` replaced.
    pub fn with(&self, key: FilterKey, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.values[key.slot()] = value.into();
        next
    }

    /// All keys, empty values included.
    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        FilterKey::ALL.into_iter().map(|k| (k, self.get(k)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    #[default]
    Ten,
    Twenty,
    Thirty,
    Forty,
    Fifty,
}

impl PageSize {
    pub const ALL: [PageSize; 5] = [
        PageSize::Ten,
        PageSize::Twenty,
        PageSize::Thirty,
        PageSize::Forty,
        PageSize::Fifty,
    ];

    pub fn get(self) -> u32 {
        match self {
            PageSize::Ten => 10,
            PageSize::Twenty => 20,
            PageSize::Thirty => 30,
            PageSize::Forty => 40,
            PageSize::Fifty => 50,
        }
    }

    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.get() == value)
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[std::cmp::min(idx + 1, Self::ALL.len() - 1)]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[idx.saturating_sub(1)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    pub current_page: u32,
    pub page_size: PageSize,
    pub total_pages: u32,
}

impl PageState {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            current_page: 1,
            page_size,
            total_pages: 0,
        }
    }

    pub fn pagination(&self) -> Pagination {
        let at_start = self.current_page == 1;
        let at_end = self.current_page == self.total_pages || self.total_pages == 0;
        Pagination {
            first_enabled: !at_start,
            previous_enabled: !at_start,
            next_enabled: !at_end,
            last_enabled: !at_end,
            label: format!("{} of {}", self.current_page, self.total_pages),
        }
    }

    pub fn previous_page(&self) -> u32 {
        std::cmp::max(self.current_page.saturating_sub(1), 1)
    }

    pub fn next_page(&self) -> u32 {
        if self.current_page < self.total_pages {
            self.current_page + 1
        } else {
            self.current_page
        }
    }
}

/// Enablement of the pagination controls for one `PageState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub first_enabled: bool,
    pub previous_enabled: bool,
    pub next_enabled: bool,
    pub last_enabled: bool,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageRow {
    #[serde(rename = "sender_FIO", default)]
    pub sender_fio: String,
    #[serde(default)]
    pub sender_email: String,
    #[serde(default, deserialize_with = "de_unix_seconds")]
    pub message_date: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Int(i64),
    Float(f64),
    Text(String),
}

// The backend sends either a JSON number or a numeric string.
fn de_unix_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Int(v) => Ok(v),
        RawTimestamp::Float(v) => Ok(v.trunc() as i64),
        RawTimestamp::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f.trunc() as i64))
                .map_err(|_| serde::de::Error::custom(format!("invalid timestamp {s:?}")))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub size: PageSize,
    pub filters: FilterSet,
}

impl PageQuery {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.size.get().to_string()),
        ];
        pairs.extend(
            self.filters
                .iter()
                .map(|(k, v)| (format!("filters[{}]", k.wire_name()), v.to_string())),
        );
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageResponse {
    #[serde(default)]
    pub data: Vec<MessageRow>,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
}
