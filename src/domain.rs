use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;

use crate::catalog::Page;
use crate::detail::Product;
use crate::list_state::PageSize;

pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com";
pub const DEFAULT_RESOURCE: &str = "products";

pub const HELP_TEXT: &str = "\
List
  q            quit
  ?            this help
  j/k ↓/↑      select row
  h/l ←/→      select column
  s            sort by selected column (again to reverse)
  f            choose filter field
  /            edit filter value (Enter keep, Esc undo)
  x            clear filter
  n/p          next / previous page
  g/G          first / last page
  z            change page size
  r            reload page
  Enter        open product details

Details
  j/k ↓/↑      scroll
  Esc          back to list";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("Record {0} not found")]
    NotFound(String),
    #[error("Config error: {0}")]
    Config(String),
}

/// Runtime settings of the browser.
#[derive(Debug, Clone, Setters)]
#[setters(into)]
pub struct TvConfig {
    pub base_url: String,
    pub resource: String,
    pub page_size: PageSize,
    pub timeout_ms: Option<u64>,
    pub event_poll_time: u64,
}

impl Default for TvConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            resource: DEFAULT_RESOURCE.to_string(),
            page_size: PageSize::default(),
            timeout_ms: None,
            event_poll_time: 100,
        }
    }
}

#[derive(Debug)]
pub enum Message {
    Quit,
    Help,
    Exit,
    Enter,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    ToggleSort,
    CycleFilterField,
    EditFilter,
    ClearFilter,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    CyclePageSize,
    Refresh,
    Resize(u16, u16),
    RawKey(KeyEvent),
    OpenDetail(String),
    PageLoaded {
        seq: u64,
        result: Result<Page, CatalogError>,
    },
    DetailLoaded {
        seq: u64,
        result: Result<Product, CatalogError>,
    },
}
