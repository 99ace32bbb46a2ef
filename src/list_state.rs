use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace, warn};

use crate::catalog::Page;
use crate::domain::CatalogError;
use crate::record::{Fields, Record, compare_values};
use crate::table::SortOrder;

pub const PAGE_SIZES: [usize; 4] = [5, 10, 20, 30];

/// Number of records per page, restricted to `PAGE_SIZES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(usize);

impl PageSize {
    pub fn new(size: usize) -> Option<Self> {
        PAGE_SIZES.contains(&size).then_some(PageSize(size))
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// The next size in `PAGE_SIZES`, wrapping around.
    pub fn next(self) -> Self {
        let idx = PAGE_SIZES.iter().position(|&s| s == self.0).unwrap_or(0);
        PageSize(PAGE_SIZES[(idx + 1) % PAGE_SIZES.len()])
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let size: usize = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
        PageSize::new(size).ok_or_else(|| format!("page size must be one of {PAGE_SIZES:?}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub key: String,
    pub order: SortOrder,
}

/// Filter clause understood by the catalog source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFilter {
    /// Free text search over the whole record.
    Search(String),
    /// Exact category path.
    Category(String),
}

impl RemoteFilter {
    pub fn for_field(key: &str, value: &str) -> Option<Self> {
        match key {
            "category" => Some(RemoteFilter::Category(value.to_string())),
            "title" => Some(RemoteFilter::Search(value.to_string())),
            _ => None,
        }
    }
}

/// Parameters of one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub limit: usize,
    pub skip: usize,
    pub sort: Option<Sort>,
    pub filter: Option<RemoteFilter>,
}

/// A query tagged with the sequence number it was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub seq: u64,
    pub query: Query,
}

/// Paging, sorting and filtering state of the product list together with
/// the last page received from the catalog.
///
/// Every transition that changes the state returns the `PageRequest` that
/// has to be sent. Responses are applied through `complete`, which ignores
/// anything but the most recently issued request.
#[derive(Debug, Clone)]
pub struct ListState {
    page: usize,
    page_size: PageSize,
    sort: Option<Sort>,
    filter_key: Option<String>,
    filter_value: String,
    records: Vec<Record>,
    total: usize,
    issued: u64,
}

impl ListState {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page: 1,
            page_size,
            sort: None,
            filter_key: None,
            filter_value: String::new(),
            records: Vec::new(),
            total: 0,
            issued: 0,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn filter_key(&self) -> Option<&str> {
        self.filter_key.as_deref()
    }

    pub fn filter_value(&self) -> &str {
        &self.filter_value
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size.get())
    }

    fn last_valid_page(&self) -> usize {
        self.total_pages().max(1)
    }

    fn issue(&mut self) -> PageRequest {
        self.issued += 1;
        let request = PageRequest {
            seq: self.issued,
            query: derive_query(self),
        };
        debug!("Issue page request {:?}", request);
        request
    }

    /// Re-issue the current query.
    pub fn refresh(&mut self) -> PageRequest {
        self.issue()
    }

    pub fn set_page(&mut self, page: usize) -> Option<PageRequest> {
        let page = page.clamp(1, self.last_valid_page());
        if page == self.page {
            return None;
        }
        self.page = page;
        Some(self.issue())
    }

    pub fn next_page(&mut self) -> Option<PageRequest> {
        self.set_page(self.page + 1)
    }

    pub fn previous_page(&mut self) -> Option<PageRequest> {
        self.set_page(self.page.saturating_sub(1))
    }

    pub fn first_page(&mut self) -> Option<PageRequest> {
        self.set_page(1)
    }

    pub fn last_page(&mut self) -> Option<PageRequest> {
        self.set_page(self.last_valid_page())
    }

    pub fn set_page_size(&mut self, page_size: PageSize) -> Option<PageRequest> {
        if page_size == self.page_size && self.page == 1 {
            return None;
        }
        self.page_size = page_size;
        self.page = 1;
        Some(self.issue())
    }

    pub fn cycle_page_size(&mut self) -> Option<PageRequest> {
        self.set_page_size(self.page_size.next())
    }

    pub fn toggle_sort(&mut self, key: &str) -> PageRequest {
        self.sort = match self.sort.take() {
            Some(Sort { key: active, order }) if active == key => Some(Sort {
                key: active,
                order: order.flipped(),
            }),
            _ => Some(Sort {
                key: key.to_string(),
                order: SortOrder::Asc,
            }),
        };
        self.issue()
    }

    /// Change the filter field and value. A request is only issued if the
    /// query sent to the catalog changes; otherwise the new filter applies
    /// to the current page locally.
    pub fn set_filter(&mut self, key: Option<&str>, value: &str) -> Option<PageRequest> {
        if key == self.filter_key.as_deref() && value == self.filter_value {
            return None;
        }
        let before = derive_query(self);
        self.filter_key = key.map(str::to_string);
        self.filter_value = value.to_string();
        if derive_query(self) == before {
            trace!("Filter changed locally only");
            return None;
        }
        Some(self.issue())
    }

    /// Pull the page back into range after the total shrank.
    pub fn clamp_page(&mut self) -> Option<PageRequest> {
        self.set_page(self.page)
    }

    /// Apply the outcome of request `seq`. Returns false if the response was
    /// stale and has been dropped.
    pub fn complete(&mut self, seq: u64, result: Result<Page, CatalogError>) -> bool {
        if seq != self.issued {
            trace!("Dropping stale page response {seq}, latest is {}", self.issued);
            return false;
        }
        match result {
            Ok(page) => {
                debug!(
                    "Received {} records, total {} for request {seq}",
                    page.records.len(),
                    page.total
                );
                self.records = page.records;
                self.total = page.total;
            }
            Err(err) => {
                warn!("Page request {seq} failed: {err}");
            }
        }
        true
    }

    /// The current page after the local filter and sort pass.
    pub fn visible_records(&self) -> Vec<&Record> {
        let mut records: Vec<&Record> = self.records.iter().collect();
        if let Some(key) = self.filter_key.as_deref() {
            records = local_filter(records, key, &self.filter_value);
        }
        if let Some(sort) = &self.sort {
            local_sort(&mut records, &sort.key, sort.order);
        }
        records
    }
}

pub fn derive_query(state: &ListState) -> Query {
    let limit = state.page_size.get();
    let filter = match state.filter_key.as_deref() {
        Some(key) if !key.is_empty() && !state.filter_value.is_empty() => {
            RemoteFilter::for_field(key, &state.filter_value)
        }
        _ => None,
    };
    Query {
        limit,
        skip: (state.page - 1) * limit,
        sort: state.sort.clone(),
        filter,
    }
}

/// Keep records whose `key` field contains `value`, ignoring case.
/// An empty `value` keeps everything.
pub fn local_filter<'a, R: Fields>(records: Vec<&'a R>, key: &str, value: &str) -> Vec<&'a R> {
    if value.is_empty() {
        return records;
    }
    let needle = value.to_lowercase();
    records
        .into_iter()
        .filter(|r| r.field_text(key).to_lowercase().contains(&needle))
        .collect()
}

/// Stable sort by the `key` field.
pub fn local_sort<R: Fields>(records: &mut [&R], key: &str, order: SortOrder) {
    records.sort_by(|a, b| {
        let ord = compare_values(a.field(key), b.field(key));
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}
