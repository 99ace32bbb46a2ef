use std::time::Instant;

use ratatui::style::Stylize;
use ratatui::text::Line;
use tracing::{debug, info, trace};

use crate::catalog::Page;
use crate::detail::{DetailRequest, DetailView};
use crate::domain::{CatalogError, Message, TvConfig};
use crate::inputter::{InputResult, Inputter};
use crate::list_state::{ListState, PageRequest};
use crate::record::{Fields, Record};
use crate::table::{ActionColumn, Column, DataColumn, RenderedTable, TableView};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Screen {
    List,
    Detail,
}

/// Work the event loop has to hand to the catalog source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    Page(PageRequest),
    Detail(DetailRequest),
}

fn price_cell(record: &Record) -> Line<'static> {
    match record.field_text("price") {
        price if price.is_empty() => Line::default(),
        price => Line::from(format!("${price}")),
    }
}

pub fn catalog_columns() -> Vec<Column<Record>> {
    vec![
        DataColumn::new("id", "ID").sortable().into(),
        DataColumn::new("title", "Title").sortable().into(),
        DataColumn::new("brand", "Brand").sortable().into(),
        DataColumn::new("category", "Category").sortable().into(),
        DataColumn::new("price", "Price")
            .sortable()
            .render(price_cell)
            .into(),
        DataColumn::new("rating", "Rating").sortable().into(),
        ActionColumn::new("Actions", |_: &Record| Line::from("View detail ›".blue())).into(),
    ]
}

pub struct Model {
    pub status: Status,
    screen: Screen,
    show_help: bool,
    table: TableView<Record>,
    list: ListState,
    detail: DetailView,
    selected_row: usize,
    selected_column: usize,
    input: Inputter,
    last_input: InputResult,
    active_cmdinput: bool,
    filter_before_edit: String,
    status_message: String,
    request_started: Instant,
}

impl Model {
    /// Build the model and the request for the first page.
    pub fn init(config: &TvConfig) -> (Self, Fetch) {
        let mut model = Self {
            status: Status::Ready,
            screen: Screen::List,
            show_help: false,
            table: TableView::new(catalog_columns()),
            list: ListState::new(config.page_size),
            detail: DetailView::default(),
            selected_row: 0,
            selected_column: 0,
            input: Inputter::default(),
            last_input: InputResult::default(),
            active_cmdinput: false,
            filter_before_edit: String::new(),
            status_message: "Loading ...".to_string(),
            request_started: Instant::now(),
        };
        let first = model.list.refresh();
        (model, Fetch::Page(first))
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn list(&self) -> &ListState {
        &self.list
    }

    pub fn detail(&self) -> &DetailView {
        &self.detail
    }

    pub fn selected_row(&self) -> usize {
        self.selected_row
    }

    pub fn selected_column(&self) -> usize {
        self.selected_column
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Current line editor content while the filter value is being edited.
    pub fn filter_input(&self) -> Option<&InputResult> {
        self.active_cmdinput.then_some(&self.last_input)
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    /// Label of the column the list is filtered by.
    pub fn filter_label(&self) -> Option<&str> {
        let key = self.list.filter_key()?;
        self.table
            .columns()
            .iter()
            .find(|c| c.field() == Some(key))
            .map(|c| c.label())
    }

    pub fn rendered_table(&self) -> RenderedTable {
        let sort = self.list.sort().map(|s| (s.key.as_str(), s.order));
        self.table.render(self.list.visible_records(), sort)
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    pub fn update(&mut self, message: Message) -> Option<Fetch> {
        let message = match message {
            Message::Quit => {
                self.quit();
                return None;
            }
            Message::Resize(width, height) => {
                trace!("UI was resized to {width}x{height}");
                return None;
            }
            Message::PageLoaded { seq, result } => return self.page_loaded(seq, result),
            Message::DetailLoaded { seq, result } => {
                self.detail.complete(seq, result);
                return None;
            }
            Message::OpenDetail(id) => return Some(self.open_detail(&id)),
            other => other,
        };

        if self.show_help {
            if matches!(message, Message::Exit | Message::Help | Message::Enter) {
                self.show_help = false;
            }
            return None;
        }

        if self.active_cmdinput {
            return match message {
                Message::RawKey(key) => {
                    self.last_input = self.input.read(key);
                    self.handle_filter_input()
                }
                _ => None,
            };
        }

        match self.screen {
            Screen::List => self.update_list(message),
            Screen::Detail => self.update_detail(message),
        }
    }

    // -------------------- List screen ---------------------- //

    fn update_list(&mut self, message: Message) -> Option<Fetch> {
        let request = match message {
            Message::Help => {
                self.show_help = true;
                None
            }
            Message::MoveUp => {
                self.selected_row = self.selected_row.saturating_sub(1);
                None
            }
            Message::MoveDown => {
                let rows = self.list.visible_records().len();
                self.selected_row = (self.selected_row + 1).min(rows.saturating_sub(1));
                None
            }
            Message::MoveLeft => {
                self.selected_column = self.selected_column.saturating_sub(1);
                None
            }
            Message::MoveRight => {
                let columns = self.table.columns().len();
                self.selected_column = (self.selected_column + 1).min(columns.saturating_sub(1));
                None
            }
            Message::ToggleSort => {
                let list = &mut self.list;
                let mut request = None;
                self.table.activate_header(self.selected_column, |key| {
                    request = Some(list.toggle_sort(key));
                });
                request
            }
            Message::CycleFilterField => self.cycle_filter_field(),
            Message::EditFilter => self.edit_filter(),
            Message::ClearFilter => self.list.set_filter(None, ""),
            Message::NextPage => self.list.next_page(),
            Message::PrevPage => self.list.previous_page(),
            Message::FirstPage => self.list.first_page(),
            Message::LastPage => self.list.last_page(),
            Message::CyclePageSize => self.list.cycle_page_size(),
            Message::Refresh => Some(self.list.refresh()),
            Message::Enter => {
                let id = self
                    .list
                    .visible_records()
                    .get(self.selected_row)
                    .and_then(|r| r.id());
                return id.map(|id| self.open_detail(&id));
            }
            _ => None,
        };
        request.map(|request| {
            self.request_started = Instant::now();
            Fetch::Page(request)
        })
    }

    fn cycle_filter_field(&mut self) -> Option<PageRequest> {
        let fields: Vec<&str> = self.table.data_fields().collect();
        let next = match self.list.filter_key() {
            None => fields.first().copied(),
            Some(key) => fields
                .iter()
                .position(|f| *f == key)
                .and_then(|idx| fields.get(idx + 1))
                .copied(),
        };
        let value = match next {
            Some(_) => self.list.filter_value().to_string(),
            None => String::new(),
        };
        debug!("Filter field {:?} => {:?}", self.list.filter_key(), next);
        let next = next.map(str::to_string);
        self.list.set_filter(next.as_deref(), &value)
    }

    fn edit_filter(&mut self) -> Option<PageRequest> {
        trace!("Entering filter input ...");
        let request = match self.list.filter_key() {
            Some(_) => None,
            None => {
                let key = self
                    .table
                    .data_fields()
                    .find(|f| *f == "title")
                    .or_else(|| self.table.data_fields().next())
                    .map(str::to_string);
                self.list.set_filter(key.as_deref(), "")
            }
        };
        self.filter_before_edit = self.list.filter_value().to_string();
        self.input.set(&self.filter_before_edit);
        self.last_input = self.input.get();
        self.active_cmdinput = true;
        request
    }

    fn handle_filter_input(&mut self) -> Option<Fetch> {
        let key = self.list.filter_key().map(str::to_string);
        let value = if self.last_input.canceled {
            self.filter_before_edit.clone()
        } else {
            self.last_input.input.clone()
        };
        if self.last_input.finished {
            trace!("Leaving filter input with {value:?}");
            self.active_cmdinput = false;
        }
        self.selected_row = 0;
        let request = self.list.set_filter(key.as_deref(), &value)?;
        self.request_started = Instant::now();
        Some(Fetch::Page(request))
    }

    fn page_loaded(&mut self, seq: u64, result: Result<Page, CatalogError>) -> Option<Fetch> {
        let received = result.as_ref().map(|page| page.records.len()).ok();
        if !self.list.complete(seq, result) {
            return None;
        }
        let count = received?;
        if let Some(request) = self.list.clamp_page() {
            debug!("Page out of range after load, now {}", self.list.page());
            self.selected_row = 0;
            self.request_started = Instant::now();
            return Some(Fetch::Page(request));
        }
        let elapsed = self.request_started.elapsed().as_millis();
        info!("Loaded {count} records in {elapsed}ms");
        self.status_message = format!(
            "Loaded {count} of {} in {elapsed}ms",
            self.list.total()
        );
        let rows = self.list.visible_records().len();
        self.selected_row = self.selected_row.min(rows.saturating_sub(1));
        None
    }

    // -------------------- Detail screen ---------------------- //

    fn open_detail(&mut self, id: &str) -> Fetch {
        self.screen = Screen::Detail;
        Fetch::Detail(self.detail.open(id))
    }

    fn update_detail(&mut self, message: Message) -> Option<Fetch> {
        match message {
            Message::Help => self.show_help = true,
            Message::Exit => {
                self.detail.close();
                self.screen = Screen::List;
            }
            Message::MoveDown => self.detail.scroll = self.detail.scroll.saturating_add(1),
            Message::MoveUp => self.detail.scroll = self.detail.scroll.saturating_sub(1),
            Message::NextPage => self.detail.scroll = self.detail.scroll.saturating_add(10),
            Message::PrevPage => self.detail.scroll = self.detail.scroll.saturating_sub(10),
            Message::FirstPage => self.detail.scroll = 0,
            Message::Refresh => {
                let id = self.detail.id()?.to_string();
                return Some(self.open_detail(&id));
            }
            _ => {}
        }
        None
    }
}
