use std::fmt;

use ratatui::text::Line;

use crate::record::Fields;

pub const NO_DATA_MESSAGE: &str = "No data found";
pub const COLUMN_WIDTH_MARGIN: usize = 2;
pub const MAX_COLUMN_WIDTH: usize = 48;

/// Caller supplied cell content for one column.
pub type CellRender<R> = Box<dyn Fn(&R) -> Line<'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            SortOrder::Asc => "▲",
            SortOrder::Desc => "▼",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column bound to a record field.
pub struct DataColumn<R> {
    field: String,
    label: String,
    sortable: bool,
    render: Option<CellRender<R>>,
}

impl<R> DataColumn<R> {
    pub fn new(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
            sortable: false,
            render: None,
        }
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn render(mut self, render: impl Fn(&R) -> Line<'static> + 'static) -> Self {
        self.render = Some(Box::new(render));
        self
    }
}

/// A column without a backing field. Its content always comes from `render`.
pub struct ActionColumn<R> {
    label: String,
    render: CellRender<R>,
}

impl<R> ActionColumn<R> {
    pub fn new(label: impl Into<String>, render: impl Fn(&R) -> Line<'static> + 'static) -> Self {
        Self {
            label: label.into(),
            render: Box::new(render),
        }
    }
}

pub enum Column<R> {
    Data(DataColumn<R>),
    Action(ActionColumn<R>),
}

impl<R> From<DataColumn<R>> for Column<R> {
    fn from(column: DataColumn<R>) -> Self {
        Column::Data(column)
    }
}

impl<R> From<ActionColumn<R>> for Column<R> {
    fn from(column: ActionColumn<R>) -> Self {
        Column::Action(column)
    }
}

impl<R: Fields> Column<R> {
    pub fn label(&self) -> &str {
        match self {
            Column::Data(c) => &c.label,
            Column::Action(c) => &c.label,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Column::Data(c) => Some(&c.field),
            Column::Action(_) => None,
        }
    }

    pub fn is_sortable(&self) -> bool {
        matches!(self, Column::Data(c) if c.sortable)
    }

    fn cell(&self, record: &R) -> Line<'static> {
        match self {
            Column::Data(DataColumn {
                render: Some(render),
                ..
            }) => render(record),
            Column::Data(c) => Line::from(record.field_text(&c.field)),
            Column::Action(c) => (c.render)(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub label: String,
    pub sortable: bool,
    pub indicator: Option<SortOrder>,
}

impl HeaderCell {
    pub fn text(&self) -> String {
        match self.indicator {
            Some(order) => format!("{} {}", self.label, order.glyph()),
            None => self.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Rows(Vec<Vec<Line<'static>>>),
    Placeholder { span: usize, message: &'static str },
}

/// The rendered structure of one table: a header plus either the body rows
/// or the empty placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTable {
    pub header: Vec<HeaderCell>,
    pub body: Body,
}

impl RenderedTable {
    /// Number of body rows, counting the placeholder as one.
    pub fn row_count(&self) -> usize {
        match &self.body {
            Body::Rows(rows) => rows.len(),
            Body::Placeholder { .. } => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.body, Body::Placeholder { .. })
    }

    /// Width per column, large enough for header and cells up to `MAX_COLUMN_WIDTH`.
    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .header
            .iter()
            .map(|h| h.text().chars().count())
            .collect();
        if let Body::Rows(rows) = &self.body {
            for row in rows {
                for (width, cell) in widths.iter_mut().zip(row) {
                    *width = (*width).max(cell.width());
                }
            }
        }
        widths
            .into_iter()
            .map(|w| (w + COLUMN_WIDTH_MARGIN).min(MAX_COLUMN_WIDTH))
            .collect()
    }
}

/// Stateless table renderer configured with a fixed column schema.
pub struct TableView<R> {
    columns: Vec<Column<R>>,
}

impl<R: Fields> TableView<R> {
    pub fn new(columns: Vec<Column<R>>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    /// Fields of all data columns, in column order.
    pub fn data_fields(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|c| c.field())
    }

    /// Activate the header of column `index`. Sortable data columns report
    /// their field to `on_sort`, anything else is ignored.
    pub fn activate_header(&self, index: usize, on_sort: impl FnOnce(&str)) -> bool {
        match self.columns.get(index) {
            Some(Column::Data(c)) if c.sortable => {
                on_sort(&c.field);
                true
            }
            _ => false,
        }
    }

    pub fn render<'a, I>(&self, records: I, sort: Option<(&str, SortOrder)>) -> RenderedTable
    where
        I: IntoIterator<Item = &'a R>,
        R: 'a,
    {
        let header = self
            .columns
            .iter()
            .map(|c| HeaderCell {
                label: c.label().to_string(),
                sortable: c.is_sortable(),
                indicator: match (c.field(), sort) {
                    (Some(field), Some((key, order))) if field == key => Some(order),
                    _ => None,
                },
            })
            .collect();

        let rows: Vec<Vec<Line<'static>>> = records
            .into_iter()
            .map(|r| self.columns.iter().map(|c| c.cell(r)).collect())
            .collect();

        let body = if rows.is_empty() {
            Body::Placeholder {
                span: self.columns.len(),
                message: NO_DATA_MESSAGE,
            }
        } else {
            Body::Rows(rows)
        };

        RenderedTable { header, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use proptest::prelude::*;
    use serde_json::json;

    fn columns() -> Vec<Column<Record>> {
        vec![
            DataColumn::new("id", "ID").sortable().into(),
            DataColumn::new("title", "Title").sortable().into(),
            DataColumn::new("brand", "Brand").into(),
            ActionColumn::new("Actions", |r: &Record| {
                Line::from(format!("open {}", r.id().unwrap_or_default()))
            })
            .into(),
        ]
    }

    fn cell_text(table: &RenderedTable, row: usize, col: usize) -> String {
        match &table.body {
            Body::Rows(rows) => rows[row][col].to_string(),
            Body::Placeholder { .. } => panic!("expected rows"),
        }
    }

    #[test]
    fn renders_one_row_per_record_in_order() {
        let view = TableView::new(columns());
        let records = vec![
            Record::from(json!({"id": 3, "title": "c"})),
            Record::from(json!({"id": 1, "title": "a"})),
        ];
        let table = view.render(&records, None);
        assert_eq!(table.row_count(), 2);
        assert_eq!(cell_text(&table, 0, 0), "3");
        assert_eq!(cell_text(&table, 1, 1), "a");
        assert_eq!(cell_text(&table, 1, 3), "open 1");
    }

    #[test]
    fn empty_input_renders_single_placeholder() {
        let view = TableView::new(columns());
        let table = view.render(&Vec::<Record>::new(), None);
        assert_eq!(table.row_count(), 1);
        assert_eq!(
            table.body,
            Body::Placeholder {
                span: 4,
                message: NO_DATA_MESSAGE
            }
        );
    }

    #[test]
    fn missing_brand_renders_as_empty_string() {
        let view = TableView::new(columns());
        let records = vec![Record::from(json!({"id": 1, "title": "a"}))];
        let table = view.render(&records, None);
        assert_eq!(cell_text(&table, 0, 2), "");
    }

    #[test]
    fn indicator_only_on_active_sort_column() {
        let view = TableView::new(columns());
        let table = view.render(&Vec::<Record>::new(), Some(("title", SortOrder::Desc)));
        assert_eq!(table.header[0].indicator, None);
        assert_eq!(table.header[1].indicator, Some(SortOrder::Desc));
        assert_eq!(table.header[1].text(), "Title ▼");
        assert_eq!(table.header[3].indicator, None);
    }

    #[test]
    fn only_sortable_headers_report_sort_toggle() {
        let view = TableView::new(columns());
        let mut seen = Vec::new();
        assert!(view.activate_header(1, |k| seen.push(k.to_string())));
        assert!(!view.activate_header(2, |k| seen.push(k.to_string())));
        assert!(!view.activate_header(3, |k| seen.push(k.to_string())));
        assert!(!view.activate_header(9, |k| seen.push(k.to_string())));
        assert_eq!(seen, vec!["title".to_string()]);
    }

    #[test]
    fn data_column_override_replaces_field_text() {
        let view: TableView<Record> = TableView::new(vec![
            DataColumn::new("price", "Price")
                .render(|r: &Record| Line::from(format!("${}", r.field_text("price"))))
                .into(),
        ]);
        let records = vec![Record::from(json!({"price": 12.5}))];
        assert_eq!(cell_text(&view.render(&records, None), 0, 0), "$12.5");
    }

    #[test]
    fn column_widths_cover_header_and_cells() {
        let view = TableView::new(columns());
        let records = vec![Record::from(json!({"id": 1, "title": "a long title"}))];
        let widths = view.render(&records, Some(("id", SortOrder::Asc))).column_widths();
        assert_eq!(widths[0], "ID ▲".chars().count() + COLUMN_WIDTH_MARGIN);
        assert_eq!(widths[1], "a long title".len() + COLUMN_WIDTH_MARGIN);
    }

    proptest! {
        #[test]
        fn row_count_matches_record_count(titles in prop::collection::vec("[a-z]{0,8}", 1..40)) {
            let view = TableView::new(columns());
            let records: Vec<Record> = titles
                .iter()
                .map(|t| Record::from(json!({"title": t})))
                .collect();
            let table = view.render(&records, None);
            prop_assert_eq!(table.row_count(), records.len());
            for (i, t) in titles.iter().enumerate() {
                prop_assert_eq!(&cell_text(&table, i, 1), t);
            }
        }
    }
}
