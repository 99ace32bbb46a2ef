use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::detail::{DetailState, sections};
use crate::domain::HELP_TEXT;
use crate::model::{Model, Screen};
use crate::table::{Body, RenderedTable};

pub const FILTER_BAR_HEIGHT: u16 = 1;
pub const FOOTER_HEIGHT: u16 = 1;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const TABLE_HEADER_HEIGHT: u16 = 1;

pub fn draw(model: &Model, frame: &mut Frame) {
    match model.screen() {
        Screen::List => draw_list(model, frame),
        Screen::Detail => draw_detail(model, frame),
    }
    if model.show_help() {
        draw_popup(frame, " Help ", HELP_TEXT);
    }
}

fn draw_list(model: &Model, frame: &mut Frame) {
    let [filter_area, table_area, footer_area, status_area] = Layout::vertical([
        Constraint::Length(FILTER_BAR_HEIGHT),
        Constraint::Min(TABLE_HEADER_HEIGHT + 2),
        Constraint::Length(FOOTER_HEIGHT),
        Constraint::Length(STATUSLINE_HEIGHT),
    ])
    .areas(frame.area());

    draw_filter_bar(model, frame, filter_area);
    draw_table(model, &model.rendered_table(), frame, table_area);
    draw_footer(model, frame, footer_area);
    frame.render_widget(
        Paragraph::new(model.status_message().to_string()).dark_gray(),
        status_area,
    );
}

fn draw_filter_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let list = model.list();
    let field = model.filter_label().unwrap_or("none");
    let prefix = format!(" Filter by {field}: ");

    let line = match model.filter_input() {
        Some(input) => {
            let x = area.x + (prefix.chars().count() + input.cursor_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            Line::from(vec![prefix.bold(), input.input.clone().yellow()])
        }
        None if list.filter_key().is_none() => Line::from(vec![
            prefix.bold(),
            "<f> choose field  </> enter value".dark_gray(),
        ]),
        None => Line::from(vec![prefix.bold(), list.filter_value().to_string().yellow()]),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_table(model: &Model, rendered: &RenderedTable, frame: &mut Frame, area: Rect) {
    let header = Row::new(rendered.header.iter().enumerate().map(|(idx, h)| {
        let mut style = Style::new().add_modifier(Modifier::BOLD);
        if h.sortable {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if idx == model.selected_column() {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Cell::from(h.text()).style(style)
    }))
    .height(TABLE_HEADER_HEIGHT);

    let rows: Vec<Row> = match &rendered.body {
        Body::Rows(rows) => rows
            .iter()
            .map(|cells| Row::new(cells.iter().cloned().map(Cell::from)))
            .collect(),
        Body::Placeholder { .. } => Vec::new(),
    };

    let widths = rendered
        .column_widths()
        .into_iter()
        .map(|w| Constraint::Length(w as u16));

    let block = Block::bordered()
        .title(Line::from(" Product List ".bold()).centered())
        .title_bottom(Line::from(vec![" Help ".into(), "<?> ".blue().bold()]).centered())
        .border_set(border::THICK);
    let inner = block.inner(area);

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(Style::new().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    if !rendered.is_empty() {
        state.select(Some(model.selected_row().min(rendered.row_count() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut state);

    if let Body::Placeholder { span, message } = &rendered.body
        && inner.height > TABLE_HEADER_HEIGHT
    {
        let widths = rendered.column_widths();
        let spanned: usize = widths.iter().take(*span).sum::<usize>() + span.saturating_sub(1);
        let width = (spanned as u16).min(inner.width);
        let placeholder = Rect::new(inner.x, inner.y + TABLE_HEADER_HEIGHT, width, 1);
        frame.render_widget(Paragraph::new(*message).centered().italic(), placeholder);
    }
}

fn draw_footer(model: &Model, frame: &mut Frame, area: Rect) {
    let list = model.list();
    let mut spans: Vec<Span> = vec![
        format!(" Page {} of {}", list.page(), list.total_pages().max(1)).bold(),
        format!("  |  {} rows  |  {} total", list.page_size(), list.total()).into(),
    ];
    let fetched = list.records().len();
    let matching = list.visible_records().len();
    if matching < fetched {
        spans.push(format!("  |  {matching} of {fetched} match on this page").into());
    }
    if let Some(sort) = list.sort() {
        spans.push(format!("  |  sort {} {}", sort.key, sort.order.glyph()).into());
    }
    spans.push("   <n>/<p> page  <z> size  <s> sort  <Enter> details  <q> quit".dark_gray());
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_detail(model: &Model, frame: &mut Frame) {
    let detail = model.detail();
    let id = detail.id().unwrap_or_default();
    let block = Block::bordered()
        .title(Line::from(format!(" Product {id} ").bold()).centered())
        .title_bottom(Line::from(vec![" Back ".into(), "<Esc> ".blue().bold()]).centered())
        .border_set(border::THICK);

    let text = match detail.state() {
        DetailState::Loading => Text::from(format!("Loading product {id} ...")).centered(),
        DetailState::NotFound => Text::from(vec![
            Line::from("404".bold()),
            Line::from(format!("Product {id} could not be found.")),
        ])
        .centered(),
        DetailState::Loaded(product) => {
            let mut lines = Vec::new();
            for (idx, section) in sections(product).into_iter().enumerate() {
                if !section.title.is_empty() {
                    lines.push(Line::from(section.title.bold().underlined()));
                }
                for (line_idx, line) in section.lines.into_iter().enumerate() {
                    if idx == 0 && line_idx == 0 {
                        lines.push(Line::from(line.bold().yellow()));
                    } else {
                        lines.push(Line::from(line));
                    }
                }
                lines.push(Line::default());
            }
            Text::from(lines)
        }
    };

    frame.render_widget(
        Paragraph::new(text)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((detail.scroll, 0)),
        frame.area(),
    );
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

fn draw_popup(frame: &mut Frame, title: &str, message: &str) {
    let area = popup_area(frame.area(), 60, 80);
    let block = Block::bordered()
        .title(Line::from(title.to_string().bold()).centered())
        .title_bottom(Line::from(vec![" Close ".into(), "<Esc> ".blue().bold()]).centered())
        .border_set(border::THICK);
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(message.to_string()).block(block), area);
}
