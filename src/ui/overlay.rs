use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use unicode_width::UnicodeWidthChar;

use crate::picker::{OverlayGeometry, PickerView};

/// Upper bound on visible list rows; longer rosters scroll behind the
/// sentinel-driven paging.
pub const MAX_LIST_ROWS: usize = 8;

/// Rows the panel spends on non-list content: two borders, the search
/// input and the separator.
const PANEL_CHROME_ROWS: u16 = 4;

const INITIAL_SPINNER_ROWS: u16 = 3;

/// Resolves the panel rect for this frame. Geometry fixes top/left/width;
/// height follows content, clamped to the terminal area.
pub fn panel_rect(geometry: OverlayGeometry, area: Rect, view: &PickerView) -> Rect {
    let rows = if view.initial_loading {
        INITIAL_SPINNER_ROWS
    } else {
        list_row_count(view).clamp(1, MAX_LIST_ROWS) as u16
    };

    let left = geometry.left.min(area.x + area.width);
    let top = geometry.top.min(area.y + area.height);
    let width = geometry
        .width
        .min((area.x + area.width).saturating_sub(left));
    let height = (rows + PANEL_CHROME_ROWS).min((area.y + area.height).saturating_sub(top));

    Rect::new(left, top, width, height)
}

/// List rows the panel can show once chrome is subtracted.
pub fn list_capacity(panel: Rect) -> usize {
    panel.height.saturating_sub(PANEL_CHROME_ROWS) as usize
}

/// Scroll window over `row_count` rows keeping `selected` visible,
/// roughly centered once the list outgrows the capacity.
pub fn list_window(row_count: usize, selected: usize, capacity: usize) -> (usize, usize) {
    if capacity == 0 || row_count == 0 {
        return (0, 0);
    }

    let selected = selected.min(row_count.saturating_sub(1));
    let start = if row_count <= capacity || selected < capacity / 2 {
        0
    } else if selected >= row_count - capacity.div_ceil(2) {
        row_count - capacity
    } else {
        selected - capacity / 2
    };
    (start, (start + capacity).min(row_count))
}

/// Whether the sentinel row (the virtual row after the last item) falls
/// inside the visible window.
pub fn sentinel_visible(
    item_count: usize,
    has_more: bool,
    selected: usize,
    capacity: usize,
) -> bool {
    if !has_more {
        return false;
    }
    let (start, end) = list_window(item_count + 1, selected, capacity);
    (start..end).contains(&item_count)
}

/// Maps a terminal row inside the panel to an item index, for mouse
/// selection. `None` for chrome rows and the sentinel row.
pub fn list_row_at(panel: Rect, view: &PickerView, y: u16) -> Option<usize> {
    if view.initial_loading {
        return None;
    }
    let list_top = panel.y.checked_add(3)?;
    if y < list_top {
        return None;
    }
    let offset = (y - list_top) as usize;
    let capacity = list_capacity(panel);
    if offset >= capacity {
        return None;
    }

    let (start, end) = list_window(list_row_count(view), view.selected_idx, capacity);
    let index = start + offset;
    if index >= end || index >= view.items.len() {
        return None;
    }
    Some(index)
}

fn list_row_count(view: &PickerView) -> usize {
    let extra = usize::from(view.has_more || view.incremental_loading);
    view.items.len().max(1) + extra
}

pub fn draw_picker_overlay(
    frame: &mut Frame<'_>,
    area: Rect,
    geometry: OverlayGeometry,
    view: &PickerView,
) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let panel = panel_rect(geometry, area, view);
    if panel.width < 4 || panel.height < 3 {
        return;
    }
    frame.render_widget(Clear, panel);

    let block = Block::default()
        .title(format!(" {} ", view.placeholder))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(panel);
    frame.render_widget(block, panel);

    if inner.width == 0 || inner.height < 3 {
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Input
            Constraint::Length(1), // Separator
            Constraint::Min(1),    // List
        ])
        .split(inner);

    // Software caret; the terminal cursor stays hidden to avoid ghosting.
    let input_line = build_search_input_line(&view.input, view.cursor, chunks[0].width as usize);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    let sep_style = Style::default().fg(Color::DarkGray);
    frame.render_widget(
        Paragraph::new("─".repeat(inner.width as usize)).style(sep_style),
        chunks[1],
    );

    let list_area = chunks[2];
    if view.initial_loading {
        let spinner = Paragraph::new("Loading members...")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(spinner, list_area);
        return;
    }

    let capacity = list_area.height as usize;
    let (start, end) = list_window(list_row_count(view), view.selected_idx, capacity);

    let mut lines = Vec::new();
    for row in start..end {
        if row < view.items.len() {
            lines.push(item_line(view, row, inner.width as usize));
        } else if view.incremental_loading {
            lines.push(Line::from(Span::styled(
                "   Loading more...",
                Style::default().fg(Color::Yellow),
            )));
        } else {
            // Sentinel row: renders blank, only its visibility matters.
            lines.push(Line::from(""));
        }
    }
    frame.render_widget(Paragraph::new(lines), list_area);
}

fn item_line(view: &PickerView, row: usize, width: usize) -> Line<'static> {
    let item = &view.items[row];
    let mut spans = Vec::new();

    if item.selected {
        spans.push(Span::styled(" ┃ ", Style::default().fg(Color::White)));
    } else {
        spans.push(Span::raw("   "));
    }

    let label = fit_width(&item.label, width.saturating_sub(3));
    let mut used = 3 + display_width(&label);
    spans.push(Span::raw(label));

    if let Some(detail) = &item.detail {
        let detail = fit_width(detail, width.saturating_sub(used + 2));
        if !detail.is_empty() {
            used += 2 + display_width(&detail);
            spans.push(Span::raw("  "));
            spans.push(Span::styled(detail, Style::default().fg(Color::DarkGray)));
        }
    }

    let line_style = if item.selected {
        Style::default().bg(Color::Rgb(45, 45, 50))
    } else {
        Style::default()
    };
    spans.push(Span::raw(" ".repeat(width.saturating_sub(used))));
    Line::from(spans).style(line_style)
}

fn build_search_input_line(input: &str, cursor: usize, width: usize) -> Line<'static> {
    let prefix_spans = vec![
        Span::raw(" ".to_string()),
        Span::styled("> ".to_string(), Style::default().fg(Color::White)),
    ];
    let prefix_width = 3;
    let max_text_width = width.saturating_sub(prefix_width);

    let chars: Vec<char> = input.chars().collect();
    let char_count = chars.len();
    let cursor = cursor.min(char_count);

    let mut start = 0usize;
    if max_text_width > 0 {
        if cursor >= max_text_width {
            start = cursor.saturating_sub(max_text_width.saturating_sub(1));
        }
        if start > char_count {
            start = char_count;
        }
    } else {
        start = char_count;
    }

    let text_width = max_text_width.max(1);
    let end = (start + text_width).min(char_count);
    let mut visible: Vec<char> = chars[start..end].to_vec();
    if visible.len() < text_width {
        visible.extend(std::iter::repeat_n(' ', text_width - visible.len()));
    }

    let caret_idx = cursor
        .saturating_sub(start)
        .min(text_width.saturating_sub(1));

    let mut spans = prefix_spans;
    for (idx, ch) in visible.into_iter().enumerate() {
        if idx == caret_idx {
            spans.push(Span::styled(ch.to_string(), Style::default().reversed()));
        } else {
            spans.push(Span::raw(ch.to_string()));
        }
    }
    Line::from(spans)
}

fn fit_width(text: &str, max: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > max {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

fn display_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}
