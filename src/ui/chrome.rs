use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use crate::app::{AppState, Mode};
use crate::picker::SelectionValue;

use super::layout::UiLayout;

/// Index of the assignee row inside the demo form; the picker anchors to
/// this row.
pub const ANCHOR_ROW: u16 = 3;

const FORM_ROW_COUNT: u16 = 8;

pub fn max_form_scroll() -> u16 {
    FORM_ROW_COUNT.saturating_sub(1)
}

/// Screen rect of the assignee row for the current scroll position, or
/// `None` once it is scrolled out of the form viewport.
pub fn anchor_rect(form: Rect, scroll_y: u16) -> Option<Rect> {
    if ANCHOR_ROW < scroll_y {
        return None;
    }
    let offset = ANCHOR_ROW - scroll_y;
    if offset >= form.height {
        return None;
    }
    Some(Rect::new(form.x, form.y + offset, form.width, 1))
}

pub fn assignee_display(state: &AppState, placeholder: &str) -> String {
    match &state.selection {
        SelectionValue::Empty => placeholder.to_string(),
        SelectionValue::Unassign => "Unassigned".to_string(),
        SelectionValue::Member(id) => state
            .selection_label
            .clone()
            .unwrap_or_else(|| id.clone()),
    }
}

pub fn draw_form(frame: &mut Frame<'_>, form: Rect, state: &AppState, placeholder: &str) {
    if form.width == 0 || form.height == 0 {
        return;
    }

    let assignee = assignee_display(state, placeholder);
    let rows: [String; FORM_ROW_COUNT as usize] = [
        "Task: Quarterly roster audit".to_string(),
        "Status: In review".to_string(),
        "Priority: High".to_string(),
        format!("Assignee: {assignee} ▾"),
        "Due: 2026-09-15".to_string(),
        "Created: 2026-07-02".to_string(),
        String::new(),
        "Notes: rotate on-call before the audit window closes".to_string(),
    ];

    let mut lines = Vec::new();
    for (idx, row) in rows
        .iter()
        .enumerate()
        .skip(state.form_scroll as usize)
        .take(form.height as usize)
    {
        let style = if idx as u16 == ANCHOR_ROW && state.mode == Mode::Form {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(format!(" {row}"), style)));
    }
    frame.render_widget(Paragraph::new(lines), form);
}

pub fn draw_chrome(frame: &mut Frame<'_>, layout: UiLayout, state: &AppState, placeholder: &str) {
    draw_form(frame, layout.form, state, placeholder);

    let mode = match state.mode {
        Mode::Form => "FORM",
        Mode::Picker => "PICKER",
    };
    let message = if state.status.message.is_empty() {
        "-"
    } else {
        state.status.message.as_str()
    };
    let status_text = format!(
        "{} | assignee: {} | {}",
        message,
        assignee_display(state, placeholder),
        mode
    );

    let status = Paragraph::new(status_text)
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, layout.status);
}
