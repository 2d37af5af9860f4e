use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tokio::time::Instant;

use crate::error::AppResult;
use crate::event::AppEvent;
use crate::picker::{PickerKeyResult, PickerSubmitAction, SelectionValue};
use crate::ui;

use super::core::App;
use super::state::Mode;

#[derive(Debug, Clone, Default)]
pub(crate) struct KeyEventOutcome {
    pub(crate) redraw: bool,
    pub(crate) quit_requested: bool,
    pub(crate) events: Vec<AppEvent>,
}

impl App {
    pub(crate) fn handle_key_event(&mut self, key: KeyEvent) -> AppResult<KeyEventOutcome> {
        if self.state.mode == Mode::Picker {
            let result = self.interaction.picker.handle_key(&self.roster.state, key);
            return self.apply_picker_key_result(result);
        }

        match key.code {
            KeyCode::Char('q') => Ok(KeyEventOutcome {
                quit_requested: true,
                ..KeyEventOutcome::default()
            }),
            KeyCode::Up | KeyCode::Char('k') => {
                let scrolled = self.scroll_form(-1);
                Ok(redraw_outcome(scrolled))
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let scrolled = self.scroll_form(1);
                Ok(redraw_outcome(scrolled))
            }
            KeyCode::Enter | KeyCode::Char('a') => {
                let opened = self.open_picker()?;
                Ok(redraw_outcome(opened))
            }
            _ => Ok(KeyEventOutcome::default()),
        }
    }

    pub(crate) fn handle_mouse_event(
        &mut self,
        mouse: MouseEvent,
        area: Rect,
    ) -> AppResult<KeyEventOutcome> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.handle_mouse_press(mouse.column, mouse.row, area)
            }
            MouseEventKind::ScrollUp => self.handle_mouse_scroll(-1, mouse.column, mouse.row, area),
            MouseEventKind::ScrollDown => self.handle_mouse_scroll(1, mouse.column, mouse.row, area),
            _ => Ok(KeyEventOutcome::default()),
        }
    }

    /// Outside-click dismissal: a press landing on neither the panel nor
    /// the anchor closes the episode. Presses on the panel select, on the
    /// anchor are consumed.
    fn handle_mouse_press(
        &mut self,
        column: u16,
        row: u16,
        area: Rect,
    ) -> AppResult<KeyEventOutcome> {
        let layout = ui::split_layout(area);
        let anchor = ui::anchor_rect(layout.form, self.state.form_scroll);

        if self.state.mode == Mode::Picker {
            if let Some(geometry) = self.interaction.picker.geometry()
                && let Some(view) = self.interaction.picker.view(&self.roster.state)
                && contains(ui::panel_rect(geometry, area, &view), column, row)
            {
                let panel = ui::panel_rect(geometry, area, &view);
                if let Some(index) = ui::list_row_at(panel, &view, row)
                    && self.interaction.picker.select_index(&self.roster.state, index)
                    && let Some(action) = self.interaction.picker.submit_selected(&self.roster.state)
                {
                    return self.apply_submit(action);
                }
                return Ok(redraw_outcome(true));
            }

            if anchor.is_some_and(|anchor| contains(anchor, column, row)) {
                return Ok(KeyEventOutcome::default());
            }

            if let Some(episode) = self.interaction.picker.episode() {
                return Ok(redraw_outcome(self.close_picker(episode)));
            }
            return Ok(KeyEventOutcome::default());
        }

        if anchor.is_some_and(|anchor| contains(anchor, column, row)) {
            let opened = self.open_picker()?;
            return Ok(redraw_outcome(opened));
        }
        Ok(KeyEventOutcome::default())
    }

    fn handle_mouse_scroll(
        &mut self,
        delta: i16,
        column: u16,
        row: u16,
        area: Rect,
    ) -> AppResult<KeyEventOutcome> {
        if self.state.mode == Mode::Picker
            && let Some(panel) = self.panel_rect(area)
            && contains(panel, column, row)
        {
            let moved = if delta < 0 {
                self.interaction.picker.select_prev()
            } else {
                self.interaction.picker.select_next(&self.roster.state)
            };
            return Ok(redraw_outcome(moved));
        }

        Ok(redraw_outcome(self.scroll_form(delta)))
    }

    /// Anchor activation; ignored while disabled or already open.
    pub(crate) fn open_picker(&mut self) -> AppResult<bool> {
        if self.interaction.picker.open().is_none() {
            return Ok(false);
        }

        self.roster.state.begin_episode(&mut self.roster.fetcher)?;
        self.state.mode = Mode::Picker;
        self.state.status.message = "assignee picker opened".to_string();
        Ok(true)
    }

    /// Close and episode reset as one step, so no path can leave the
    /// roster session running behind a closed panel.
    pub(crate) fn close_picker(&mut self, episode: u64) -> bool {
        if !self.interaction.picker.close_if_matches(episode) {
            return false;
        }
        self.roster.state.close_episode();
        self.state.mode = Mode::Form;
        self.state.status.message = "assignee picker closed".to_string();
        true
    }

    pub(crate) fn apply_picker_key_result(
        &mut self,
        result: PickerKeyResult,
    ) -> AppResult<KeyEventOutcome> {
        match result {
            PickerKeyResult::Consumed { redraw } => Ok(redraw_outcome(redraw)),
            PickerKeyResult::QueryChanged { value } => {
                let debounce = Duration::from_millis(self.config.picker.debounce_ms);
                self.roster
                    .state
                    .note_query_changed(&value, Instant::now(), debounce);
                Ok(redraw_outcome(true))
            }
            PickerKeyResult::CloseRequested { episode } => {
                Ok(redraw_outcome(self.close_picker(episode)))
            }
            PickerKeyResult::Submit(action) => self.apply_submit(action),
        }
    }

    /// Selection dispatch: close, reset the episode and emit the single
    /// selection-changed notification as one atomic transition.
    fn apply_submit(&mut self, action: PickerSubmitAction) -> AppResult<KeyEventOutcome> {
        if !self.interaction.picker.close_if_matches(action.episode) {
            return Ok(KeyEventOutcome::default());
        }
        self.roster.state.close_episode();
        self.state.mode = Mode::Form;

        Ok(KeyEventOutcome {
            redraw: true,
            quit_requested: false,
            events: vec![AppEvent::SelectionChanged {
                value: action.value,
                label: action.label,
            }],
        })
    }

    pub(crate) fn handle_app_event(&mut self, event: &AppEvent) {
        match event {
            AppEvent::SelectionChanged { value, label } => {
                match value {
                    SelectionValue::Empty => {
                        self.state.status.message = "assignment unchanged".to_string();
                    }
                    SelectionValue::Unassign => {
                        self.state.selection = SelectionValue::Unassign;
                        self.state.selection_label = None;
                        self.state.status.message = "assignee cleared".to_string();
                    }
                    SelectionValue::Member(id) => {
                        self.state.selection = SelectionValue::Member(id.clone());
                        self.state.selection_label = label.clone();
                        let shown = label.clone().unwrap_or_else(|| id.clone());
                        self.state.status.message = format!("assigned to {shown}");
                    }
                }
            }
        }
    }

    pub(crate) fn panel_rect(&self, area: Rect) -> Option<Rect> {
        let geometry = self.interaction.picker.geometry()?;
        let view = self.interaction.picker.view(&self.roster.state)?;
        Some(ui::panel_rect(geometry, area, &view))
    }

    fn scroll_form(&mut self, delta: i16) -> bool {
        let current = self.state.form_scroll;
        let next = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current
                .saturating_add(delta as u16)
                .min(ui::max_form_scroll())
        };
        if next == current {
            return false;
        }
        self.state.form_scroll = next;
        true
    }
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x + rect.width
        && row >= rect.y
        && row < rect.y + rect.height
}

fn redraw_outcome(redraw: bool) -> KeyEventOutcome {
    KeyEventOutcome {
        redraw,
        ..KeyEventOutcome::default()
    }
}
