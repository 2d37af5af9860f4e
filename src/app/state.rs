use crate::picker::SelectionValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Form,
    Picker,
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub mode: Mode,
    pub status: StatusState,
    pub form_scroll: u16,
    /// Externally-owned selection; the picker only reports changes.
    pub selection: SelectionValue,
    pub selection_label: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: Mode::Form,
            status: StatusState::default(),
            form_scroll: 0,
            selection: SelectionValue::Empty,
            selection_label: None,
        }
    }
}
