/// Externally-owned selection. The picker never stores this beyond the
/// options it was opened with; it only reports changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionValue {
    /// "No change": the embedder keeps whatever was selected before.
    Empty,
    /// Reserved sentinel: clear the current assignment.
    Unassign,
    Member(String),
}

impl SelectionValue {
    pub fn id(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Unassign => "unassign",
            Self::Member(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerOptions {
    pub current: SelectionValue,
    pub allow_unassign: bool,
    pub disabled: bool,
    pub placeholder: String,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            current: SelectionValue::Empty,
            allow_unassign: false,
            disabled: false,
            placeholder: "Select member".to_string(),
        }
    }
}

/// One row of the open panel, in display order: the fixed action rows
/// first, then one row per visible member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerChoice {
    NoChange,
    Unassign,
    Member {
        id: String,
        name: String,
        detail: String,
    },
}

impl PickerChoice {
    pub fn selection_value(&self) -> SelectionValue {
        match self {
            Self::NoChange => SelectionValue::Empty,
            Self::Unassign => SelectionValue::Unassign,
            Self::Member { id, .. } => SelectionValue::Member(id.clone()),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::NoChange | Self::Unassign => None,
            Self::Member { name, .. } => Some(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerItemView {
    pub label: String,
    pub detail: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerView {
    pub input: String,
    pub cursor: usize,
    pub placeholder: String,
    pub initial_loading: bool,
    pub incremental_loading: bool,
    pub has_more: bool,
    pub selected_idx: usize,
    pub items: Vec<PickerItemView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerSubmitAction {
    pub episode: u64,
    pub value: SelectionValue,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerKeyResult {
    Consumed { redraw: bool },
    /// The search term mutated; the caller restarts the debounce timer.
    QueryChanged { value: String },
    CloseRequested { episode: u64 },
    Submit(PickerSubmitAction),
}

#[cfg(test)]
mod tests {
    use super::{PickerChoice, SelectionValue};

    #[test]
    fn choice_rows_map_to_their_selection_values() {
        assert_eq!(PickerChoice::NoChange.selection_value(), SelectionValue::Empty);
        assert_eq!(
            PickerChoice::Unassign.selection_value(),
            SelectionValue::Unassign
        );

        let member = PickerChoice::Member {
            id: "u-4".to_string(),
            name: "Riley Chen".to_string(),
            detail: "engineer · riley@example.com".to_string(),
        };
        assert_eq!(
            member.selection_value(),
            SelectionValue::Member("u-4".to_string())
        );
        assert_eq!(member.label(), Some("Riley Chen"));
    }

    #[test]
    fn selection_values_have_stable_wire_ids() {
        assert_eq!(SelectionValue::Empty.id(), "");
        assert_eq!(SelectionValue::Unassign.id(), "unassign");
        assert_eq!(SelectionValue::Member("u-4".to_string()).id(), "u-4");
    }
}
