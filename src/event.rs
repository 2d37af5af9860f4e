use crossterm::event::Event;

use crate::picker::SelectionValue;
use crate::roster::RosterEvent;

/// Events the embedder observes. The picker core never reports fetch
/// failures here; selection changes are its only outward signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    SelectionChanged {
        value: SelectionValue,
        label: Option<String>,
    },
}

#[derive(Debug)]
pub(crate) enum DomainEvent {
    Input(Event),
    InputError(String),
    App(AppEvent),
    Fetch(RosterEvent),
    DebounceElapsed,
    Wake,
}
