use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;

use crate::roster::RosterState;

use super::geometry::{OverlayGeometry, compute_geometry};
use super::types::{
    PickerChoice, PickerItemView, PickerKeyResult, PickerOptions, PickerSubmitAction, PickerView,
};

#[derive(Debug)]
struct PickerSession {
    episode: u64,
    input: Input,
    selected: usize,
    geometry: Option<OverlayGeometry>,
}

/// Closed/Open state machine for the floating panel.
///
/// Each open episode gets a fresh id; close requests and submit actions
/// carry the id back, so an action raced against a close cannot touch a
/// newer episode. The overlay stays invisible until geometry has been
/// computed at least once.
pub struct PickerManager {
    next_episode: u64,
    options: PickerOptions,
    active: Option<PickerSession>,
}

impl PickerManager {
    pub fn new(options: PickerOptions) -> Self {
        Self {
            next_episode: 1,
            options,
            active: None,
        }
    }

    pub fn options(&self) -> &PickerOptions {
        &self.options
    }

    /// Opens a new episode; returns its id, or `None` while disabled.
    pub fn open(&mut self) -> Option<u64> {
        if self.options.disabled || self.active.is_some() {
            return None;
        }

        let episode = self.take_episode_id();
        self.active = Some(PickerSession {
            episode,
            input: Input::default(),
            selected: 0,
            geometry: None,
        });
        Some(episode)
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn episode(&self) -> Option<u64> {
        self.active.as_ref().map(|session| session.episode)
    }

    pub fn close(&mut self) -> bool {
        self.active.take().is_some()
    }

    pub fn close_if_matches(&mut self, episode: u64) -> bool {
        let Some(session) = &self.active else {
            return false;
        };
        if session.episode != episode {
            return false;
        }
        self.active.take();
        true
    }

    /// Re-anchors the panel. Called synchronously before every paint
    /// while open, and again on scroll and resize.
    pub fn update_geometry(&mut self, anchor: Rect, area: Rect) {
        if let Some(session) = self.active.as_mut() {
            session.geometry = Some(compute_geometry(anchor, area));
        }
    }

    pub fn geometry(&self) -> Option<OverlayGeometry> {
        self.active.as_ref().and_then(|session| session.geometry)
    }

    pub fn handle_key(&mut self, roster: &RosterState, key: KeyEvent) -> PickerKeyResult {
        let Some(episode) = self.active.as_ref().map(|session| session.episode) else {
            return PickerKeyResult::Consumed { redraw: false };
        };

        match key.code {
            KeyCode::Esc => {
                return PickerKeyResult::CloseRequested { episode };
            }
            KeyCode::Up => {
                return consume(self.select_prev());
            }
            KeyCode::Down => {
                return consume(self.select_next(roster));
            }
            KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return consume(self.select_prev());
            }
            KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return consume(self.select_next(roster));
            }
            KeyCode::Enter => {
                return match self.submit_selected(roster) {
                    Some(action) => PickerKeyResult::Submit(action),
                    None => PickerKeyResult::Consumed { redraw: false },
                };
            }
            _ => {}
        }

        let Some(session) = self.active.as_mut() else {
            return PickerKeyResult::Consumed { redraw: false };
        };
        let mutated = session
            .input
            .handle_event(&Event::Key(key))
            .map(|change| change.value)
            .unwrap_or(false);
        if mutated {
            session.selected = 0;
            return PickerKeyResult::QueryChanged {
                value: session.input.value().to_string(),
            };
        }
        PickerKeyResult::Consumed { redraw: true }
    }

    pub fn select_prev(&mut self) -> bool {
        self.active.as_mut().map(select_prev).unwrap_or(false)
    }

    pub fn select_next(&mut self, roster: &RosterState) -> bool {
        let choice_count = self.choices(roster).len();
        self.active
            .as_mut()
            .map(|session| select_next(session, choice_count))
            .unwrap_or(false)
    }

    pub fn select_index(&mut self, roster: &RosterState, index: usize) -> bool {
        let choice_count = self.choices(roster).len();
        let Some(session) = self.active.as_mut() else {
            return false;
        };
        if index >= choice_count {
            return false;
        }
        session.selected = index;
        true
    }

    pub fn submit_selected(&self, roster: &RosterState) -> Option<PickerSubmitAction> {
        let session = self.active.as_ref()?;
        let choices = self.choices(roster);
        let choice = choices.get(session.selected.min(choices.len().saturating_sub(1)))?;

        Some(PickerSubmitAction {
            episode: session.episode,
            value: choice.selection_value(),
            label: choice.label().map(str::to_string),
        })
    }

    /// Rows of the open panel, display order. Empty while the initial
    /// page is loading: the full-panel spinner owns the list area and
    /// nothing is selectable yet.
    pub fn choices(&self, roster: &RosterState) -> Vec<PickerChoice> {
        if roster.initial_loading() {
            return Vec::new();
        }

        let mut choices = Vec::with_capacity(2 + roster.members().len());
        choices.push(PickerChoice::NoChange);
        if self.options.allow_unassign {
            choices.push(PickerChoice::Unassign);
        }
        for member in roster.members() {
            choices.push(PickerChoice::Member {
                id: member.id.clone(),
                name: member.name.clone(),
                detail: format!("{} · {}", member.role, member.email),
            });
        }
        choices
    }

    /// Snapshot for drawing. `None` while closed or before geometry has
    /// been measured, so the overlay cannot flash at a stale position.
    pub fn view(&self, roster: &RosterState) -> Option<PickerView> {
        let session = self.active.as_ref()?;
        session.geometry?;

        let choices = self.choices(roster);
        let selected_idx = session.selected.min(choices.len().saturating_sub(1));
        let items = choices
            .iter()
            .enumerate()
            .map(|(idx, choice)| item_view(choice, idx == selected_idx))
            .collect();

        Some(PickerView {
            input: session.input.value().to_string(),
            cursor: session.input.visual_cursor(),
            placeholder: self.options.placeholder.clone(),
            initial_loading: roster.initial_loading(),
            incremental_loading: roster.incremental_loading(),
            has_more: roster.has_more(),
            selected_idx,
            items,
        })
    }

    fn take_episode_id(&mut self) -> u64 {
        let id = self.next_episode;
        self.next_episode = self.next_episode.saturating_add(1);
        id
    }
}

fn consume(redraw: bool) -> PickerKeyResult {
    PickerKeyResult::Consumed { redraw }
}

fn select_prev(session: &mut PickerSession) -> bool {
    if session.selected == 0 {
        return false;
    }
    session.selected -= 1;
    true
}

fn select_next(session: &mut PickerSession, choice_count: usize) -> bool {
    if session.selected + 1 >= choice_count {
        return false;
    }
    session.selected += 1;
    true
}

fn item_view(choice: &PickerChoice, selected: bool) -> PickerItemView {
    match choice {
        PickerChoice::NoChange => PickerItemView {
            label: "(no change)".to_string(),
            detail: None,
            selected,
        },
        PickerChoice::Unassign => PickerItemView {
            label: "(unassign)".to_string(),
            detail: None,
            selected,
        },
        PickerChoice::Member { name, detail, .. } => PickerItemView {
            label: name.clone(),
            detail: Some(detail.clone()),
            selected,
        },
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::layout::Rect;

    use crate::picker::types::{PickerKeyResult, PickerOptions, SelectionValue};
    use crate::roster::{Member, RosterState};

    use super::PickerManager;

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            name: format!("member {id}"),
            role: "engineer".to_string(),
            email: format!("{id}@example.com"),
            is_active: true,
        }
    }

    fn open_manager(options: PickerOptions) -> PickerManager {
        let mut manager = PickerManager::new(options);
        manager.open().expect("picker should open");
        manager
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn disabled_picker_ignores_activation() {
        let mut manager = PickerManager::new(PickerOptions {
            disabled: true,
            ..PickerOptions::default()
        });
        assert!(manager.open().is_none());
        assert!(!manager.is_open());
    }

    #[test]
    fn unassign_row_is_absent_unless_enabled() {
        let roster = RosterState::stub_open(vec![member("u-1")], 1, 1);

        let without = open_manager(PickerOptions::default());
        let without_choices = without.choices(&roster);
        let labels: Vec<Option<&str>> = without_choices
            .iter()
            .map(|choice| choice.label())
            .collect();
        assert_eq!(without.choices(&roster).len(), 2);
        assert_eq!(labels, vec![None, Some("member u-1")]);

        let with = open_manager(PickerOptions {
            allow_unassign: true,
            ..PickerOptions::default()
        });
        assert_eq!(with.choices(&roster).len(), 3);
    }

    #[test]
    fn rows_map_to_selection_values() {
        let roster = RosterState::stub_open(vec![member("u-1")], 1, 1);
        let mut manager = open_manager(PickerOptions {
            allow_unassign: true,
            ..PickerOptions::default()
        });

        let no_change = manager
            .submit_selected(&roster)
            .expect("first row should submit");
        assert_eq!(no_change.value, SelectionValue::Empty);
        assert_eq!(no_change.label, None);

        assert!(manager.select_index(&roster, 1));
        let unassign = manager
            .submit_selected(&roster)
            .expect("unassign row should submit");
        assert_eq!(unassign.value, SelectionValue::Unassign);

        assert!(manager.select_index(&roster, 2));
        let picked = manager
            .submit_selected(&roster)
            .expect("member row should submit");
        assert_eq!(picked.value, SelectionValue::Member("u-1".to_string()));
        assert_eq!(picked.label.as_deref(), Some("member u-1"));
    }

    #[test]
    fn query_mutation_reports_value_and_resets_selection() {
        let roster = RosterState::stub_open(vec![member("u-1"), member("u-2")], 1, 1);
        let mut manager = open_manager(PickerOptions::default());

        manager.handle_key(&roster, key(KeyCode::Down));
        let result = manager.handle_key(&roster, key(KeyCode::Char('a')));
        assert_eq!(
            result,
            PickerKeyResult::QueryChanged {
                value: "a".to_string()
            }
        );

        let view_roster = RosterState::stub_open(vec![member("u-1")], 1, 1);
        manager.update_geometry(Rect::new(0, 0, 40, 1), Rect::new(0, 0, 80, 24));
        let view = manager.view(&view_roster).expect("view should build");
        assert_eq!(view.selected_idx, 0);
        assert_eq!(view.input, "a");
    }

    #[test]
    fn view_is_withheld_until_geometry_is_measured() {
        let roster = RosterState::stub_open(vec![member("u-1")], 1, 1);
        let mut manager = open_manager(PickerOptions::default());

        assert!(manager.view(&roster).is_none());
        manager.update_geometry(Rect::new(2, 4, 30, 1), Rect::new(0, 0, 80, 24));
        let view = manager.view(&roster).expect("view should build");
        assert_eq!(view.items.len(), 2);
    }

    #[test]
    fn escape_requests_close_for_the_current_episode() {
        let roster = RosterState::stub_open(Vec::new(), 0, 0);
        let mut manager = open_manager(PickerOptions::default());

        let result = manager.handle_key(&roster, key(KeyCode::Esc));
        let PickerKeyResult::CloseRequested { episode } = result else {
            panic!("expected close request, got {result:?}");
        };
        assert!(manager.close_if_matches(episode));
        assert!(!manager.is_open());
        assert!(!manager.close_if_matches(episode));
    }
}
