use std::time::Duration;

use tokio::time::Instant;

use crate::error::AppResult;

use super::fetch::{RosterEvent, RosterFetcher};
use super::types::Member;

/// Distinguishes the full-panel spinner (page 1) from the inline
/// bottom-row spinner (later pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Initial,
    Incremental,
}

/// Fetch-and-accumulate state for one open episode of the picker.
///
/// All fields are scoped to the episode: `begin_episode` resets them and
/// issues the immediate page-1 fetch, `close_episode` invalidates any
/// in-flight intent. Completions are applied only when the episode is
/// still open and the generation matches the last submitted job.
#[derive(Debug)]
pub struct RosterState {
    open: bool,
    query: String,
    generation: u64,
    in_flight: Option<LoadPhase>,
    page: usize,
    total_pages: Option<usize>,
    members: Vec<Member>,
    sentinel_was_visible: bool,
    debounce_deadline: Option<Instant>,
}

impl Default for RosterState {
    fn default() -> Self {
        Self {
            open: false,
            query: String::new(),
            generation: 0,
            in_flight: None,
            page: 0,
            total_pages: None,
            members: Vec::new(),
            sentinel_was_visible: false,
            debounce_deadline: None,
        }
    }
}

impl RosterState {
    /// Starts a fresh episode: clears accumulated state and issues the
    /// page-1 fetch immediately (the open fetch is not debounced).
    pub fn begin_episode(&mut self, fetcher: &mut RosterFetcher) -> AppResult<()> {
        self.open = true;
        self.query.clear();
        self.members.clear();
        self.page = 0;
        self.total_pages = None;
        self.sentinel_was_visible = false;
        self.debounce_deadline = None;

        self.generation = fetcher.submit(1, "")?;
        self.in_flight = Some(LoadPhase::Initial);
        tracing::debug!(generation = self.generation, "episode opened");
        Ok(())
    }

    /// Ends the episode. Pending debounce intent is discarded and any
    /// completion still in flight becomes a no-op.
    pub fn close_episode(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.query.clear();
        self.in_flight = None;
        self.sentinel_was_visible = false;
        self.debounce_deadline = None;
        tracing::debug!(generation = self.generation, "episode closed");
    }

    /// Records a search-term mutation and (re)arms the debounce deadline.
    pub fn note_query_changed(&mut self, value: &str, now: Instant, debounce: Duration) {
        if !self.open {
            return;
        }
        self.query.clear();
        self.query.push_str(value);
        self.debounce_deadline = Some(now + debounce);
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debounce_deadline
    }

    /// The debounce deadline fired uninterrupted: restart pagination from
    /// page 1 with the current term. Suppressed (not queued) while a
    /// request is in flight.
    pub fn on_debounce_elapsed(&mut self, fetcher: &mut RosterFetcher) -> AppResult<bool> {
        self.debounce_deadline = None;
        if !self.open {
            return Ok(false);
        }
        if self.in_flight.is_some() {
            tracing::debug!("debounced search suppressed: request in flight");
            return Ok(false);
        }

        self.generation = fetcher.submit(1, self.query.clone())?;
        self.in_flight = Some(LoadPhase::Initial);
        Ok(true)
    }

    /// Reports whether the sentinel row after the last member is inside
    /// the visible list window. A not-visible -> visible transition while
    /// more pages exist and nothing is in flight requests the next page
    /// exactly once; while blocked, the trigger is detached and the edge
    /// detector reset, so it re-fires when conditions recover.
    pub fn note_sentinel_visibility(
        &mut self,
        visible: bool,
        fetcher: &mut RosterFetcher,
    ) -> AppResult<bool> {
        if !self.open || !self.has_more() || self.in_flight.is_some() {
            self.sentinel_was_visible = false;
            return Ok(false);
        }

        let rising_edge = visible && !self.sentinel_was_visible;
        self.sentinel_was_visible = visible;
        if !rising_edge {
            return Ok(false);
        }

        self.generation = fetcher.submit(self.page + 1, self.query.clone())?;
        self.in_flight = Some(LoadPhase::Incremental);
        Ok(true)
    }

    /// Applies a fetch completion. Stale generations and completions that
    /// arrive after close are dropped without touching state; failures
    /// only clear the in-flight guard (silent-degrade, logged).
    pub fn on_fetch_event(&mut self, event: RosterEvent) -> bool {
        if !self.open {
            return false;
        }

        match event {
            RosterEvent::Loaded {
                generation,
                page,
                members,
                total_pages,
            } => {
                if generation != self.generation {
                    return false;
                }
                let active = members.into_iter().filter(|member| member.is_active);
                if page == 1 {
                    self.members = active.collect();
                } else {
                    self.members.extend(active);
                }
                self.page = page;
                self.total_pages = Some(total_pages);
                self.in_flight = None;
                // Re-attach the trigger: a sentinel still visible after
                // this page fires again on its next report.
                self.sentinel_was_visible = false;
                tracing::debug!(
                    page,
                    total_pages,
                    visible = self.members.len(),
                    "roster page applied"
                );
                true
            }
            RosterEvent::Failed {
                generation,
                message,
            } => {
                if generation != self.generation {
                    return false;
                }
                self.in_flight = None;
                self.sentinel_was_visible = false;
                tracing::warn!(page = self.page + 1, %message, "roster fetch failed");
                true
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn cursor(&self) -> usize {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.total_pages
            .is_some_and(|total_pages| self.page < total_pages)
    }

    pub fn initial_loading(&self) -> bool {
        self.in_flight == Some(LoadPhase::Initial)
    }

    pub fn incremental_loading(&self) -> bool {
        self.in_flight == Some(LoadPhase::Incremental)
    }
}

#[cfg(test)]
impl RosterState {
    /// Open episode with preloaded pages, for tests that exercise the
    /// picker layer without a fetch worker.
    pub(crate) fn stub_open(members: Vec<Member>, page: usize, total_pages: usize) -> Self {
        Self {
            open: true,
            members,
            page,
            total_pages: Some(total_pages),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::error::AppResult;
    use crate::roster::client::DirectoryClient;
    use crate::roster::fetch::RosterFetcher;
    use crate::roster::types::{Member, RosterPage};

    use super::RosterState;

    const DEBOUNCE: Duration = Duration::from_millis(400);

    struct ScriptedClient {
        pages: Mutex<Vec<RosterPage>>,
        calls: Mutex<Vec<(usize, String)>>,
        gate: Option<Mutex<Receiver<()>>>,
    }

    impl ScriptedClient {
        fn new(pages: Vec<RosterPage>) -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(pages),
                calls: Mutex::new(Vec::new()),
                gate: None,
            })
        }

        /// Client that blocks each request until the test releases it,
        /// to hold a fetch in flight deterministically.
        fn gated(pages: Vec<RosterPage>) -> (Arc<Self>, SyncSender<()>) {
            let (release_tx, release_rx) = sync_channel(8);
            let client = Arc::new(Self {
                pages: Mutex::new(pages),
                calls: Mutex::new(Vec::new()),
                gate: Some(Mutex::new(release_rx)),
            });
            (client, release_tx)
        }

        fn calls(&self) -> Vec<(usize, String)> {
            self.calls.lock().expect("call log should lock").clone()
        }
    }

    impl DirectoryClient for ScriptedClient {
        fn list(&self, page: usize, search: &str) -> AppResult<RosterPage> {
            self.calls
                .lock()
                .expect("call log should lock")
                .push((page, search.to_string()));
            if let Some(gate) = &self.gate {
                let _ = gate.lock().expect("gate should lock").recv();
            }
            let mut pages = self.pages.lock().expect("pages should lock");
            if pages.is_empty() {
                return Err(crate::error::AppError::unsupported("no scripted page left"));
            }
            Ok(pages.remove(0))
        }
    }

    fn member(id: &str, active: bool) -> Member {
        Member {
            id: id.to_string(),
            name: format!("member {id}"),
            role: "engineer".to_string(),
            email: format!("{id}@example.com"),
            is_active: active,
        }
    }

    fn page_of(ids: &[&str], page: usize, total_pages: usize) -> RosterPage {
        RosterPage {
            members: ids.iter().map(|id| member(id, true)).collect(),
            page,
            total_pages,
        }
    }

    fn apply_next_event(state: &mut RosterState, fetcher: &mut RosterFetcher) -> bool {
        let timeout = Duration::from_secs(3);
        let start = Instant::now();

        loop {
            if let Some(event) = fetcher.drain_events().into_iter().next() {
                return state.on_fetch_event(event);
            }
            assert!(
                start.elapsed() <= timeout,
                "timed out waiting for fetch completion"
            );
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn begin_episode_issues_immediate_unfiltered_page_one_fetch() {
        let client = ScriptedClient::new(vec![page_of(&["u-1", "u-2"], 1, 1)]);
        let mut fetcher = RosterFetcher::new(client.clone());
        let mut state = RosterState::default();

        state
            .begin_episode(&mut fetcher)
            .expect("episode should open");
        assert!(state.initial_loading());

        assert!(apply_next_event(&mut state, &mut fetcher));
        assert_eq!(state.members().len(), 2);
        assert_eq!(state.cursor(), 1);
        assert!(!state.has_more());
        assert!(!state.initial_loading());
        assert_eq!(client.calls(), vec![(1, String::new())]);
    }

    #[test]
    fn page_one_replaces_and_later_pages_append_in_order() {
        let client = ScriptedClient::new(vec![
            page_of(&["u-1", "u-2"], 1, 3),
            page_of(&["u-3", "u-4"], 2, 3),
        ]);
        let mut fetcher = RosterFetcher::new(client.clone());
        let mut state = RosterState::default();

        state
            .begin_episode(&mut fetcher)
            .expect("episode should open");
        apply_next_event(&mut state, &mut fetcher);
        assert!(state.has_more());

        let fired = state
            .note_sentinel_visibility(true, &mut fetcher)
            .expect("sentinel trigger should submit");
        assert!(fired);
        assert!(state.incremental_loading());

        apply_next_event(&mut state, &mut fetcher);
        let ids: Vec<&str> = state.members().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["u-1", "u-2", "u-3", "u-4"]);
        assert_eq!(state.cursor(), 2);
        assert!(state.has_more());
    }

    #[test]
    fn inactive_members_are_filtered_after_every_fetch() {
        let mut page = page_of(&["u-1"], 1, 1);
        page.members.push(member("u-2", false));
        page.members.push(member("u-3", true));
        let client = ScriptedClient::new(vec![page]);
        let mut fetcher = RosterFetcher::new(client);
        let mut state = RosterState::default();

        state
            .begin_episode(&mut fetcher)
            .expect("episode should open");
        apply_next_event(&mut state, &mut fetcher);

        let ids: Vec<&str> = state.members().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["u-1", "u-3"]);
    }

    #[test]
    fn no_second_fetch_while_one_is_in_flight() {
        let (client, release) = ScriptedClient::gated(vec![
            page_of(&["u-1"], 1, 3),
            page_of(&["u-2"], 2, 3),
        ]);
        let mut fetcher = RosterFetcher::new(client.clone());
        let mut state = RosterState::default();

        state
            .begin_episode(&mut fetcher)
            .expect("episode should open");
        release.send(()).expect("gate should release page 1");
        apply_next_event(&mut state, &mut fetcher);

        let fired = state
            .note_sentinel_visibility(true, &mut fetcher)
            .expect("sentinel trigger should submit page 2");
        assert!(fired);

        // Page 2 is still blocked: every further trigger is suppressed,
        // not queued.
        let refired = state
            .note_sentinel_visibility(true, &mut fetcher)
            .expect("sentinel report should succeed");
        assert!(!refired);
        let resubmitted = state
            .on_debounce_elapsed(&mut fetcher)
            .expect("debounce should be suppressed cleanly");
        assert!(!resubmitted);

        release.send(()).expect("gate should release page 2");
        apply_next_event(&mut state, &mut fetcher);
        assert_eq!(client.calls().len(), 2);
    }

    #[test]
    fn rapid_query_mutations_issue_one_fetch_with_final_term() {
        let client = ScriptedClient::new(vec![
            page_of(&["u-1"], 1, 1),
            page_of(&["u-9"], 1, 1),
        ]);
        let mut fetcher = RosterFetcher::new(client.clone());
        let mut state = RosterState::default();

        state
            .begin_episode(&mut fetcher)
            .expect("episode should open");
        apply_next_event(&mut state, &mut fetcher);

        let first_keystroke = tokio::time::Instant::now();
        state.note_query_changed("al", first_keystroke, DEBOUNCE);
        let first_deadline = state.debounce_deadline().expect("deadline should be armed");
        let second_keystroke = first_keystroke + Duration::from_millis(100);
        state.note_query_changed("ali", second_keystroke, DEBOUNCE);
        let second_deadline = state.debounce_deadline().expect("deadline should restart");
        assert!(second_deadline > first_deadline);

        let submitted = state
            .on_debounce_elapsed(&mut fetcher)
            .expect("debounced fetch should submit");
        assert!(submitted);
        assert!(state.initial_loading());
        apply_next_event(&mut state, &mut fetcher);

        assert_eq!(
            client.calls(),
            vec![(1, String::new()), (1, "ali".to_string())]
        );
        let ids: Vec<&str> = state.members().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["u-9"]);
    }

    #[test]
    fn completion_after_close_is_a_no_op() {
        let (client, release) = ScriptedClient::gated(vec![page_of(&["u-1"], 1, 1)]);
        let mut fetcher = RosterFetcher::new(client);
        let mut state = RosterState::default();

        state
            .begin_episode(&mut fetcher)
            .expect("episode should open");
        state.close_episode();
        release.send(()).expect("gate should release");

        let timeout = Instant::now() + Duration::from_secs(3);
        let event = loop {
            if let Some(event) = fetcher.drain_events().into_iter().next() {
                break event;
            }
            assert!(Instant::now() < timeout, "timed out waiting for completion");
            thread::sleep(Duration::from_millis(10));
        };

        assert!(!state.on_fetch_event(event));
        assert!(state.members().is_empty());
        assert!(state.query().is_empty());
        assert!(!state.initial_loading());
    }

    #[test]
    fn exhaustion_clears_has_more_and_detaches_sentinel() {
        let client = ScriptedClient::new(vec![
            page_of(&["u-1"], 1, 2),
            page_of(&["u-2"], 2, 2),
        ]);
        let mut fetcher = RosterFetcher::new(client.clone());
        let mut state = RosterState::default();

        state
            .begin_episode(&mut fetcher)
            .expect("episode should open");
        apply_next_event(&mut state, &mut fetcher);
        state
            .note_sentinel_visibility(true, &mut fetcher)
            .expect("sentinel trigger should submit");
        apply_next_event(&mut state, &mut fetcher);

        assert!(!state.has_more());
        let fired = state
            .note_sentinel_visibility(true, &mut fetcher)
            .expect("detached sentinel report should succeed");
        assert!(!fired);
        assert_eq!(client.calls().len(), 2);
    }

    #[test]
    fn failure_clears_spinner_and_keeps_accumulated_state() {
        let client = ScriptedClient::new(vec![page_of(&["u-1"], 1, 3)]);
        let mut fetcher = RosterFetcher::new(client);
        let mut state = RosterState::default();

        state
            .begin_episode(&mut fetcher)
            .expect("episode should open");
        apply_next_event(&mut state, &mut fetcher);
        state
            .note_sentinel_visibility(true, &mut fetcher)
            .expect("sentinel trigger should submit");

        // Scripted pages are exhausted, so page 2 fails.
        let changed = apply_next_event(&mut state, &mut fetcher);
        assert!(changed);
        assert!(!state.incremental_loading());
        assert_eq!(state.members().len(), 1);
        assert_eq!(state.cursor(), 1);
        assert!(state.has_more());

        // The next visibility edge retries best-effort.
        let fired = state
            .note_sentinel_visibility(true, &mut fetcher)
            .expect("sentinel retry should submit");
        assert!(fired);
    }
}
