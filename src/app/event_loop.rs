use std::time::Duration;

use crossterm::event::{Event, KeyEventKind};
use ratatui::layout::{Rect, Size};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{self, Instant};

use crate::error::AppResult;
use crate::event::DomainEvent;
use crate::roster::RosterFetcher;
use crate::ui;

use super::core::App;
use super::event_bus::EventBusRuntime;
use super::state::Mode;
use super::terminal_session::{TerminalSession, TerminalSurface};

struct LoopRuntime {
    wake_timeout: Duration,
    needs_redraw: bool,
    session: TerminalSession,
    loop_event_tx: UnboundedSender<DomainEvent>,
    loop_event_rx: UnboundedReceiver<DomainEvent>,
    loop_event_runtime: EventBusRuntime,
}

enum WaitEvent {
    Event(DomainEvent),
    Closed,
}

enum LoopControl {
    Continue,
    Break,
}

impl App {
    pub async fn run(&mut self) -> AppResult<()> {
        let mut runtime = self.initialize_loop_runtime()?;

        loop {
            let area = current_area(&runtime.session);

            // Geometry first: the overlay must be anchored before this
            // frame paints, and again after every scroll or resize.
            self.sync_overlay_geometry(area);
            if self.report_sentinel_visibility(area)? {
                runtime.needs_redraw = true;
            }
            if runtime.needs_redraw {
                self.render_frame(&mut runtime.session)?;
                runtime.needs_redraw = false;
            }

            let waited = wait_next_event(
                &mut runtime.loop_event_rx,
                &mut self.roster.fetcher,
                self.roster.state.debounce_deadline(),
                runtime.wake_timeout,
            )
            .await;
            if matches!(
                self.handle_waited_event(waited, &mut runtime, area)?,
                LoopControl::Break
            ) {
                break;
            }
        }

        runtime.loop_event_runtime.shutdown();
        runtime.session.restore()?;
        Ok(())
    }

    fn initialize_loop_runtime(&mut self) -> AppResult<LoopRuntime> {
        let session = TerminalSession::enter()?;
        let (loop_event_tx, loop_event_rx, loop_event_runtime) = EventBusRuntime::spawn();
        let wake_timeout = Duration::from_millis(self.config.picker.input_poll_timeout_ms);

        Ok(LoopRuntime {
            wake_timeout,
            needs_redraw: true,
            session,
            loop_event_tx,
            loop_event_rx,
            loop_event_runtime,
        })
    }

    pub(crate) fn sync_overlay_geometry(&mut self, area: Rect) {
        if !self.interaction.picker.is_open() {
            return;
        }
        let layout = ui::split_layout(area);
        if let Some(anchor) = ui::anchor_rect(layout.form, self.state.form_scroll) {
            self.interaction.picker.update_geometry(anchor, area);
        }
    }

    /// Feeds the viewport trigger with this frame's sentinel visibility;
    /// true when a next-page fetch was submitted.
    pub(crate) fn report_sentinel_visibility(&mut self, area: Rect) -> AppResult<bool> {
        if self.state.mode != Mode::Picker {
            return Ok(false);
        }

        let visible = match (
            self.interaction.picker.geometry(),
            self.interaction.picker.view(&self.roster.state),
        ) {
            (Some(geometry), Some(view)) if !view.initial_loading => {
                let panel = ui::panel_rect(geometry, area, &view);
                ui::sentinel_visible(
                    view.items.len(),
                    view.has_more,
                    view.selected_idx,
                    ui::list_capacity(panel),
                )
            }
            _ => false,
        };

        self.roster
            .state
            .note_sentinel_visibility(visible, &mut self.roster.fetcher)
    }

    fn render_frame(&mut self, session: &mut TerminalSession) -> AppResult<()> {
        let placeholder = self.interaction.picker.options().placeholder.clone();
        let geometry = self.interaction.picker.geometry();
        let view = self.interaction.picker.view(&self.roster.state);
        let state = &self.state;

        session.draw(|frame| {
            let layout = ui::split_layout(frame.area());
            ui::draw_chrome(frame, layout, state, &placeholder);
            if let (Some(geometry), Some(view)) = (geometry, view.as_ref()) {
                ui::draw_picker_overlay(frame, frame.area(), geometry, view);
            }
        })?;
        Ok(())
    }

    fn handle_waited_event(
        &mut self,
        waited: WaitEvent,
        runtime: &mut LoopRuntime,
        area: Rect,
    ) -> AppResult<LoopControl> {
        match waited {
            WaitEvent::Event(DomainEvent::Input(Event::Key(key)))
                if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) =>
            {
                let outcome = self.handle_key_event(key)?;
                if outcome.quit_requested {
                    return Ok(LoopControl::Break);
                }
                if outcome.redraw {
                    runtime.needs_redraw = true;
                }
                for event in outcome.events {
                    let _ = runtime.loop_event_tx.send(DomainEvent::App(event));
                }
            }
            WaitEvent::Event(DomainEvent::Input(Event::Mouse(mouse))) => {
                let outcome = self.handle_mouse_event(mouse, area)?;
                if outcome.redraw {
                    runtime.needs_redraw = true;
                }
                for event in outcome.events {
                    let _ = runtime.loop_event_tx.send(DomainEvent::App(event));
                }
            }
            WaitEvent::Event(DomainEvent::Input(Event::Resize(_, _))) => {
                runtime.needs_redraw = true;
            }
            WaitEvent::Event(DomainEvent::Input(_)) => {}
            WaitEvent::Event(DomainEvent::InputError(message)) => {
                self.state.status.message = format!("input error: {message}");
                runtime.needs_redraw = true;
            }
            WaitEvent::Event(DomainEvent::App(event)) => {
                self.handle_app_event(&event);
                runtime.needs_redraw = true;
            }
            WaitEvent::Event(DomainEvent::Fetch(event)) => {
                if self.roster.state.on_fetch_event(event) {
                    runtime.needs_redraw = true;
                }
            }
            WaitEvent::Event(DomainEvent::DebounceElapsed) => {
                if self
                    .roster
                    .state
                    .on_debounce_elapsed(&mut self.roster.fetcher)?
                {
                    runtime.needs_redraw = true;
                }
            }
            WaitEvent::Event(DomainEvent::Wake) => {}
            WaitEvent::Closed => return Ok(LoopControl::Break),
        }
        Ok(LoopControl::Continue)
    }
}

fn current_area(session: &impl TerminalSurface) -> Rect {
    let size = session.size().unwrap_or(Size {
        width: 0,
        height: 0,
    });
    Rect::new(0, 0, size.width, size.height)
}

async fn wait_next_event(
    loop_event_rx: &mut UnboundedReceiver<DomainEvent>,
    fetcher: &mut RosterFetcher,
    debounce_deadline: Option<Instant>,
    wake_timeout: Duration,
) -> WaitEvent {
    tokio::select! {
        biased;
        maybe_loop = loop_event_rx.recv() => {
            match maybe_loop {
                Some(event) => WaitEvent::Event(event),
                None => WaitEvent::Closed,
            }
        },
        maybe_fetch = fetcher.recv_event() => {
            match maybe_fetch {
                Some(event) => WaitEvent::Event(DomainEvent::Fetch(event)),
                None => WaitEvent::Closed,
            }
        },
        _ = sleep_until_deadline(debounce_deadline) => {
            WaitEvent::Event(DomainEvent::DebounceElapsed)
        },
        _ = time::sleep(wake_timeout) => {
            WaitEvent::Event(DomainEvent::Wake)
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
