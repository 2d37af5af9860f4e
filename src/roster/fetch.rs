use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc::{
    UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel,
};
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};

use super::client::DirectoryClient;
use super::types::Member;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterEvent {
    Loaded {
        generation: u64,
        page: usize,
        members: Vec<Member>,
        total_pages: usize,
    },
    Failed {
        generation: u64,
        message: String,
    },
}

#[derive(Clone)]
struct FetchJob {
    generation: u64,
    page: usize,
    search: String,
}

enum WorkerRequest {
    Fetch(FetchJob),
    Shutdown,
}

enum WorkerControl {
    Continue,
    Shutdown,
}

/// Background fetch engine for the directory.
///
/// One worker thread owns the blocking transport; jobs are tagged with a
/// monotonically increasing generation and completions echo it back, so
/// the owner can drop anything stale. A newer job submitted while one is
/// running supersedes it before the older result is sent.
pub struct RosterFetcher {
    request_tx: UnboundedSender<WorkerRequest>,
    event_rx: UnboundedReceiver<RosterEvent>,
    next_generation: u64,
    _runtime: FetchWorkerRuntime,
    worker: Option<JoinHandle<()>>,
}

struct FetchWorkerRuntime {
    _owned: Option<Runtime>,
    handle: Handle,
}

impl FetchWorkerRuntime {
    fn new() -> Self {
        if let Ok(handle) = Handle::try_current() {
            return Self {
                _owned: None,
                handle,
            };
        }

        let runtime = Builder::new_multi_thread()
            .enable_all()
            .thread_name("rpk-fetch")
            .build()
            .expect("fetch runtime should initialize");
        let handle = runtime.handle().clone();
        Self {
            _owned: Some(runtime),
            handle,
        }
    }

    fn spawn_blocking<F>(&self, task: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.spawn_blocking(task)
    }
}

impl RosterFetcher {
    pub fn new(client: Arc<dyn DirectoryClient>) -> Self {
        let (request_tx, request_rx) = unbounded_channel();
        let (event_tx, event_rx) = unbounded_channel();
        let runtime = FetchWorkerRuntime::new();
        let worker = runtime.spawn_blocking(move || worker_main(request_rx, event_tx, client));

        Self {
            request_tx,
            event_rx,
            next_generation: 0,
            _runtime: runtime,
            worker: Some(worker),
        }
    }

    pub fn submit(&mut self, page: usize, search: impl Into<String>) -> AppResult<u64> {
        self.next_generation = self.next_generation.saturating_add(1);

        let generation = self.next_generation;
        let job = FetchJob {
            generation,
            page,
            search: search.into(),
        };

        self.request_tx
            .send(WorkerRequest::Fetch(job))
            .map_err(|_| AppError::unsupported("fetch worker is not available"))?;

        Ok(generation)
    }

    /// Awaits the next completion; `None` once the worker has shut down.
    pub async fn recv_event(&mut self) -> Option<RosterEvent> {
        self.event_rx.recv().await
    }

    pub fn drain_events(&mut self) -> Vec<RosterEvent> {
        let mut drained = Vec::new();

        loop {
            match self.event_rx.try_recv() {
                Ok(event) => drained.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }

        drained
    }
}

impl Drop for RosterFetcher {
    fn drop(&mut self) {
        let _ = self.request_tx.send(WorkerRequest::Shutdown);
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

fn worker_main(
    mut request_rx: UnboundedReceiver<WorkerRequest>,
    event_tx: UnboundedSender<RosterEvent>,
    client: Arc<dyn DirectoryClient>,
) {
    let mut pending: Option<FetchJob> = None;

    loop {
        let job = match pending.take() {
            Some(job) => job,
            None => match wait_for_job(&mut request_rx) {
                Some(job) => job,
                None => break,
            },
        };

        match run_job(job, &mut request_rx, &event_tx, &mut pending, client.as_ref()) {
            WorkerControl::Continue => {}
            WorkerControl::Shutdown => break,
        }
    }
}

fn wait_for_job(request_rx: &mut UnboundedReceiver<WorkerRequest>) -> Option<FetchJob> {
    match request_rx.blocking_recv() {
        Some(WorkerRequest::Fetch(job)) => Some(job),
        Some(WorkerRequest::Shutdown) | None => None,
    }
}

fn run_job(
    job: FetchJob,
    request_rx: &mut UnboundedReceiver<WorkerRequest>,
    event_tx: &UnboundedSender<RosterEvent>,
    pending: &mut Option<FetchJob>,
    client: &dyn DirectoryClient,
) -> WorkerControl {
    let outcome = client.list(job.page, &job.search);

    // A newer job that arrived while the transport was blocked wins; the
    // stale result is dropped here rather than at the receiver.
    match flush_requests(request_rx, pending) {
        WorkerControl::Continue => {
            if pending.is_some() {
                return WorkerControl::Continue;
            }
        }
        WorkerControl::Shutdown => return WorkerControl::Shutdown,
    }

    let event = match outcome {
        Ok(fetched) => RosterEvent::Loaded {
            generation: job.generation,
            page: fetched.page,
            members: fetched.members,
            total_pages: fetched.total_pages,
        },
        Err(err) => RosterEvent::Failed {
            generation: job.generation,
            message: err.to_string(),
        },
    };
    let _ = event_tx.send(event);
    WorkerControl::Continue
}

fn flush_requests(
    request_rx: &mut UnboundedReceiver<WorkerRequest>,
    pending: &mut Option<FetchJob>,
) -> WorkerControl {
    loop {
        match request_rx.try_recv() {
            Ok(WorkerRequest::Fetch(job)) => *pending = Some(job),
            Ok(WorkerRequest::Shutdown) => return WorkerControl::Shutdown,
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => return WorkerControl::Shutdown,
        }
    }

    WorkerControl::Continue
}
