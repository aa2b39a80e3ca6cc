//! Async execution of select effects.
//!
//! The component never performs I/O itself. Its event methods return
//! [`Effect`]s which this module turns into tokio tasks:
//! 1. A search request runs in a single cancellable slot. Scheduling a new
//!    one aborts whatever occupies the slot, including a pending debounce.
//! 2. When a task completes it sends a [`RemoteMessage`] through the channel.
//! 3. The owner of the component receives messages and applies them with
//!    [`SelectRuntime::handle_message`], so state is only ever mutated on the
//!    owning task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::component::AsyncSelect;
use crate::config::{self, SelectConfig};
use crate::remote::{
    Effect, RemoteError, RemotePage, RemoteRequest, RemoteSource, RequestToken, SearchPhase,
    SelectedRequest,
};

/// Messages sent from background tasks to the component owner.
#[derive(Debug)]
pub enum RemoteMessage {
    /// A scheduled request finished its debounce and was sent.
    RequestStarted(RequestToken),

    /// A search response (or failure) arrived.
    PageFetched {
        token: RequestToken,
        result: Result<RemotePage, RemoteError>,
    },

    /// A selected-value hydration response arrived.
    SelectedFetched(Result<RemotePage, RemoteError>),
}

/// Spawns background tasks for remote effects.
pub struct TaskSpawner<S> {
    tx: mpsc::UnboundedSender<RemoteMessage>,
    source: Arc<S>,
    /// The single scheduled-or-in-flight search.
    search: Option<JoinHandle<()>>,
    selected: Vec<JoinHandle<()>>,
}

impl<S: RemoteSource> TaskSpawner<S> {
    /// Create a new TaskSpawner with the given source and channel sender.
    pub fn new(source: Arc<S>, tx: mpsc::UnboundedSender<RemoteMessage>) -> Self {
        Self {
            tx,
            source,
            search: None,
            selected: Vec::new(),
        }
    }

    /// Execute one effect.
    pub fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Schedule { request, delay } => self.spawn_search(request, Some(delay)),
            Effect::Fetch(request) => self.spawn_search(request, None),
            Effect::CancelPending => self.cancel_search(),
            Effect::FetchSelected(request) => self.spawn_selected(request),
        }
    }

    /// Spawn a search, superseding the current one.
    ///
    /// With a delay the task sleeps first and reports `RequestStarted` when it
    /// actually sends the request.
    pub fn spawn_search(&mut self, request: RemoteRequest, delay: Option<Duration>) {
        self.cancel_search();

        let tx = self.tx.clone();
        let source = Arc::clone(&self.source);
        let token = request.token;
        trace!(token = %token, ?delay, "Spawning search task");

        self.search = Some(tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
                let _ = tx.send(RemoteMessage::RequestStarted(token));
            }
            let result = source.fetch_page(&request).await;
            let _ = tx.send(RemoteMessage::PageFetched { token, result });
        }));
    }

    /// Abort the scheduled or in-flight search, if any.
    pub fn cancel_search(&mut self) {
        if let Some(handle) = self.search.take() {
            if !handle.is_finished() {
                debug!("Aborting pending search task");
            }
            handle.abort();
        }
    }

    /// Spawn a selected-value hydration request.
    pub fn spawn_selected(&mut self, request: SelectedRequest) {
        self.selected.retain(|handle| !handle.is_finished());

        let tx = self.tx.clone();
        let source = Arc::clone(&self.source);
        self.selected.push(tokio::spawn(async move {
            let result = source.fetch_selected(&request).await;
            let _ = tx.send(RemoteMessage::SelectedFetched(result));
        }));
    }
}

impl<S> Drop for TaskSpawner<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.search.take() {
            handle.abort();
        }
        for handle in self.selected.drain(..) {
            handle.abort();
        }
    }
}

/// Create a new task channel and spawner.
pub fn create_task_channel<S: RemoteSource>(
    source: Arc<S>,
) -> (mpsc::UnboundedReceiver<RemoteMessage>, TaskSpawner<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (rx, TaskSpawner::new(source, tx))
}

/// Owns a component and drives its effects on tokio.
pub struct SelectRuntime<S> {
    select: AsyncSelect,
    spawner: TaskSpawner<S>,
    rx: mpsc::UnboundedReceiver<RemoteMessage>,
    /// Hydration requests sent but not yet answered.
    pending_selected: usize,
}

impl<S: RemoteSource> SelectRuntime<S> {
    /// Wrap an existing component.
    pub fn new(select: AsyncSelect, source: S) -> Self {
        let (rx, spawner) = create_task_channel(Arc::new(source));
        Self {
            select,
            spawner,
            rx,
            pending_selected: 0,
        }
    }

    /// Build and mount a component, executing its initial effects.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(config: SelectConfig, source: S) -> config::Result<Self> {
        let mut runtime = Self::new(AsyncSelect::new(config)?, source);
        runtime.apply(AsyncSelect::mount);
        Ok(runtime)
    }

    /// The component, for reading views.
    pub fn select(&self) -> &AsyncSelect {
        &self.select
    }

    /// Run an event against the component and execute the resulting effects.
    pub fn apply<F>(&mut self, event: F)
    where
        F: FnOnce(&mut AsyncSelect) -> Vec<Effect>,
    {
        let effects = event(&mut self.select);
        self.dispatch(effects);
    }

    /// Execute effects.
    pub fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            if let Effect::FetchSelected(_) = &effect {
                self.pending_selected += 1;
            }
            self.spawner.execute(effect);
        }
    }

    /// Wait for the next message from a background task.
    pub async fn next_message(&mut self) -> Option<RemoteMessage> {
        self.rx.recv().await
    }

    /// Apply a message to the component.
    pub fn handle_message(&mut self, message: RemoteMessage) {
        match message {
            RemoteMessage::RequestStarted(token) => {
                if !self.select.begin_request(token) {
                    trace!(token = %token, "Started request was already superseded");
                }
            }
            RemoteMessage::PageFetched { token, result } => {
                let effects = self.select.apply_page(token, result);
                self.dispatch(effects);
            }
            RemoteMessage::SelectedFetched(result) => {
                self.pending_selected = self.pending_selected.saturating_sub(1);
                let effects = self.select.apply_selected(result);
                self.dispatch(effects);
            }
        }
    }

    /// Check if a response the component still cares about is outstanding.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self.select.phase(),
            SearchPhase::Debouncing | SearchPhase::Loading
        ) || self.pending_selected > 0
    }

    /// Process messages until no expected response is outstanding.
    pub async fn settle(&mut self) {
        loop {
            while let Ok(message) = self.rx.try_recv() {
                self.handle_message(message);
            }
            if !self.is_waiting() {
                break;
            }
            match self.rx.recv().await {
                Some(message) => self.handle_message(message),
                None => break,
            }
        }
    }

    /// Take the component back, aborting any running tasks.
    pub fn into_select(self) -> AsyncSelect {
        self.select
    }
}
