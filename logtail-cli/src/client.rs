use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use logtail_core::backend::{Backend, BackendError};
use logtail_core::config::StreamConfig;
use logtail_core::error::ClientError;
use logtail_core::host::{Host, HostRegistry};
use logtail_core::reducer::{EventEnvelope, reduce};
use logtail_core::state::HealthBoard;
use logtail_core::suggest::SuggestionIndex;

use crate::session::{StreamSession, StreamUpdate};

/// Stream events applied per `tick` at most, so a chatty server cannot
/// starve the UI loop
const DRAIN_LIMIT: usize = 512;

/// A file-list response, tagged with the selection it was issued for
#[derive(Debug)]
pub struct FileListFetched {
    pub generation: u64,
    pub host_url: String,
    pub result: Result<Vec<String>, BackendError>,
}

/// Ties the host selection, file list, suggestions, health board and stream
/// session together
pub struct LogClient {
    backend: Arc<dyn Backend>,
    registry: HostRegistry,
    session: StreamSession,
    suggestions: SuggestionIndex,
    files: Vec<String>,
    focused: bool,
    health: HealthBoard,
    health_rx: Option<broadcast::Receiver<EventEnvelope>>,
    fetch_tx: mpsc::UnboundedSender<FileListFetched>,
    fetch_rx: mpsc::UnboundedReceiver<FileListFetched>,
    fetch_task: Option<JoinHandle<()>>,
    seen_resets: u64,
}

impl LogClient {
    pub fn new(backend: Arc<dyn Backend>, registry: HostRegistry, stream: &StreamConfig) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
        let health = HealthBoard::new(registry.hosts());
        Self {
            session: StreamSession::new(backend.clone(), stream.preflight_timeout(), stream.max_lines),
            backend,
            registry,
            suggestions: SuggestionIndex::new(),
            files: Vec::new(),
            focused: false,
            health,
            health_rx: None,
            fetch_tx,
            fetch_rx,
            fetch_task: None,
            seen_resets: 0,
        }
    }

    /// Feed the health board from a monitor subscription
    pub fn attach_health(&mut self, rx: broadcast::Receiver<EventEnvelope>) {
        self.health_rx = Some(rx);
    }

    /// Switch the active host. The outstanding fetch and stream are
    /// cancelled and all per-host state is dropped before the new fetch goes
    /// out.
    pub fn select_host(&mut self, host: Host) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        self.session.clear();
        self.suggestions.reset();
        self.files.clear();
        self.registry.select(host);
        self.refresh_files();
    }

    /// Move the selection `offset` hosts along the list
    pub fn cycle_host(&mut self, offset: isize) {
        if let Some(host) = self.registry.neighbour(offset).cloned() {
            self.select_host(host);
        }
    }

    /// Re-fetch the file list for the active host
    pub fn refresh_files(&mut self) {
        let Some(host) = self.registry.active().cloned() else {
            return;
        };
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }

        let generation = self.registry.generation();
        let backend = self.backend.clone();
        let tx = self.fetch_tx.clone();
        tracing::debug!(host = %host.name, generation, "fetching file list");
        self.fetch_task = Some(tokio::spawn(async move {
            let result = backend.list_files(&host).await;
            let _ = tx.send(FileListFetched {
                generation,
                host_url: host.url,
                result,
            });
        }));
    }

    /// Apply a file-list response unless it belongs to an abandoned
    /// selection. Returns whether it was applied.
    pub fn apply_fetch(&mut self, fetched: FileListFetched) -> bool {
        let current = self.registry.is_current(fetched.generation)
            && self.registry.active().is_some_and(|h| h.url == fetched.host_url);
        if !current {
            tracing::debug!(
                generation = fetched.generation,
                host = %fetched.host_url,
                "discarding stale file list"
            );
            return false;
        }

        self.fetch_task = None;
        match fetched.result {
            Ok(files) => {
                tracing::debug!(count = files.len(), "file list loaded");
                self.files = files;
            }
            Err(error) => {
                tracing::warn!(host = %fetched.host_url, %error, "file list fetch failed");
                self.files.clear();
                self.session.surface(ClientError::from_fetch(&error));
            }
        }
        if self.focused {
            let input = self.suggestions.input().to_string();
            self.suggestions.update(&self.files, &input);
        }
        true
    }

    /// Wait for the outstanding file-list fetch to land
    pub async fn wait_files(&mut self) -> Result<(), ClientError> {
        while self.fetch_task.is_some() {
            let Some(fetched) = self.fetch_rx.recv().await else {
                break;
            };
            let failed = fetched.result.as_ref().err().map(ClientError::from_fetch);
            if self.apply_fetch(fetched) {
                if let Some(error) = failed {
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    /// Apply whatever arrived since the last call without waiting. Returns
    /// true when anything changed.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;

        while let Ok(fetched) = self.fetch_rx.try_recv() {
            changed |= self.apply_fetch(fetched);
        }

        if let Some(rx) = self.health_rx.as_mut() {
            loop {
                match rx.try_recv() {
                    Ok(env) => {
                        tracing::trace!(id = env.id, "health event");
                        reduce(&mut self.health, &env);
                        changed = true;
                    }
                    Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "health events lagged");
                    }
                    Err(_) => break,
                }
            }
        }

        changed |= self.session.drain(DRAIN_LIMIT) > 0;
        changed
    }

    /// Wait for the next stream event
    pub async fn pump(&mut self) -> StreamUpdate {
        self.session.pump().await
    }

    pub async fn start(&mut self) -> Result<(), ClientError> {
        self.session
            .start(self.registry.active(), self.suggestions.input())
            .await
    }

    pub fn cancel_start(&mut self) {
        self.session.cancel_start();
    }

    pub fn stop(&mut self) {
        self.session.stop();
    }

    /// Stop, empty the buffer, clear the error and the filename
    pub fn clear(&mut self) {
        self.session.clear();
        self.suggestions.reset();
    }

    pub fn set_input(&mut self, input: &str) {
        if self.focused {
            self.suggestions.update(&self.files, input);
        } else {
            self.suggestions.set_input(input);
        }
    }

    pub fn focus(&mut self) {
        self.focused = true;
        self.suggestions.focus(&self.files);
    }

    pub fn blur(&mut self) -> Option<String> {
        self.focused = false;
        self.suggestions.blur()
    }

    pub fn move_next(&mut self) {
        self.suggestions.move_next();
    }

    pub fn move_previous(&mut self) {
        self.suggestions.move_previous();
    }

    pub fn select_current(&mut self) -> Option<String> {
        self.suggestions.select_current()
    }

    pub fn press(&mut self, index: usize) {
        self.suggestions.press(index);
    }

    /// True once per pre-flight failure since the last call
    pub fn take_view_reset(&mut self) -> bool {
        let resets = self.session.view_resets();
        let fired = resets != self.seen_resets;
        self.seen_resets = resets;
        fired
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn suggestions(&self) -> &SuggestionIndex {
        &self.suggestions
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn input(&self) -> &str {
        self.suggestions.input()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn files_loading(&self) -> bool {
        self.fetch_task.is_some()
    }

    pub fn health(&self) -> &HealthBoard {
        &self.health
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.session.error()
    }
}

impl Drop for LogClient {
    fn drop(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
    }
}
