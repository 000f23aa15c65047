use std::sync::Arc;
use std::time::Duration;

use logtail_core::backend::{Backend, BackendError, Transport, TransportEvent};
use logtail_core::error::{ClientError, is_sentinel};
use logtail_core::host::Host;
use logtail_core::state::{ErrorSlot, LogBuffer, SessionPhase, StreamTarget};

/// What handling one transport event did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamUpdate {
    Appended,
    Sentinel,
    Failed,
    Ignored,
}

/// One live log stream at a time, with its buffer and error slot
pub struct StreamSession {
    backend: Arc<dyn Backend>,
    preflight_timeout: Duration,
    phase: SessionPhase,
    target: Option<StreamTarget>,
    transport: Option<Box<dyn Transport>>,
    logs: LogBuffer,
    error: ErrorSlot,
    view_resets: u64,
}

impl StreamSession {
    pub fn new(backend: Arc<dyn Backend>, preflight_timeout: Duration, max_lines: Option<usize>) -> Self {
        Self {
            backend,
            preflight_timeout,
            phase: SessionPhase::Idle,
            target: None,
            transport: None,
            logs: LogBuffer::new(max_lines),
            error: ErrorSlot::default(),
            view_resets: 0,
        }
    }

    /// Validate, close any previous stream, check `/alive`, then open the
    /// stream. Lines already in the buffer are kept.
    pub async fn start(&mut self, host: Option<&Host>, file: &str) -> Result<(), ClientError> {
        let file = file.trim();
        if file.is_empty() {
            return Err(self.surface(ClientError::missing_file()));
        }
        let Some(host) = host else {
            return Err(self.surface(ClientError::missing_host()));
        };

        self.close_transport();
        self.error.clear();
        self.phase = SessionPhase::Connecting;
        self.target = Some(StreamTarget {
            host: host.clone(),
            file: file.to_string(),
        });
        tracing::debug!(host = %host.name, file, "pre-flight check");

        let preflight = tokio::time::timeout(self.preflight_timeout, self.backend.alive(host))
            .await
            .unwrap_or(Err(BackendError::Timeout));
        if let Err(error) = preflight {
            tracing::warn!(host = %host.name, %error, "pre-flight failed");
            self.phase = SessionPhase::Errored;
            self.view_resets += 1;
            return Err(self.surface(ClientError::from_preflight(&error)));
        }

        match self.backend.open_stream(host, file).await {
            Ok(transport) => {
                tracing::info!(host = %host.name, file, "streaming");
                self.transport = Some(transport);
                self.phase = SessionPhase::Streaming;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(host = %host.name, file, %error, "stream open failed");
                self.phase = SessionPhase::Errored;
                Err(self.surface(ClientError::stream_failed()))
            }
        }
    }

    /// Apply one transport event
    pub fn handle(&mut self, event: TransportEvent) -> StreamUpdate {
        if self.transport.is_none() {
            return StreamUpdate::Ignored;
        }

        match event {
            TransportEvent::Message(data) if is_sentinel(&data) => {
                self.phase = SessionPhase::Errored;
                self.error.raise(ClientError::sentinel(&data));
                StreamUpdate::Sentinel
            }
            TransportEvent::Message(data) => {
                self.logs.push(data);
                self.error.clear();
                self.phase = SessionPhase::Streaming;
                StreamUpdate::Appended
            }
            TransportEvent::Failed(reason) => {
                tracing::warn!(%reason, "log stream failed");
                self.fail()
            }
            TransportEvent::Closed => {
                tracing::info!("log stream ended by server");
                self.fail()
            }
        }
    }

    fn fail(&mut self) -> StreamUpdate {
        self.close_transport();
        self.phase = SessionPhase::Errored;
        self.error.raise(ClientError::stream_failed());
        StreamUpdate::Failed
    }

    /// Wait for and apply the next transport event. Pending forever while no
    /// stream is open, so it can sit in a `select!` arm. Cancel safe.
    pub async fn pump(&mut self) -> StreamUpdate {
        let event = match self.transport.as_mut() {
            Some(transport) => transport.next().await,
            None => std::future::pending().await,
        };
        match event {
            Some(event) => self.handle(event),
            // producer gone without a word
            None => self.handle(TransportEvent::Closed),
        }
    }

    /// Apply up to `limit` queued events without waiting
    pub fn drain(&mut self, limit: usize) -> usize {
        let mut applied = 0;
        while applied < limit {
            let Some(event) = self.transport.as_mut().and_then(|t| t.try_next()) else {
                break;
            };
            self.handle(event);
            applied += 1;
        }
        applied
    }

    /// Close the stream, drop what it queued and empty the buffer
    pub fn stop(&mut self) {
        if self.close_transport() {
            tracing::info!("log stream stopped");
        }
        self.logs.clear();
        self.phase = SessionPhase::Idle;
    }

    /// Abandon a `start` dropped before it finished. The buffer is kept.
    pub fn cancel_start(&mut self) {
        if self.phase == SessionPhase::Connecting && self.transport.is_none() {
            tracing::debug!("pre-flight cancelled");
            self.phase = SessionPhase::Idle;
        }
    }

    /// Stop if active, empty the buffer and clear the error
    pub fn clear(&mut self) {
        self.stop();
        self.error.clear();
        self.target = None;
    }

    /// Put an error in the slot, returning it for propagation
    pub fn surface(&mut self, error: ClientError) -> ClientError {
        self.error.raise(error.clone());
        error
    }

    fn close_transport(&mut self) -> bool {
        match self.transport.take() {
            Some(mut transport) => {
                transport.close();
                true
            }
            None => false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn target(&self) -> Option<&StreamTarget> {
        self.target.as_ref()
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.get()
    }

    pub fn is_active(&self) -> bool {
        self.transport.is_some()
    }

    /// Bumped whenever the log view should jump back to the top
    pub fn view_resets(&self) -> u64 {
        self.view_resets
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close_transport();
    }
}
