//! Backend trait for log servers
//!
//! A backend knows how to reach a host's three endpoints. Implementations
//! live in the CLI crate (HTTP via reqwest, in-memory demo).
//!
//! Streams are delivered through a [`Transport`]: a channel of
//! [`TransportEvent`]s whose handle is owned by exactly one session.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::host::Host;

/// Errors that can occur talking to a backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendError {
    /// Server answered with a non-success status
    Status { code: u16 },
    /// Request could not be sent or the connection broke
    Request { message: String },
    /// No answer within the allowed time
    Timeout,
    /// Response body could not be decoded
    Decode { message: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Status { code } => write!(f, "HTTP {}", code),
            BackendError::Request { message } => write!(f, "request failed: {}", message),
            BackendError::Timeout => write!(f, "timed out"),
            BackendError::Decode { message } => write!(f, "invalid response body: {}", message),
        }
    }
}

impl std::error::Error for BackendError {}

/// What a stream transport can report
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// One event payload
    Message(String),
    /// The connection failed
    Failed(String),
    /// The remote side ended the stream
    Closed,
}

/// Exclusive handle on an open log stream
#[async_trait]
pub trait Transport: Send {
    /// Wait for the next event. `None` once closed locally or once the
    /// producer is gone and everything was drained. Cancel safe.
    async fn next(&mut self) -> Option<TransportEvent>;

    /// Take the next event if one is queued
    fn try_next(&mut self) -> Option<TransportEvent>;

    /// Stop the stream; queued and future events are discarded
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Transport backed by an mpsc channel fed from a producer task
#[derive(Debug)]
pub struct ChannelTransport {
    rx: mpsc::Receiver<TransportEvent>,
    producer: Option<AbortHandle>,
    closed: bool,
}

impl ChannelTransport {
    pub fn new(rx: mpsc::Receiver<TransportEvent>, producer: Option<AbortHandle>) -> Self {
        Self {
            rx,
            producer,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn next(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    fn try_next(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        self.rx.try_recv().ok()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        self.rx.close();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ChannelTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// The Backend trait defines how a log server is reached.
///
/// Every method is a single request; timeouts and retries are the caller's
/// business.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend implementation
    fn name(&self) -> &'static str;

    /// `GET /alive`: `Ok` only for a success status
    async fn alive(&self, host: &Host) -> Result<(), BackendError>;

    /// `GET /list-files`
    async fn list_files(&self, host: &Host) -> Result<Vec<String>, BackendError>;

    /// `GET /stream-logs?file=..` opened as an event stream
    async fn open_stream(&self, host: &Host, file: &str)
    -> Result<Box<dyn Transport>, BackendError>;
}
