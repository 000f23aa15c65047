use std::collections::{BTreeMap, VecDeque};

use crate::error::ClientError;
use crate::host::{Host, HostStatus};

/// Lifecycle of a stream session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Errored,
}

impl SessionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Connecting => "connecting",
            SessionPhase::Streaming => "streaming",
            SessionPhase::Errored => "errored",
        }
    }
}

/// Host and file a session is bound to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamTarget {
    pub host: Host,
    pub file: String,
}

#[derive(Clone, Debug)]
pub struct LogLine {
    pub text: String,
}

/// Ordered lines received by the current session.
/// Unbounded unless a cap is set, in which case the oldest line goes first.
#[derive(Debug, Default)]
pub struct LogBuffer {
    pub cap: Option<usize>,
    lines: VecDeque<LogLine>,
    /// Lines dropped because of the cap since the last clear
    dropped: usize,
}

impl LogBuffer {
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            cap,
            lines: VecDeque::new(),
            dropped: 0,
        }
    }

    pub fn push(&mut self, text: String) {
        self.lines.push_back(LogLine { text });
        if let Some(cap) = self.cap {
            while self.lines.len() > cap {
                self.lines.pop_front();
                self.dropped += 1;
            }
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.dropped = 0;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 1-based number of the first retained line
    pub fn first_line_number(&self) -> usize {
        self.dropped + 1
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogLine> + ExactSizeIterator {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&LogLine> {
        self.lines.back()
    }
}

/// Single current-error slot: the latest error wins, nothing is queued
#[derive(Debug, Default)]
pub struct ErrorSlot {
    current: Option<ClientError>,
}

impl ErrorSlot {
    pub fn raise(&mut self, error: ClientError) {
        tracing::debug!(kind = error.kind(), message = %error, "error surfaced");
        self.current = Some(error);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn get(&self) -> Option<&ClientError> {
        self.current.as_ref()
    }
}

/// Latest probe result per host
#[derive(Clone, Debug, Default)]
pub struct HealthBoard {
    pub statuses: BTreeMap<String, HostStatus>,
    pub last_cycle: u64,
}

impl HealthBoard {
    /// Every host starts out offline until its first probe lands
    pub fn new<'a>(hosts: impl IntoIterator<Item = &'a Host>) -> Self {
        Self {
            statuses: hosts
                .into_iter()
                .map(|h| (h.name.clone(), HostStatus::Offline))
                .collect(),
            last_cycle: 0,
        }
    }

    pub fn status(&self, name: &str) -> HostStatus {
        self.statuses.get(name).copied().unwrap_or_default()
    }

    pub fn online_count(&self) -> usize {
        self.statuses.values().filter(|s| s.is_online()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_buffer_keeps_everything() {
        let mut buffer = LogBuffer::new(None);
        for i in 0..50 {
            buffer.push(format!("line {}", i));
        }
        assert_eq!(buffer.len(), 50);
        assert_eq!(buffer.first_line_number(), 1);
        assert_eq!(buffer.iter().next().unwrap().text, "line 0");
    }

    #[test]
    fn test_capped_buffer_drops_oldest() {
        let mut buffer = LogBuffer::new(Some(3));
        for i in 0..5 {
            buffer.push(format!("line {}", i));
        }
        let texts: Vec<_> = buffer.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["line 2", "line 3", "line 4"]);
        assert_eq!(buffer.first_line_number(), 3);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.first_line_number(), 1);
    }

    #[test]
    fn test_error_slot_latest_wins() {
        let mut slot = ErrorSlot::default();
        slot.raise(ClientError::missing_file());
        slot.raise(ClientError::stream_failed());
        assert_eq!(slot.get(), Some(&ClientError::stream_failed()));
        slot.clear();
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_health_board_defaults_offline() {
        let hosts = vec![Host::new("a", "http://a"), Host::new("b", "http://b")];
        let board = HealthBoard::new(&hosts);
        assert_eq!(board.status("a"), HostStatus::Offline);
        assert_eq!(board.status("unknown"), HostStatus::Offline);
        assert_eq!(board.online_count(), 0);
    }
}
