//! Incremental decoder for `text/event-stream` bodies
//!
//! Bytes arrive in arbitrary chunks; lines are only decoded once complete so
//! a chunk boundary inside a multi-byte character is harmless.

/// One dispatched server-sent event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, `None` for the default `message` type
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    /// Events delivered to a plain `onmessage` handler
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    event: Option<String>,
    id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every event it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline_index) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut line = self.buffer.drain(..=newline_index).collect::<Vec<_>>();
            line.pop();
            if matches!(line.last(), Some(b'\r')) {
                line.pop();
            }
            if let Some(event) = self.process_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// End of stream. An event without its terminating blank line is
    /// incomplete and is discarded; returns true if one was pending.
    pub fn finish(&mut self) -> bool {
        let pending = !self.buffer.is_empty() || !self.data.is_empty();
        self.buffer.clear();
        self.data.clear();
        self.event = None;
        pending
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event,
            data,
            id: self.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_of(events: &[SseEvent]) -> Vec<&str> {
        events.iter().map(|e| e.data.as_str()).collect()
    }

    #[test]
    fn test_simple_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: first line\n\ndata: Error: File not found: x.log\n\n");
        assert_eq!(data_of(&events), vec!["first line", "Error: File not found: x.log"]);
        assert!(events.iter().all(SseEvent::is_message));
    }

    #[test]
    fn test_split_chunks_and_crlf() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: hel").is_empty());
        assert!(decoder.feed(b"lo\r\n").is_empty());
        let events = decoder.feed(b"\r\n");
        assert_eq!(data_of(&events), vec!["hello"]);
    }

    #[test]
    fn test_split_inside_utf8() {
        let bytes = "data: caf\u{e9}\n\n".as_bytes();
        let split = bytes.len() - 3;
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&bytes[..split]).is_empty());
        let events = decoder.feed(&bytes[split..]);
        assert_eq!(data_of(&events), vec!["caf\u{e9}"]);
    }

    #[test]
    fn test_multiline_data_comments_and_fields() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keep-alive\nid: 7\ndata:a\ndata: b\n\nevent: ping\ndata: x\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "a\nb");
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert!(events[0].is_message());
        assert_eq!(events[1].event.as_deref(), Some("ping"));
        assert!(!events[1].is_message());
    }

    #[test]
    fn test_blank_lines_without_data_dispatch_nothing() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"\n\nevent: x\n\n").is_empty());
    }

    #[test]
    fn test_finish_discards_unterminated_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: hello\n\ndata: Error: disk fu");
        assert_eq!(data_of(&events), vec!["hello"]);
        assert!(decoder.finish());
        assert!(!decoder.finish());
    }

    #[test]
    fn test_finish_discards_data_missing_blank_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: complete line\n").is_empty());
        assert!(decoder.finish());
        // nothing leaks into the next stream
        assert!(decoder.feed(b"\n").is_empty());
    }
}
