//! Server-sent events decoding
//!
//! Network chunks do not line up with SSE lines, so bytes are buffered until a
//! full line is available and events are emitted on the blank line that ends
//! them.

#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning the `data` payload of every completed event
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(event) = self.handle_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever is left once the byte stream has ended
    pub(crate) fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            let _ = self.handle_line(&String::from_utf8_lossy(&line));
        }
        self.take_event()
    }

    fn handle_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            return self.take_event();
        }
        // Other fields (event:, id:, retry:) and `:` comments are not used by
        // the providers here.
        if let Some(rest) = line.strip_prefix("data:") {
            self.data
                .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}
