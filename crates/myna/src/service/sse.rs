//! Minimal decoder for the service's `text/event-stream` run feeds.
//!
//! The HTTP client hands us the response body in arbitrary chunks, so
//! the decoder buffers bytes and only surfaces complete records. Working
//! on bytes (not strings) matters: a chunk boundary can land inside a
//! multi-byte character, but never inside the `\n` that ends a line.

/// One server-sent event: the `event:` name plus the joined `data:`
/// payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SseRecord {
    pub event: String,
    pub data: String,
}

/// Reassembles SSE records from chunked input.
///
/// Records end at a blank line. Multiple `data:` lines join with `\n`
/// per the SSE framing rules; comment lines and fields other than
/// `event:` / `data:` are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: String,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every record it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseRecord> {
        self.buffer.extend_from_slice(chunk);
        let mut records = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
            if let Some(record) = self.take_line(line) {
                records.push(record);
            }
        }
        records
    }

    fn take_line(&mut self, line: &str) -> Option<SseRecord> {
        if line.is_empty() {
            if self.event.is_empty() && self.data.is_empty() {
                return None;
            }
            let record = SseRecord {
                event: std::mem::take(&mut self.event),
                data: self.data.join("\n"),
            };
            self.data.clear();
            return Some(record);
        }
        if let Some(value) = line.strip_prefix("event:") {
            self.event = value.strip_prefix(' ').unwrap_or(value).to_string();
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // Comment lines and other fields (id:, retry:) carry nothing we use.
        None
    }
}
