//! # Push Record Framing
//!
//! Incremental parser for the push transport's chunked body: blocks of
//! `event: <name>` / `data: <text>` lines terminated by a blank line.
//! Data may span multiple `data:` lines, joined with newline. Unrecognized
//! lines are ignored. A block missing either the type or the data is
//! dropped rather than dispatched.

/// One fully-accumulated record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseRecord {
    /// Record type from the `event:` line
    pub event: String,

    /// Accumulated `data:` lines
    pub data: String,
}

/// Incremental record parser
///
/// Bytes are buffered until a complete line exists; lines are only decoded
/// once complete, so multi-byte characters split across chunk boundaries
/// survive intact.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event_type: String,
    data: String,
}

impl SseParser {
    /// Create an empty parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk, returning every record completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseRecord> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            self.process_line(&line, &mut records);
        }
        records
    }

    fn process_line(&mut self, line: &str, records: &mut Vec<SseRecord>) {
        if line.trim().is_empty() {
            if !self.event_type.is_empty() && !self.data.is_empty() {
                records.push(SseRecord {
                    event: std::mem::take(&mut self.event_type),
                    data: std::mem::take(&mut self.data),
                });
            } else {
                self.event_type.clear();
                self.data.clear();
            }
            return;
        }

        if let Some(rest) = line.strip_prefix("event:") {
            self.event_type = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            let text = rest.trim();
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(text);
        }
        // Anything else is ignored
    }
}
