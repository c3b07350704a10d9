//! Incremental Server-Sent-Events decoding of streamed model output.
//!
//! The chat function relays the model gateway's event stream unchanged. Chunks
//! arrive with arbitrary boundaries, so the decoder buffers raw bytes and only
//! looks at a line once its terminating newline has arrived. That also keeps
//! multi-byte UTF-8 sequences split across chunks intact.
//!
//! Per line: a trailing `\r` is stripped, blank lines and `:` comments are
//! skipped, only `data: ` lines are considered, `[DONE]` ends the stream, and
//! anything else is parsed as JSON with the text fragment read from
//! `choices[0].delta.content`. A line that is not valid JSON is logged and
//! dropped; decoding carries on with the next line.

use serde_json::Value;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";
const FRAGMENT_POINTER: &str = "/choices/0/delta/content";

#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    Fragment(String),
    Done,
}

enum Line {
    Skip,
    Event(SseEvent),
    Malformed,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.finished
    }

    /// Feed one chunk and return the events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        if self.finished {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if self.handle_line(&line[..line.len() - 1], &mut events) {
                break;
            }
        }
        events
    }

    /// Process whatever is left once the transport is exhausted: an
    /// unterminated trailing line is treated as complete.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        if !self.finished && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.handle_line(&line, &mut events);
        }
        self.buffer.clear();
        events
    }

    /// Returns true when decoding must stop.
    fn handle_line(&mut self, raw: &[u8], events: &mut Vec<SseEvent>) -> bool {
        match decode_line(raw) {
            Line::Skip => false,
            Line::Event(SseEvent::Done) => {
                self.finished = true;
                self.buffer.clear();
                events.push(SseEvent::Done);
                true
            }
            Line::Event(event) => {
                events.push(event);
                false
            }
            Line::Malformed => {
                tracing::warn!(
                    line = %String::from_utf8_lossy(raw),
                    "dropping malformed stream frame"
                );
                false
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> Line {
    let text = String::from_utf8_lossy(raw);
    let text = text.strip_suffix('\r').unwrap_or(&*text);

    if text.trim().is_empty() || text.starts_with(':') {
        return Line::Skip;
    }
    let Some(payload) = text.strip_prefix(DATA_PREFIX) else {
        return Line::Skip;
    };
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Line::Event(SseEvent::Done);
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(json) => match extract_fragment(&json) {
            Some(fragment) => Line::Event(SseEvent::Fragment(fragment.to_string())),
            None => Line::Skip,
        },
        Err(_) => Line::Malformed,
    }
}

/// Text fragment of an OpenAI-style streaming chunk, if it carries one.
pub fn extract_fragment(json: &Value) -> Option<&str> {
    json.pointer(FRAGMENT_POINTER)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}
