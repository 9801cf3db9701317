//! Incremental Server-Sent Events decoder.
//!
//! Transports hand over raw byte chunks as they arrive; [`SseDecoder`] splits
//! them into lines (LF, CR or CRLF, possibly straddling chunk boundaries) and
//! assembles frames. Comment lines (`:` prefix) are reported as
//! [`SseFrame::Heartbeat`] so the connection can track liveness without
//! passing them to listeners.

use bytes::{Buf, BytesMut};
use std::time::Duration;

/// Largest data payload accepted for a single event (1 MiB).
pub const MAX_EVENT_BYTES: usize = 1 << 20;

/// A decoded unit of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A comment line. Servers send these as keep-alives.
    Heartbeat(String),
    /// A dispatched event.
    Event(SseEvent),
    /// A `retry:` field carrying the server's reconnection hint.
    Retry(Duration),
}

/// A complete event, dispatched at a blank line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    /// `event:` field; `None` means the default `message` type.
    pub event: Option<String>,
    /// Joined `data:` lines.
    pub data: String,
    /// Last `id:` seen on the stream.
    pub id: Option<String>,
}

impl SseEvent {
    /// The event type, defaulting to `message`.
    pub fn event_type(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

/// Stateful line decoder. One per connection; discard it on reconnect.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    event: Option<String>,
    data: String,
    has_data: bool,
    last_id: Option<String>,
    /// Previous chunk ended on CR; a leading LF in the next chunk belongs to it.
    pending_cr: bool,
    /// The current event outgrew [`MAX_EVENT_BYTES`]; skip to the next blank line.
    discarding: bool,
    /// An overlong line was cut; drop everything up to its terminator.
    skipping_line: bool,
    started: bool,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        let mut chunk = chunk;
        if self.pending_cr {
            self.pending_cr = false;
            if chunk.first() == Some(&b'\n') {
                chunk = &chunk[1..];
            }
        }
        self.buf.extend_from_slice(chunk);

        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n' || *b == b'\r') {
            let terminator = self.buf[pos];
            let line = self.buf.split_to(pos);
            self.buf.advance(1);
            if terminator == b'\r' {
                if self.buf.is_empty() {
                    self.pending_cr = true;
                } else if self.buf[0] == b'\n' {
                    self.buf.advance(1);
                }
            }
            if self.skipping_line {
                self.skipping_line = false;
                continue;
            }
            self.process_line(&line, &mut frames);
        }

        if self.skipping_line {
            self.buf.clear();
        } else if self.buf.len() > MAX_EVENT_BYTES {
            if !self.discarding {
                log::warn!(
                    "[agora-link] SSE line exceeds {} bytes, discarding event",
                    MAX_EVENT_BYTES
                );
                self.discard_event();
            }
            self.buf.clear();
            self.skipping_line = true;
        }

        frames
    }

    /// Flush at end of stream. Per the SSE processing model an event without
    /// its terminating blank line is incomplete and is dropped.
    pub fn finish(&mut self) {
        self.buf.clear();
        self.reset_event();
        self.discarding = false;
        self.skipping_line = false;
        self.pending_cr = false;
    }

    /// The last event ID seen, for resuming with `Last-Event-ID`.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    fn process_line(&mut self, raw: &[u8], frames: &mut Vec<SseFrame>) {
        let mut line = String::from_utf8_lossy(raw);
        if !self.started {
            self.started = true;
            if let Some(stripped) = line.strip_prefix('\u{feff}') {
                line = stripped.to_string().into();
            }
        }

        if line.is_empty() {
            if self.discarding {
                self.discarding = false;
                self.reset_event();
                return;
            }
            self.dispatch(frames);
            return;
        }

        if self.discarding {
            return;
        }

        if let Some(comment) = line.strip_prefix(':') {
            frames.push(SseFrame::Heartbeat(comment.trim_start().to_string()));
            return;
        }

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
            },
            None => (&line[..], ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                if self.data.len() + value.len() + 1 > MAX_EVENT_BYTES {
                    log::warn!(
                        "[agora-link] SSE event exceeds {} bytes, discarding",
                        MAX_EVENT_BYTES
                    );
                    self.discard_event();
                    return;
                }
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            },
            "id" => {
                if !value.contains('\0') {
                    self.last_id = Some(value.to_string());
                }
            },
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    frames.push(SseFrame::Retry(Duration::from_millis(ms)));
                }
            },
            other => log::debug!("[agora-link] Ignoring unknown SSE field '{}'", other),
        }
    }

    fn dispatch(&mut self, frames: &mut Vec<SseFrame>) {
        if self.has_data {
            frames.push(SseFrame::Event(SseEvent {
                event: self.event.take(),
                data: std::mem::take(&mut self.data),
                id: self.last_id.clone(),
            }));
        }
        self.reset_event();
    }

    fn discard_event(&mut self) {
        self.reset_event();
        self.discarding = true;
    }

    fn reset_event(&mut self) {
        self.event = None;
        self.data.clear();
        self.has_data = false;
    }
}
