use serde_json::Value;

use crate::config::DEFAULT_MAX_BUFFERED_EVENT_BYTES;
use crate::error::TutorApiError;
use crate::events::ChatStreamEvent;

/// Incremental decoder for the chat event stream.
///
/// Chunks may split an event anywhere, including inside the `\n\n` delimiter
/// or a multibyte UTF-8 sequence; only delimiter-terminated segments and
/// complete sequences are committed, so a split boundary resolves once the
/// next chunk arrives. One decoder instance serves exactly one stream.
#[derive(Debug)]
pub struct EventStreamParser {
    buffer: String,
    /// Trailing bytes of a UTF-8 sequence split at a chunk boundary.
    pending: Vec<u8>,
    max_buffered_bytes: usize,
}

impl Default for EventStreamParser {
    fn default() -> Self {
        Self::with_buffer_limit(DEFAULT_MAX_BUFFERED_EVENT_BYTES)
    }
}

impl EventStreamParser {
    #[must_use]
    pub fn with_buffer_limit(max_buffered_bytes: usize) -> Self {
        Self {
            buffer: String::new(),
            pending: Vec::new(),
            max_buffered_bytes,
        }
    }

    /// Feed arbitrary bytes into the decoder and drain complete events.
    ///
    /// A malformed JSON payload is a terminal decode failure for the stream,
    /// not a silent drop.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<ChatStreamEvent>, TutorApiError> {
        self.push_bytes(bytes);
        let mut events = Vec::new();

        while let Some(split) = self.buffer.find("\n\n") {
            let frame = self.buffer[..split].to_string();
            self.buffer.drain(0..split + 2);

            if let Some(event) = parse_frame(&frame)? {
                events.push(event);
            }
        }

        // A producer that never terminates an event would otherwise grow the
        // buffer without bound.
        if self.buffer.len() > self.max_buffered_bytes {
            return Err(TutorApiError::EventTooLarge {
                buffered: self.buffer.len(),
                limit: self.max_buffered_bytes,
            });
        }

        Ok(events)
    }

    /// Drain the residual segment at stream end. The producer may omit the
    /// trailing delimiter on its last event.
    pub fn finish(&mut self) -> Result<Option<ChatStreamEvent>, TutorApiError> {
        // Held-back bytes can no longer complete their sequence.
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&pending));
        }

        let residual = std::mem::take(&mut self.buffer);
        if residual.trim().is_empty() {
            return Ok(None);
        }

        parse_frame(&residual)
    }

    /// Decode a complete stream held in memory, including any undelimited
    /// final event.
    pub fn parse_frames(input: &str) -> Result<Vec<ChatStreamEvent>, TutorApiError> {
        let mut parser = Self::default();
        let mut events = parser.feed(input.as_bytes())?;
        if let Some(event) = parser.finish()? {
            events.push(event);
        }

        Ok(events)
    }

    #[must_use]
    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty() && self.pending.is_empty()
    }

    /// Append raw bytes, decoding only complete UTF-8 sequences. A multibyte
    /// sequence split at the chunk boundary is held back until the rest of it
    /// arrives; genuinely invalid bytes decode to the replacement character.
    fn push_bytes(&mut self, bytes: &[u8]) {
        let mut data = std::mem::take(&mut self.pending);
        data.extend_from_slice(bytes);

        let mut rest = data.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    rest = &[];
                    break;
                }
                Err(error) => {
                    let (valid, tail) = rest.split_at(error.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match error.error_len() {
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[invalid..];
                        }
                        // Incomplete trailing sequence; wait for more bytes.
                        None => {
                            rest = tail;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
    }
}

fn parse_frame(frame: &str) -> Result<Option<ChatStreamEvent>, TutorApiError> {
    let mut event_type: Option<&str> = None;
    let mut payload: Option<&str> = None;

    // Last occurrence wins for both markers; only one of each is expected.
    for line in frame.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event_type = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("data:") {
            payload = Some(value.trim());
        }
    }

    let Some(payload) = payload.filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    let value = serde_json::from_str::<Value>(payload)
        .map_err(|error| TutorApiError::MalformedEvent(error.to_string()))?;

    Ok(map_event(event_type.unwrap_or("message"), &value))
}

fn map_event(event_type: &str, value: &Value) -> Option<ChatStreamEvent> {
    match event_type {
        "message" => {
            let payload_type = value.get("type").and_then(Value::as_str)?;
            if payload_type != "token" {
                return None;
            }

            let text = value.get("data").and_then(Value::as_str).unwrap_or("");
            Some(ChatStreamEvent::Token {
                text: text.to_owned(),
            })
        }
        "error" => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("stream error");
            Some(ChatStreamEvent::Error {
                message: message.to_owned(),
            })
        }
        "end" => Some(ChatStreamEvent::End),
        _ => None,
    }
}
