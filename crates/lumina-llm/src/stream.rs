//! Server-sent event decoding for streamed completions
//!
//! OpenAI-compatible endpoints stream `data: {...}` frames separated by blank
//! lines and close with `data: [DONE]`. Network chunks do not respect frame
//! or even UTF-8 boundaries, so [`SseDecoder`] buffers raw bytes and only
//! releases complete lines.

use crate::Result;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of text increments produced by a streamed completion
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

const DONE_MARKER: &str = "[DONE]";

/// A decoded server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of a `data:` line
    Data(String),
    /// The terminal `[DONE]` marker
    Done,
}

/// Incremental decoder for `text/event-stream` bodies
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` marker has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk of bytes and return every event completed by it
    ///
    /// Comment lines, `event:`/`id:` fields and blank separators are skipped.
    /// Nothing is returned once the terminal marker has been decoded.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);

            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim_start();

            if payload == DONE_MARKER {
                self.done = true;
                self.buffer.clear();
                events.push(SseEvent::Done);
                break;
            }
            if !payload.is_empty() {
                events.push(SseEvent::Data(payload.to_string()));
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"a\":1}\n\n");
        assert_eq!(events, vec![SseEvent::Data("{\"a\":1}".to_string())]);
        assert!(!decoder.is_done());
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"con").is_empty());
        assert!(decoder.push(b"tent\":\"hi\"}").is_empty());
        let events = decoder.push(b"\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Data("{\"content\":\"hi\"}".to_string())]
        );
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let frame = "data: caf\u{e9}\n".as_bytes();
        let split = frame.len() - 2;
        assert!(decoder.push(&frame[..split]).is_empty());
        let events = decoder.push(&frame[split..]);
        assert_eq!(events, vec![SseEvent::Data("caf\u{e9}".to_string())]);
    }

    #[test]
    fn test_done_marker_stops_decoding() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: one\r\n\r\ndata: [DONE]\n\ndata: late\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Data("one".to_string()), SseEvent::Done]
        );
        assert!(decoder.is_done());
        assert!(decoder.push(b"data: more\n").is_empty());
    }

    #[test]
    fn test_ignores_comments_and_fields() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\nevent: message\nid: 7\ndata: x\n\n");
        assert_eq!(events, vec![SseEvent::Data("x".to_string())]);
    }
}
