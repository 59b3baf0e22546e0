//! Incremental Server-Sent Events decoder for streaming API responses.
//!
//! Bytes are buffered until a full line is available, so multi-byte UTF-8
//! sequences split across network chunks decode correctly.
//!
//! ```text
//! event: message
//! data: {"candidates": [...]}
//!
//! data: [DONE]
//! ```

/// One decoded SSE frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, if any.
    pub event: Option<String>,
    /// All `data:` lines joined with `\n`.
    pub data: String,
}

impl SseFrame {
    /// Whether this frame is the `[DONE]` sentinel some providers send.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Streaming decoder; feed it raw bytes and collect finished frames.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk of bytes, returning every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line).into_owned();
            if let Some(frame) = self.accept_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing frame at end of stream (data without a final blank line).
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest);
            let line = line.strip_suffix('\r').unwrap_or(&line).to_owned();
            self.accept_line(&line);
        }
        self.take_frame()
    }

    fn accept_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.take_frame();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_owned()),
            "event" => self.event = Some(value.to_owned()),
            _ => {}
        }
        None
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        if self.data.is_empty() {
            self.event = None;
            return None;
        }
        Some(SseFrame {
            event: self.event.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn decode_all(input: &[u8]) -> Vec<SseFrame> {
        let mut decoder = SseDecoder::new();
        let mut frames = decoder.feed(input);
        frames.extend(decoder.finish());
        frames
    }

    #[test]
    fn decodes_consecutive_frames() {
        let frames = decode_all(b"data: first\n\ndata: second\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "first");
        assert_eq!(frames[1].data, "second");
    }

    #[test]
    fn joins_multi_line_data_and_keeps_event_name() {
        let frames = decode_all(b"event: status\ndata: a\ndata: b\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("status"));
        assert_eq!(frames[0].data, "a\nb");
    }

    #[test]
    fn ignores_comments_and_unknown_fields() {
        let frames = decode_all(b": keep-alive\nretry: 100\nid: 7\ndata: x\n\n");
        assert_eq!(frames, vec![SseFrame { event: None, data: "x".into() }]);
    }

    #[test]
    fn value_without_space_after_colon() {
        let frames = decode_all(b"data:{\"a\":1}\n\n");
        assert_eq!(frames[0].data, "{\"a\":1}");
    }

    #[test]
    fn frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: hel").is_empty());
        let frames = decoder.feed(b"lo\n\ndata: wor");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "hello");
        assert!(decoder.feed(b"ld\n").is_empty());
        assert_eq!(decoder.finish().map(|f| f.data).as_deref(), Some("world"));
    }

    #[test]
    fn utf8_split_across_chunks() {
        let bytes = "data: héllo\n\n".as_bytes();
        // Split inside the two-byte 'é'.
        let split = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(&bytes[..split]).is_empty());
        let frames = decoder.feed(&bytes[split..]);
        assert_eq!(frames[0].data, "héllo");
    }

    #[test]
    fn crlf_line_endings() {
        let frames = decode_all(b"data: hi\r\n\r\n");
        assert_eq!(frames[0].data, "hi");
    }

    #[test]
    fn done_sentinel() {
        let frames = decode_all(b"data: [DONE]\n\n");
        assert!(frames[0].is_done());
    }

    #[test]
    fn blank_lines_without_data_emit_nothing() {
        assert!(decode_all(b"\n\n\nevent: ping\n\n").is_empty());
    }
}
