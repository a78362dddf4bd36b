//! Line-oriented server-sent-event decoder. Consumes raw bytes incrementally
//! (so callers can drive it off a `reqwest::Response::bytes_stream()` without
//! buffering the whole response) and emits `(event, data)` pairs on blank
//! lines. Does not interpret the `data` payload as JSON; that is left to
//! each provider client.

/// One decoded SSE frame: its `event:` name (empty when absent) and the
/// accumulated `data:` payload (multiple `data:` lines before a flush are
/// joined with `\n`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental SSE decoder. Byte chunks may split lines at arbitrary
/// positions; a partial final line is buffered until the next `feed` call
/// completes it.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line_buffer: String,
    event: String,
    data: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes (lossily decoded as UTF-8, tolerating chunk
    /// boundaries that split a multi-byte character) and return every
    /// complete event flushed by a blank line within this chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.line_buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        loop {
            let Some(newline_pos) = self.line_buffer.find('\n') else {
                break;
            };
            let line: String = self.line_buffer.drain(..=newline_pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush any pending (event, data) state at end-of-stream.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.line_buffer.is_empty() {
            let remainder = std::mem::take(&mut self.line_buffer);
            self.process_line(&remainder);
        }
        self.flush()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.flush();
        }
        if let Some(rest) = line.strip_prefix("event:") {
            self.event = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest.trim());
        }
        None
    }

    fn flush(&mut self) -> Option<SseEvent> {
        if self.event.is_empty() && self.data.is_empty() {
            return None;
        }
        let event = SseEvent {
            event: std::mem::take(&mut self.event),
            data: std::mem::take(&mut self.data),
        };
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_with_two_data_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: a\n\ndata: b\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "a");
        assert_eq!(events[1].data, "b");
    }

    #[test]
    fn event_name_and_multi_line_data_are_joined() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: content_block_delta\ndata: part1\ndata: part2\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "content_block_delta");
        assert_eq!(events[0].data, "part1\npart2");
    }

    #[test]
    fn split_across_feed_calls_completes_on_second_call() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: hel").is_empty());
        let events = decoder.feed(b"lo\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn finish_flushes_a_pending_event_with_no_trailing_blank_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: tail").is_empty());
        let flushed = decoder.finish();
        assert_eq!(flushed, Some(SseEvent { event: String::new(), data: "tail".to_string() }));
    }

    #[test]
    fn finish_on_a_clean_boundary_yields_nothing() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"data: a\n\n");
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn unrecognized_lines_are_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": heartbeat\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }
}
