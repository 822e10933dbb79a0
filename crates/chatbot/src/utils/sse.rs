use crate::Result;

/// Incremental `text/event-stream` decoder yielding the `data` of each event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw body bytes and returns the data payload of every event they
    /// complete, in order. Incomplete trailing bytes stay buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buf.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some((end, separator_len)) = find_event_boundary(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..end + separator_len).collect();
            if let Some(data) = parse_event(std::str::from_utf8(&frame[..end])?) {
                events.push(data);
            }
        }
        Ok(events)
    }

    /// Flushes an event left unterminated when the body ended.
    pub fn finish(&mut self) -> Result<Option<String>> {
        let frame = std::mem::take(&mut self.buf);
        Ok(parse_event(std::str::from_utf8(&frame)?))
    }
}

/// Position and length of the first blank-line separator (LF, CRLF or mixed).
fn find_event_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    (0..buf.len()).find_map(|i| {
        let rest = &buf[i..];
        if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else if rest.starts_with(b"\n\r\n") {
            Some((i, 3))
        } else if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else {
            None
        }
    })
}

fn parse_event(frame: &str) -> Option<String> {
    let mut data: Option<String> = None;

    for line in frame.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field != "data" {
            continue;
        }

        match data.as_mut() {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    data
}
