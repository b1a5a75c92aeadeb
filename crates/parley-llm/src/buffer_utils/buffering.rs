use anyhow::Result;
use std::collections::VecDeque;

/// Byte buffer that yields complete SSE lines
///
/// Network chunks split lines (and UTF-8 sequences) at arbitrary points, so
/// bytes are held until a `\n` arrives.
pub struct LineBuffer {
    buffer: VecDeque<u8>,
}

impl LineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete line with its terminator (`\n` or `\r\n`) stripped
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(Self::decode(&line_bytes))
    }

    /// Whatever is left once the byte stream has ended
    pub fn take_remaining(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest: Vec<u8> = self.buffer.drain(..).collect();
        Some(Self::decode(&rest))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn decode(bytes: &[u8]) -> Result<String> {
        let line = std::str::from_utf8(bytes)
            .map_err(|e| anyhow::anyhow!("Invalid UTF-8 in event stream: {}", e))?;
        Ok(line.trim_end_matches(&['\n', '\r'][..]).to_string())
    }
}
