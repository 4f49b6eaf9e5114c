//! Pattern buffer with tail-only prompt search.
//!
//! Prompts always sit at the end of the stream, so only the last
//! `search_depth` bytes are scanned after each read. Long diagnostic
//! outputs never get rescanned from the top.

use bytes::BytesMut;
use regex::bytes::Regex;

/// Accumulates channel output with ANSI escapes removed.
#[derive(Debug)]
pub struct PatternBuffer {
    buffer: BytesMut,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a buffer that searches the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
        }
    }

    /// Append data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Search the tail for `pattern`.
    ///
    /// Returns the match end as an offset into the full buffer.
    pub fn search_tail(&self, pattern: &Regex) -> Option<usize> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern
            .find(&self.buffer[start..])
            .map(|m| start + m.end())
    }

    /// Split off everything up to `end`, leaving the remainder buffered.
    pub fn split_to(&mut self, end: usize) -> Vec<u8> {
        self.buffer.split_to(end).to_vec()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mGi1/0/3\x1b[0m err-disabled");
        assert_eq!(&buffer.buffer[..], b"Gi1/0/3 err-disabled");
    }

    #[test]
    fn test_tail_search_finds_prompt() {
        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nsw1#");

        let pattern = Regex::new(r"sw1#").unwrap();
        assert_eq!(buffer.search_tail(&pattern), Some(105));
    }

    #[test]
    fn test_tail_search_ignores_old_prompt() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"sw1#");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"sw1#").unwrap();
        assert!(buffer.search_tail(&pattern).is_none());
    }

    #[test]
    fn test_split_keeps_remainder() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"output\nsw1#trailing");
        let head = buffer.split_to(11);
        assert_eq!(head, b"output\nsw1#");
        assert_eq!(&buffer.buffer[..], b"trailing");
        assert_eq!(buffer.split_to(8), b"trailing");
        assert!(buffer.buffer.is_empty());
    }
}
