//! # Line Framer
//!
//! Splits the raw serial byte stream into text lines on `\n`.
//!
//! Bytes after the last delimiter are kept in the accumulator and completed
//! by later calls to [`LineFramer::feed`], so the emitted line sequence does
//! not depend on how the stream was chunked. A line that is not valid UTF-8
//! is logged and skipped; the accumulator has already moved past it.
//!
//! The accumulator is unbounded: a stream that never sends a delimiter grows
//! it without limit.

use bytes::BytesMut;
use tracing::warn;

use super::protocol::LINE_DELIMITER;
use crate::error::AdcsError;

/// Default initial accumulator capacity
const DEFAULT_CAPACITY: usize = 256;

/// Incremental newline framer
#[derive(Debug)]
pub struct LineFramer {
    /// Bytes received but not yet emitted as a line
    buffer: BytesMut,
    /// Leading bytes of `buffer` already known to hold no delimiter
    scanned: usize,
    /// Lines dropped for invalid UTF-8
    discarded: u64,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(DEFAULT_CAPACITY),
            scanned: 0,
            discarded: 0,
        }
    }

    /// Append `bytes` and return an iterator over the lines completed so far.
    ///
    /// The iterator is lazy: each line is cut from the accumulator only when
    /// `next()` is called. Lines not consumed before the iterator is dropped
    /// stay buffered and are returned first by the next `feed`.
    ///
    /// # Examples
    ///
    /// ```
    /// use adcs_bridge::adcs::framer::LineFramer;
    ///
    /// let mut framer = LineFramer::new();
    /// assert_eq!(framer.feed(b"temp2").count(), 0);
    /// let lines: Vec<String> = framer.feed(b"1.5\r\ncounter 7\n").collect();
    /// assert_eq!(lines, vec!["temp21.5", "counter 7"]);
    /// ```
    pub fn feed(&mut self, bytes: &[u8]) -> FramedLines<'_> {
        self.buffer.extend_from_slice(bytes);
        FramedLines { framer: self }
    }

    /// Number of buffered bytes not yet terminated by a delimiter
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Total lines skipped because they were not valid UTF-8
    #[must_use]
    pub fn discarded_lines(&self) -> u64 {
        self.discarded
    }

    /// Drop any partial line (e.g. after the port is reopened)
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }

    /// Each byte is searched once, however many feeds a line spans
    fn find_delimiter(&mut self) -> Option<usize> {
        match self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == LINE_DELIMITER)
        {
            Some(offset) => {
                let pos = self.scanned + offset;
                self.scanned = 0;
                Some(pos)
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = self.find_delimiter()?;
            let raw = self.buffer.split_to(pos + 1);

            match std::str::from_utf8(&raw[..pos]) {
                Ok(text) => return Some(text.trim().to_string()),
                Err(e) => {
                    self.discarded += 1;
                    let err = AdcsError::Framing(format!("{} in {:02X?}", e, &raw[..pos]));
                    warn!("Skipping line: {}", err);
                }
            }
        }
    }
}

/// Lazy iterator over complete lines, returned by [`LineFramer::feed`]
#[derive(Debug)]
pub struct FramedLines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for FramedLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(framer: &mut LineFramer, chunks: &[&[u8]]) -> Vec<String> {
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(framer.feed(chunk));
        }
        lines
    }

    #[test]
    fn test_single_chunk() {
        let mut framer = LineFramer::new();
        let lines = feed_all(&mut framer, &[b"ab\ncd\n"]);
        assert_eq!(lines, vec!["ab", "cd"]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_chunking_does_not_change_lines() {
        let mut framer = LineFramer::new();
        let lines = feed_all(&mut framer, &[b"a", b"b\nc", b"d\n"]);
        assert_eq!(lines, vec!["ab", "cd"]);
    }

    #[test]
    fn test_byte_by_byte() {
        let stream = b"counter 1\nacc(1,2,3)\ntemp20\n";
        let mut framer = LineFramer::new();
        let chunks: Vec<&[u8]> = stream.chunks(1).collect();
        let lines = feed_all(&mut framer, &chunks);
        assert_eq!(lines, vec!["counter 1", "acc(1,2,3)", "temp20"]);
    }

    #[test]
    fn test_partial_line_is_retained() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(b"gyro(1,").count(), 0);
        assert_eq!(framer.pending_len(), 7);

        let lines: Vec<String> = framer.feed(b"2,3)\n").collect();
        assert_eq!(lines, vec!["gyro(1,2,3)"]);
    }

    #[test]
    fn test_trailing_carriage_return_trimmed() {
        let mut framer = LineFramer::new();
        let lines: Vec<String> = framer.feed(b"temp21.5\r\n  \r\n").collect();
        assert_eq!(lines, vec!["temp21.5", ""]);
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let mut framer = LineFramer::new();
        let lines: Vec<String> = framer.feed(b"ok1\n\xFF\xFE\nok2\n").collect();
        assert_eq!(lines, vec!["ok1", "ok2"]);
        assert_eq!(framer.discarded_lines(), 1);
    }

    #[test]
    fn test_unconsumed_lines_survive_drop() {
        let mut framer = LineFramer::new();
        {
            let mut iter = framer.feed(b"one\ntwo\n");
            assert_eq!(iter.next().as_deref(), Some("one"));
        }
        let rest: Vec<String> = framer.feed(b"three\n").collect();
        assert_eq!(rest, vec!["two", "three"]);
    }

    #[test]
    fn test_long_line_scanned_once() {
        let mut framer = LineFramer::new();
        for _ in 0..10_000 {
            assert_eq!(framer.feed(b"x").count(), 0);
        }
        assert_eq!(framer.scanned, 10_000);

        let lines: Vec<String> = framer.feed(b"\nab\ncd").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 10_000);
        assert_eq!(lines[1], "ab");
        assert_eq!(framer.scanned, 2);
        assert_eq!(framer.pending_len(), 2);

        let lines: Vec<String> = framer.feed(b"\n").collect();
        assert_eq!(lines, vec!["cd"]);
        assert_eq!(framer.scanned, 0);
    }

    #[test]
    fn test_reset_drops_partial() {
        let mut framer = LineFramer::new();
        let _ = framer.feed(b"garbage").count();
        framer.reset();
        assert_eq!(framer.scanned, 0);
        let lines: Vec<String> = framer.feed(b"temp1\n").collect();
        assert_eq!(lines, vec!["temp1"]);
    }
}
