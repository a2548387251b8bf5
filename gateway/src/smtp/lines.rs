//! Line reassembly for data arriving in arbitrary chunks.

/// Buffers raw bytes and hands out complete lines.
///
/// Lines end at `\n`; a `\r` right before it is stripped. A bare `\n` with
/// nothing before it is skipped, while `\r\n` on its own yields an empty
/// line. Bytes after the last `\n` stay buffered until more data arrives,
/// with no upper bound on their size.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    /// Start of the first line not yet handed out.
    start: usize,
    /// Everything in `start..scanned` is known to contain no `\n`.
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and iterate over every line they complete.
    ///
    /// Lines not consumed from the iterator stay available for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Lines<'_> {
        self.compact();
        self.buffer.extend_from_slice(bytes);
        Lines { buffer: self }
    }

    /// Bytes buffered that do not form a complete line yet.
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// Pop the next complete line.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let offset = self.buffer[self.scanned..].iter().position(|&b| b == b'\n');
            let Some(offset) = offset else {
                self.scanned = self.buffer.len();
                return None;
            };

            let end = self.scanned + offset;
            let line = match &self.buffer[self.start..end] {
                [] => None,
                [rest @ .., b'\r'] => Some(String::from_utf8_lossy(rest).into_owned()),
                line => Some(String::from_utf8_lossy(line).into_owned()),
            };

            self.start = end + 1;
            self.scanned = self.start;

            if line.is_some() {
                return line;
            }
        }
    }

    /// Drop bytes that were already handed out.
    fn compact(&mut self) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
    }
}

/// Lazy iterator over the lines completed by one [`LineBuffer::feed`].
pub struct Lines<'a> {
    buffer: &'a mut LineBuffer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.buffer.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_chunks(chunks: &[&[u8]]) -> Vec<String> {
        let mut buffer = LineBuffer::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(buffer.feed(chunk));
        }
        lines
    }

    #[test]
    fn test_crlf_and_lf_lines() {
        let lines = collect_chunks(&[b"HELO a\r\nNOOP\nQUIT\r\n"]);
        assert_eq!(lines, vec!["HELO a", "NOOP", "QUIT"]);
    }

    #[test]
    fn test_partial_line_stays_buffered() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.feed(b"MAIL FR").count(), 0);
        assert_eq!(buffer.pending(), 7);

        let lines: Vec<String> = buffer.feed(b"OM:<a@b>\r\nRC").collect();
        assert_eq!(lines, vec!["MAIL FROM:<a@b>"]);
        assert_eq!(buffer.pending(), 2);
    }

    #[test]
    fn test_bare_lf_is_dropped() {
        let lines = collect_chunks(&[b"\nA\n\n\nB\r\n"]);
        assert_eq!(lines, vec!["A", "B"]);
    }

    #[test]
    fn test_crlf_blank_line_is_kept() {
        let lines = collect_chunks(&[b"Subject: hi\r\n\r\nbody\r\n\n\r\n"]);
        assert_eq!(lines, vec!["Subject: hi", "", "body", ""]);
    }

    #[test]
    fn test_crlf_blank_line_split_between_cr_and_lf() {
        let lines = collect_chunks(&[b"a\r\n\r", b"\nb\r\n"]);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn test_bare_cr_inside_line_is_kept() {
        let lines = collect_chunks(&[b"a\rb\r\n"]);
        assert_eq!(lines, vec!["a\rb"]);
    }

    #[test]
    fn test_split_invariance() {
        let input: &[u8] =
            b"HELO test\r\nMAIL FROM:<x@y>\r\n\r\nRCPT TO:<a@b>\nDATA\r\nhello\r\n.\r\nQUIT\r\ntail";
        let whole = collect_chunks(&[input]);

        for split in 0..=input.len() {
            let (a, b) = input.split_at(split);
            assert_eq!(collect_chunks(&[a, b]), whole, "split at {split}");
        }

        let bytewise: Vec<&[u8]> = input.chunks(1).collect();
        assert_eq!(collect_chunks(&bytewise), whole);

        for size in 2..7 {
            let chunks: Vec<&[u8]> = input.chunks(size).collect();
            assert_eq!(collect_chunks(&chunks), whole, "chunk size {size}");
        }
    }

    #[test]
    fn test_split_between_cr_and_lf() {
        let lines = collect_chunks(&[b"DATA\r", b"\nx\r", b"\r\n"]);
        assert_eq!(lines, vec!["DATA", "x\r"]);
    }

    #[test]
    fn test_unconsumed_lines_survive_next_feed() {
        let mut buffer = LineBuffer::new();
        let first = buffer.feed(b"one\ntwo\n").next();
        assert_eq!(first.as_deref(), Some("one"));

        let rest: Vec<String> = buffer.feed(b"three\n").collect();
        assert_eq!(rest, vec!["two", "three"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let lines = collect_chunks(&[b"caf\xff\r\n"]);
        assert_eq!(lines, vec!["caf\u{fffd}"]);
    }

    #[test]
    fn test_unbounded_line_is_buffered() {
        // No length limit: a long unterminated line simply accumulates.
        let mut buffer = LineBuffer::new();
        let chunk = vec![b'a'; 64 * 1024];
        for _ in 0..16 {
            assert_eq!(buffer.feed(&chunk).count(), 0);
        }
        assert_eq!(buffer.pending(), 16 * 64 * 1024);

        let lines: Vec<String> = buffer.feed(b"\r\n").collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 16 * 64 * 1024);
    }
}
