//! Incremental newline framer for the board's text link.
//!
//! The UART hands us arbitrary chunks; the board emits `\n`-terminated lines.
//! [`LineAssembler`] accumulates chunks and yields whole lines when available. A
//! line that grows past [`MAX_LINE_LEN`] without a terminator is cut and yielded
//! as-is so a babbling device cannot grow the buffer without bound.
use bytes::{Buf, BytesMut};

/// Upper bound for a single line (token responses are the largest messages).
pub const MAX_LINE_LEN: usize = 4 * 1024;

#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: BytesMut,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(512),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes buffered but not yet returned.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Next complete line, terminator included. Invalid UTF-8 is replaced.
    pub fn next_line(&mut self) -> Option<String> {
        if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            return Some(String::from_utf8_lossy(&line).into_owned());
        }
        if self.buf.len() >= MAX_LINE_LEN {
            let line = self.buf.split_to(MAX_LINE_LEN);
            return Some(String::from_utf8_lossy(&line).into_owned());
        }
        None
    }

    /// Drain whatever is buffered, terminated or not.
    pub fn take_partial(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(self.buf.chunk()).into_owned();
        self.buf.clear();
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_lines_across_chunks() {
        let mut lines = LineAssembler::new();
        lines.push(b"ESP:> $_SENS");
        assert_eq!(lines.next_line(), None);
        lines.push(b"_4_open_1_*\r\nnext");
        assert_eq!(lines.next_line().as_deref(), Some("ESP:> $_SENS_4_open_1_*\r\n"));
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.take_partial().as_deref(), Some("next"));
        assert!(lines.is_empty());
    }

    #[test]
    fn oversize_line_is_cut() {
        let mut lines = LineAssembler::new();
        lines.push(&vec![b'x'; MAX_LINE_LEN + 10]);
        assert_eq!(lines.next_line().map(|l| l.len()), Some(MAX_LINE_LEN));
        assert_eq!(lines.len(), 10);
    }
}
