//! Scripted serial link for tests and offline runs.
use std::collections::VecDeque;
use std::io;

use super::SerialLink;

/// Minimal fake serial link: reads come from a script, writes are recorded.
///
/// The script models what the board will send, so [`SerialLink::reset_buffers`]
/// does not discard it; resets are only counted.
#[derive(Debug, Default)]
pub struct FakeSerial {
    script: VecDeque<Result<String, io::ErrorKind>>,
    writes: Vec<Vec<u8>>,
    resets: usize,
}

impl FakeSerial {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: lines.into_iter().map(|l| Ok(l.into())).collect(),
            ..Self::default()
        }
    }

    /// Queue a line the board will send next.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.script.push_back(Ok(line.into()));
    }

    /// Queue a read failure.
    pub fn push_error(&mut self, kind: io::ErrorKind) {
        self.script.push_back(Err(kind));
    }

    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Writes decoded as UTF-8 (lossy), for assertions.
    pub fn written_text(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl SerialLink for FakeSerial {
    fn read_line(&mut self) -> io::Result<String> {
        match self.script.pop_front() {
            Some(Ok(line)) => Ok(line),
            Some(Err(kind)) => Err(io::Error::new(kind, "scripted serial error")),
            // Nothing scripted: behave like a read timeout with no data
            None => Ok(String::new()),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writes.push(bytes.to_vec());
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(match self.script.front() {
            Some(Ok(line)) => line.len().max(1),
            Some(Err(_)) => 1,
            None => 0,
        })
    }

    fn reset_buffers(&mut self) -> io::Result<()> {
        self.resets += 1;
        Ok(())
    }
}
