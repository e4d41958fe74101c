//! Byte-exact line reading.
//!
//! The annotated output must reproduce every input line unchanged, so lines
//! are read as bytes and keep their own terminator (`\n`, `\r\n`, or none on
//! an unterminated final line).

use std::io::{self, BufRead};

/// One input line, split into content and terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// 1-based line number
    pub number: usize,
    pub content: Vec<u8>,
    pub terminator: &'static [u8],
}

impl RawLine {
    /// Content as text, if it is valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Iterator over the raw lines of a reader
pub struct LineReader<R> {
    reader: R,
    number: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            number: 0,
        }
    }

    /// Read the next line; `Ok(None)` at end of input
    pub fn read_line(&mut self) -> io::Result<Option<RawLine>> {
        let mut content = Vec::new();
        if self.reader.read_until(b'\n', &mut content)? == 0 {
            return Ok(None);
        }
        self.number += 1;

        let terminator: &'static [u8] = if content.ends_with(b"\r\n") {
            content.truncate(content.len() - 2);
            b"\r\n"
        } else if content.ends_with(b"\n") {
            content.truncate(content.len() - 1);
            b"\n"
        } else {
            b""
        };

        Ok(Some(RawLine {
            number: self.number,
            content,
            terminator,
        }))
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = io::Result<RawLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_line().transpose()
    }
}
