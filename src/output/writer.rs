//! Annotated trace and stack file sinks.
//!
//! Original line bytes are always written unchanged; generated text is only
//! ever added around them.

use crate::engine::annotation::{Annotation, Banner};
use crate::parser::{RawLine, RegisterWrite};
use crate::utils::config::{STACK_POINTER_ALIASES, STACK_POINTER_REGISTERS};
use std::io::{self, Write};

/// Writes input lines with their banners and inline comments
pub struct AnnotatedWriter<W: Write> {
    inner: W,
    padding: String,
    lines_written: u64,
}

impl<W: Write> AnnotatedWriter<W> {
    /// # Arguments
    /// * `inner` - Destination, usually a `BufWriter<File>`
    /// * `comment_padding` - Spaces between a line and its inline comment
    pub fn new(inner: W, comment_padding: usize) -> Self {
        Self {
            inner,
            padding: " ".repeat(comment_padding),
            lines_written: 0,
        }
    }

    /// Write one input line and everything generated for it
    ///
    /// **Public** - called once per input line, in order
    ///
    /// All banners form a single block framed by blank lines before the
    /// original line. Inline comments follow the original content on the
    /// same line, before its terminator.
    pub fn write_line(&mut self, raw: &RawLine, annotations: &[Annotation]) -> io::Result<()> {
        // Generated lines follow the input's own line ending
        let newline: &[u8] = if raw.terminator == b"\r\n" {
            b"\r\n"
        } else {
            b"\n"
        };

        let banners: Vec<&Banner> = annotations
            .iter()
            .filter_map(|a| match a {
                Annotation::Banner(banner) => Some(banner),
                Annotation::Inline(_) => None,
            })
            .collect();

        if !banners.is_empty() {
            self.write_generated(b"", newline)?;
            for banner in banners {
                for line in &banner.lines {
                    self.write_generated(line.as_bytes(), newline)?;
                }
            }
            self.write_generated(b"", newline)?;
        }

        self.inner.write_all(&raw.content)?;

        let mut first = true;
        for annotation in annotations {
            if let Annotation::Inline(comment) = annotation {
                if first {
                    self.inner.write_all(self.padding.as_bytes())?;
                    first = false;
                } else {
                    self.inner.write_all(b"  ")?;
                }
                write!(self.inner, "; {}", comment)?;
            }
        }

        self.inner.write_all(raw.terminator)?;
        if !raw.terminator.is_empty() {
            self.lines_written += 1;
        }
        Ok(())
    }

    fn write_generated(&mut self, line: &[u8], newline: &[u8]) -> io::Result<()> {
        self.inner.write_all(line)?;
        self.inner.write_all(newline)?;
        self.lines_written += 1;
        Ok(())
    }

    /// Terminated lines written so far, generated lines included
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Whether a register write updates the stack pointer
pub fn is_stack_pointer_write(register: &RegisterWrite) -> bool {
    STACK_POINTER_REGISTERS
        .iter()
        .any(|r| register.register.eq_ignore_ascii_case(r))
        || register.alias.as_deref().is_some_and(|alias| {
            STACK_POINTER_ALIASES
                .iter()
                .any(|a| alias.eq_ignore_ascii_case(a))
        })
}

/// Side file listing every stack pointer update with the active function
pub struct StackFileWriter<W: Write> {
    inner: W,
    entries: u64,
}

impl<W: Write> StackFileWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, entries: 0 }
    }

    /// Copy a stack pointer write, tagged with the function it happened in
    pub fn record(&mut self, raw: &RawLine, function: Option<&str>) -> io::Result<()> {
        self.inner.write_all(&raw.content)?;
        if let Some(function) = function {
            write!(self.inner, "    ; {}", function)?;
        }
        let terminator: &[u8] = if raw.terminator.is_empty() {
            b"\n"
        } else {
            raw.terminator
        };
        self.inner.write_all(terminator)?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
