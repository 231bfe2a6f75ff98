//! Host stream interface
//!
//! The interpreter talks to the outside world only through an
//! [`InputSource`] (read by `INPUT`) and an [`OutputSink`] (written by `PRINT`
//! and `LIST`). Adapters for any `BufRead`/`Write` pair and in-memory
//! implementations for tests and embedding live here.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Where `INPUT` reads from
pub trait InputSource {
    /// Next line without its line terminator, or `None` once the stream ends
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Where `PRINT` and `LIST` write to
pub trait OutputSink {
    /// Write one line; the sink adds the line terminator
    fn write_line(&mut self, text: &str) -> io::Result<()>;
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        (**self).read_line()
    }
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        (**self).write_line(text)
    }
}

/// Line-oriented input over any buffered reader
#[derive(Debug)]
pub struct LineReader<R> {
    reader: R,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> InputSource for LineReader<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

/// Line-oriented output over any writer, flushed after every line
#[derive(Debug)]
pub struct LineWriter<W> {
    writer: W,
}

impl<W: Write> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for LineWriter<W> {
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.writer, "{text}")?;
        self.writer.flush()
    }
}

/// Pre-recorded input lines
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Lines not yet consumed
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl InputSource for ScriptedInput {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// Collects written lines in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedOutput {
    lines: Vec<String>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Everything written, one line per entry, newline terminated
    pub fn text(&self) -> String {
        self.lines.iter().map(|l| format!("{l}\n")).collect()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl OutputSink for CapturedOutput {
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.lines.push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_line_reader_strips_terminators() {
        let mut input = LineReader::new(Cursor::new("first\r\nsecond\nlast"));
        assert_eq!(input.read_line().unwrap(), Some("first".to_string()));
        assert_eq!(input.read_line().unwrap(), Some("second".to_string()));
        assert_eq!(input.read_line().unwrap(), Some("last".to_string()));
        assert_eq!(input.read_line().unwrap(), None);
    }

    #[test]
    fn test_line_writer_terminates_lines() {
        let mut output = LineWriter::new(Vec::new());
        output.write_line("hello").unwrap();
        output.write_line("").unwrap();
        assert_eq!(output.into_inner(), b"hello\n\n");
    }

    #[test]
    fn test_scripted_input() {
        let mut input = ScriptedInput::new(["1", "two"]);
        assert_eq!(input.remaining(), 2);
        assert_eq!(input.read_line().unwrap(), Some("1".to_string()));
        assert_eq!(input.read_line().unwrap(), Some("two".to_string()));
        assert_eq!(input.read_line().unwrap(), None);
    }

    #[test]
    fn test_captured_output() {
        let mut output = CapturedOutput::new();
        output.write_line("a").unwrap();
        output.write_line("b").unwrap();
        assert_eq!(output.lines(), &["a".to_string(), "b".to_string()]);
        assert_eq!(output.text(), "a\nb\n");
        output.clear();
        assert!(output.lines().is_empty());
    }

    #[test]
    fn test_mutable_references_are_collaborators() {
        let mut output = CapturedOutput::new();
        {
            let mut sink: &mut CapturedOutput = &mut output;
            OutputSink::write_line(&mut sink, "through a reference").unwrap();
        }
        assert_eq!(output.lines().len(), 1);
    }
}
