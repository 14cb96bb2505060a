//! Line-based interactive I/O.
//!
//! `Console` wraps any `BufRead` + `Write` pair so the client loop runs
//! the same against a terminal and against in-memory buffers in tests.

use std::io::{BufRead, Write};

use super::output;
use crate::errors::{KeeperError, Result};

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Read one line with surrounding whitespace trimmed.
    ///
    /// Returns `Ok(None)` once the input is exhausted.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Show `label` and read a required value.
    ///
    /// An empty line is `EmptyInput`; closed input ends the session with
    /// `Exit`.
    pub fn prompt(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        match self.read_line()? {
            None => Err(KeeperError::Exit),
            Some(line) if line.is_empty() => Err(KeeperError::EmptyInput),
            Some(line) => Ok(line),
        }
    }

    pub fn write_line(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    pub fn success(&mut self, msg: &str) -> Result<()> {
        self.write_line(&output::format_success(msg))
    }

    pub fn error(&mut self, msg: &str) -> Result<()> {
        self.write_line(&output::format_error(msg))
    }

    pub fn warning(&mut self, msg: &str) -> Result<()> {
        self.write_line(&output::format_warning(msg))
    }

    pub fn info(&mut self, msg: &str) -> Result<()> {
        self.write_line(&output::format_info(msg))
    }

    pub fn output(&self) -> &W {
        &self.output
    }
}
