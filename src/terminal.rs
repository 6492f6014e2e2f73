//! Line-oriented terminal collaborator.

use std::io::{self, BufRead, Write};

use crate::error::{CodeloopError, Result};

/// Where the agent reads human input and writes status.
pub trait Terminal {
    /// Show `prompt` and read one line, trimmed. `None` at end of input.
    fn prompt(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Write one message followed by a newline.
    fn say(&mut self, message: &str) -> Result<()>;
}

/// stdin/stdout terminal.
#[derive(Debug, Default)]
pub struct StdTerminal;

impl StdTerminal {
    pub fn new() -> Self {
        Self
    }
}

impl Terminal for StdTerminal {
    fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{}", prompt).map_err(|e| CodeloopError::Terminal(e.to_string()))?;
        stdout.flush().map_err(|e| CodeloopError::Terminal(e.to_string()))?;
        drop(stdout);

        read_trimmed_line(&mut io::stdin().lock())
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(io::stdout(), "{}", message).map_err(|e| CodeloopError::Terminal(e.to_string()))
    }
}

fn read_trimmed_line(reader: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| CodeloopError::Terminal(e.to_string()))?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
