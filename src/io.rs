//! The I/O capability (spec §6.2): the host surface the core calls into.
//! Required operations must be implemented; optional ones may be no-ops
//! that still advance the PC and produce the spec-mandated store/branch
//! result, detected here via `supports_*` queries.
//!
//! Full terminal rendering (color, fonts, windows) is an external
//! collaborator out of this crate's scope (spec §1); this module defines
//! only the trait boundary plus two lightweight implementations used by
//! tests and the CLI binary.

use std::fmt;

#[derive(Debug, Clone)]
pub struct LineInput {
    pub text: String,
    pub terminator: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome<T> {
    Ready(T),
    Pending,
}

#[derive(Debug, Clone)]
pub struct IoError(pub String);

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I/O error: {}", self.0)
    }
}
impl std::error::Error for IoError {}

/// The host collaborator. `readLine`/`readChar`/`save`/`restore` may
/// suspend (return `InputOutcome::Pending`); every other operation is
/// synchronous from the VM's point of view.
pub trait ZMachineIo {
    fn print(&mut self, text: &str) -> Result<(), IoError>;
    fn new_line(&mut self) -> Result<(), IoError>;

    /// Request a line of input up to `max_len` characters. The VM polls
    /// this each dispatch-loop iteration while `waiting_for_input`; a
    /// `Pending` result leaves the VM waiting with no further output.
    fn read_line(&mut self, max_len: usize) -> Result<InputOutcome<LineInput>, IoError>;

    fn read_char(&mut self, timeout_tenths: u16) -> Result<InputOutcome<u16>, IoError>;

    fn quit(&mut self) -> Result<(), IoError>;
    fn restart(&mut self) -> Result<(), IoError>;

    // --- Optional operations -------------------------------------------------
    // Default implementations are no-ops; `supports_*` lets the executor
    // decide whether an opcode should still try to use them.

    fn supports_save(&self) -> bool {
        false
    }
    fn save(&mut self, _bytes: &[u8]) -> Result<InputOutcome<bool>, IoError> {
        Ok(InputOutcome::Ready(false))
    }

    fn supports_restore(&self) -> bool {
        false
    }
    fn restore(&mut self) -> Result<InputOutcome<Option<Vec<u8>>>, IoError> {
        Ok(InputOutcome::Ready(None))
    }

    fn split_window(&mut self, _lines: u16) -> Result<(), IoError> {
        Ok(())
    }
    fn set_window(&mut self, _window: u8) -> Result<(), IoError> {
        Ok(())
    }
    fn erase_window(&mut self, _window: i16) -> Result<(), IoError> {
        Ok(())
    }
    fn set_cursor(&mut self, _line: u16, _column: u16) -> Result<(), IoError> {
        Ok(())
    }
    fn get_cursor(&mut self) -> Result<(u16, u16), IoError> {
        Ok((1, 1))
    }
    fn erase_line(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    fn set_text_style(&mut self, _style: u16) -> Result<(), IoError> {
        Ok(())
    }
    fn set_buffer_mode(&mut self, _buffered: bool) -> Result<(), IoError> {
        Ok(())
    }
    fn set_foreground_colour(&mut self, _colour: u16) -> Result<(), IoError> {
        Ok(())
    }
    fn set_background_colour(&mut self, _colour: u16) -> Result<(), IoError> {
        Ok(())
    }
    fn set_true_colour(&mut self, _foreground: u16, _background: u16) -> Result<(), IoError> {
        Ok(())
    }

    fn sound_effect(&mut self, _number: u16, _effect: u16) -> Result<(), IoError> {
        Ok(())
    }
    fn show_status_line(&mut self, _location: &str, _score: i16, _moves: u16) -> Result<(), IoError> {
        Ok(())
    }
    fn set_output_stream(&mut self, _stream: i16, _table_addr: Option<u16>) -> Result<(), IoError> {
        Ok(())
    }
    fn set_input_stream(&mut self, _stream: u16) -> Result<(), IoError> {
        Ok(())
    }
}

/// Headless implementation: captures output, never produces real input.
/// Used for unit/integration tests driving the executor without a terminal.
#[derive(Default)]
pub struct HeadlessIo {
    pub output: String,
    pub pending_line: Option<String>,
    pub pending_char: Option<u16>,
}

impl HeadlessIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_line(&mut self, line: impl Into<String>) {
        self.pending_line = Some(line.into());
    }

    pub fn queue_char(&mut self, ch: u16) {
        self.pending_char = Some(ch);
    }
}

impl ZMachineIo for HeadlessIo {
    fn print(&mut self, text: &str) -> Result<(), IoError> {
        self.output.push_str(text);
        Ok(())
    }

    fn new_line(&mut self) -> Result<(), IoError> {
        self.output.push('\n');
        Ok(())
    }

    fn read_line(&mut self, max_len: usize) -> Result<InputOutcome<LineInput>, IoError> {
        match self.pending_line.take() {
            Some(mut line) => {
                line.truncate(max_len);
                Ok(InputOutcome::Ready(LineInput {
                    text: line,
                    terminator: Some(b'\r'),
                }))
            }
            None => Ok(InputOutcome::Pending),
        }
    }

    fn read_char(&mut self, _timeout_tenths: u16) -> Result<InputOutcome<u16>, IoError> {
        match self.pending_char.take() {
            Some(ch) => Ok(InputOutcome::Ready(ch)),
            None => Ok(InputOutcome::Pending),
        }
    }

    fn quit(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    fn restart(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}

/// Logs every call through the `log` facade at `info`/`debug` level;
/// suitable for the CLI binary's `--trace` mode and for smoke-testing the
/// dispatch loop end to end without a terminal dependency.
#[derive(Default)]
pub struct LoggingIo {
    headless: HeadlessIo,
}

impl LoggingIo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ZMachineIo for LoggingIo {
    fn print(&mut self, text: &str) -> Result<(), IoError> {
        log::info!("print: {text:?}");
        self.headless.print(text)
    }

    fn new_line(&mut self) -> Result<(), IoError> {
        log::debug!("new_line");
        self.headless.new_line()
    }

    fn read_line(&mut self, max_len: usize) -> Result<InputOutcome<LineInput>, IoError> {
        self.headless.read_line(max_len)
    }

    fn read_char(&mut self, timeout_tenths: u16) -> Result<InputOutcome<u16>, IoError> {
        self.headless.read_char(timeout_tenths)
    }

    fn quit(&mut self) -> Result<(), IoError> {
        log::info!("quit");
        Ok(())
    }

    fn restart(&mut self) -> Result<(), IoError> {
        log::info!("restart");
        Ok(())
    }
}
