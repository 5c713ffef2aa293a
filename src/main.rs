//! Minimal CLI binary: loads a story file and drives the dispatch loop
//! against a terminal-logging I/O implementation. The terminal/transcript
//! front-end proper is out of scope for this crate (spec §1); this binary
//! exists to prove the library runs a story end to end, not to be a
//! polished player.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use zvm::config::InterpreterConfig;
use zvm::io::{HeadlessIo, InputOutcome, IoError, LineInput, LoggingIo, ZMachineIo};
use zvm::vm::RunState;
use zvm::VM;

/// Wraps `LoggingIo` with real stdin line reads, so the CLI binary can
/// actually be played interactively rather than only smoke-tested.
struct TerminalIo {
    inner: LoggingIo,
    trace: bool,
}

impl TerminalIo {
    fn new(trace: bool) -> Self {
        TerminalIo {
            inner: LoggingIo::new(),
            trace,
        }
    }
}

impl ZMachineIo for TerminalIo {
    fn print(&mut self, text: &str) -> Result<(), IoError> {
        print!("{text}");
        io::stdout().flush().ok();
        self.inner.print(text)
    }

    fn new_line(&mut self) -> Result<(), IoError> {
        println!();
        self.inner.new_line()
    }

    fn read_line(&mut self, max_len: usize) -> Result<InputOutcome<LineInput>, IoError> {
        let mut line = String::new();
        io::stdin()
            .read_line(&mut line)
            .map_err(|e| IoError(e.to_string()))?;
        let trimmed = line.trim_end_matches(['\n', '\r']);
        let mut input = HeadlessIo::new();
        input.queue_line(trimmed);
        let outcome = input.read_line(max_len)?;
        if self.trace {
            log::info!("input line: {trimmed:?}");
        }
        Ok(outcome)
    }

    fn read_char(&mut self, timeout_tenths: u16) -> Result<InputOutcome<u16>, IoError> {
        self.inner.read_char(timeout_tenths)
    }

    fn quit(&mut self) -> Result<(), IoError> {
        self.inner.quit()
    }

    fn restart(&mut self) -> Result<(), IoError> {
        self.inner.restart()
    }
}

fn run(path: &str, config: InterpreterConfig, trace: bool) -> Result<(), zvm::ZMachineError> {
    let story = fs::read(path).map_err(|e| {
        zvm::ZMachineError::SaveFault(format!("couldn't read story file {path}: {e}"))
    })?;

    let io = TerminalIo::new(trace);
    let mut vm = VM::new(story, Box::new(io))?;
    vm.header
        .set_interpreter_identity(&mut vm.memory, config.interpreter_number, config.interpreter_version)?;
    vm.header
        .set_screen_size(&mut vm.memory, config.screen.width_chars, config.screen.height_chars)?;
    if let Some(seed) = config.random.predictable_seed {
        vm.rand.reseed_predictable(seed);
    }

    loop {
        if trace {
            if let Ok(instr) =
                zvm::instruction::Instruction::decode(&vm.memory, vm.pc as usize, vm.header.version, &vm.text)
            {
                log::debug!("{instr}");
            }
        }
        match vm.step()? {
            RunState::Running => continue,
            RunState::Quit => return Ok(()),
            RunState::WaitingForLine | RunState::WaitingForChar => continue,
            RunState::WaitingForSave | RunState::WaitingForRestore => {
                log::warn!("save/restore requested but this CLI binary has no persistent storage");
                return Ok(());
            }
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let trace = args.iter().any(|a| a == "--trace");
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1));
    let story_path = args.iter().skip(1).find(|a| !a.starts_with("--"));

    let Some(story_path) = story_path else {
        eprintln!("usage: zvm [--trace] [--config FILE] STORY_FILE");
        return ExitCode::FAILURE;
    };

    let config = match config_path {
        Some(path) => match fs::read_to_string(path).ok().and_then(|s| InterpreterConfig::from_toml_str(&s).ok()) {
            Some(c) => c,
            None => {
                eprintln!("warning: couldn't load config from {path}, using defaults");
                InterpreterConfig::default()
            }
        },
        None => InterpreterConfig::default(),
    };

    match run(story_path, config, trace) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("zvm: {e}");
            ExitCode::FAILURE
        }
    }
}
