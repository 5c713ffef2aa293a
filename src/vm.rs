//! The VM orchestrator: owns every subsystem and drives the fetch-decode-
//! execute loop (spec §4.10, §5).

use crate::dictionary::Dictionary;
use crate::error::ZMachineError;
use crate::header::Header;
use crate::instruction::Instruction;
use crate::io::ZMachineIo;
use crate::memory::Memory;
use crate::object::ObjectTable;
use crate::stack::{Stack, StackSnapshot};
use crate::text::{AlphabetTable, TextCodec};
use crate::variables::Variables;
use crate::zrand::ZRand;
use log::{debug, info};

/// One entry in the output-stream-3 redirection stack (spec §6.1): while
/// active, printed text is captured into a length-prefixed memory table
/// instead of reaching the screen.
pub struct MemoryRedirect {
    pub table_addr: usize,
    pub buffer: Vec<u8>,
}

/// Tracks which of the four text output streams are currently selected.
/// Streams 2 (transcript) and 4 (command echo) have no in-memory effect of
/// their own; this crate only tracks whether the host should be mirroring
/// output there (writing to an actual file is a host concern, spec §1).
#[derive(Default)]
pub struct OutputStreams {
    pub screen_enabled: bool,
    pub transcript_enabled: bool,
    pub command_echo_enabled: bool,
    pub memory_stack: Vec<MemoryRedirect>,
}

impl OutputStreams {
    fn new() -> Self {
        OutputStreams {
            screen_enabled: true,
            ..Default::default()
        }
    }
}

/// A single level of in-memory undo, captured by `save_undo` and consumed
/// by `restore_undo` (spec §4.10). `store_var` belongs to the *original*
/// `save_undo` instruction: a successful `restore_undo` resumes execution
/// right after that instruction, so it must write the success code into
/// that instruction's result slot, not its own.
pub struct UndoSnapshot {
    pub memory: Vec<u8>,
    pub stack: StackSnapshot,
    pub pc: u32,
    pub store_var: Option<u8>,
}

pub enum RunState {
    Running,
    WaitingForLine,
    WaitingForChar,
    WaitingForSave,
    WaitingForRestore,
    Quit,
}

/// Result of executing a single instruction: tells the dispatch loop
/// whether `pc` already points at the next instruction or must still
/// advance by the decoded instruction's length.
pub enum ExecutionResult {
    Continue,
    Jumped(u32),
    Quit,
    Restarted,
    WaitingForLine,
    WaitingForChar,
    WaitingForSave,
    WaitingForRestore,
}

pub struct VM {
    pub memory: Memory,
    pub header: Header,
    pub stack: Stack,
    pub variables: Variables,
    pub text: TextCodec,
    pub dictionary: Option<Dictionary>,
    pub rand: ZRand,
    pub pc: u32,
    pub streams: OutputStreams,
    pub io: Box<dyn ZMachineIo>,
    pub state: RunState,
    pub quit: bool,
    pub undo_stack: Vec<UndoSnapshot>,
}

impl VM {
    pub fn new(story: Vec<u8>, io: Box<dyn ZMachineIo>) -> Result<Self, ZMachineError> {
        let memory = Memory::new(story, 0);
        let header = Header::parse(&memory)?;
        let mut memory = memory;
        memory.set_static_base(header.base_static_mem as usize);

        let mut stack = Stack::new();
        stack.initialize();

        let variables = Variables::new(header.global_variables_addr as usize);
        let alphabets = AlphabetTable::default();
        let text = TextCodec::new(header.version, header.abbrev_table_addr as usize, alphabets);

        let dictionary = if header.dictionary_addr != 0 {
            Some(Dictionary::new(&memory, header.dictionary_addr as usize, header.version)?)
        } else {
            None
        };

        let pc = header.initial_pc as u32;

        info!(
            "loaded story file: version {}, release {}, serial {}",
            header.version, header.release, header.serial
        );

        Ok(VM {
            memory,
            header,
            stack,
            variables,
            text,
            dictionary,
            rand: ZRand::new_true_random(),
            pc,
            streams: OutputStreams::new(),
            io,
            state: RunState::Running,
            quit: false,
            undo_stack: Vec::new(),
        })
    }

    pub fn object_table(&self) -> ObjectTable {
        ObjectTable::new(self.header.object_table_addr as usize, self.header.version)
    }

    /// Resets dynamic memory, the call stack, and the PC as the `restart`
    /// opcode requires; screen state and output streams are left to the
    /// executor's `restart` handler to leave untouched or reset per host
    /// policy (spec §4.10 restart leaves the transcript bit alone).
    pub fn restart(&mut self) {
        debug!("restart: resetting dynamic memory, stack, and PC");
        self.memory.restart();
        self.stack.initialize();
        self.pc = self.header.initial_pc as u32;
    }

    /// Fetch, decode, and execute exactly one instruction. Returns the run
    /// state the caller should act on (continue looping, or stop to await
    /// real-world input).
    pub fn step(&mut self) -> Result<RunState, ZMachineError> {
        let instr = Instruction::decode(&self.memory, self.pc as usize, self.header.version, &self.text)?;
        let next_pc = instr.address + instr.length as u32;

        let operands = self.evaluate_operands(&instr)?;
        let result = self.dispatch(&instr, &operands)?;

        match result {
            ExecutionResult::Continue => {
                self.pc = next_pc;
                Ok(RunState::Running)
            }
            ExecutionResult::Jumped(target) => {
                self.pc = target;
                Ok(RunState::Running)
            }
            ExecutionResult::Quit => {
                self.quit = true;
                Ok(RunState::Quit)
            }
            ExecutionResult::Restarted => Ok(RunState::Running),
            // Leave `pc` at this instruction: the host has no input ready
            // yet, so the next `step()` must re-decode and retry the same
            // `sread`/`read_char` rather than skip past it.
            ExecutionResult::WaitingForLine => Ok(RunState::WaitingForLine),
            ExecutionResult::WaitingForChar => Ok(RunState::WaitingForChar),
            ExecutionResult::WaitingForSave => Ok(RunState::WaitingForSave),
            ExecutionResult::WaitingForRestore => Ok(RunState::WaitingForRestore),
        }
    }

    /// Runs until the story quits or the host I/O reports it has no more
    /// input ready (`InputOutcome::Pending` from a preceding `sread`/
    /// `read_char`, which this crate treats as "stop the loop here").
    pub fn run(&mut self) -> Result<(), ZMachineError> {
        loop {
            match self.step()? {
                RunState::Running => continue,
                RunState::Quit => return Ok(()),
                RunState::WaitingForLine
                | RunState::WaitingForChar
                | RunState::WaitingForSave
                | RunState::WaitingForRestore => return Ok(()),
            }
        }
    }

    /// Evaluates operands left to right, exactly once each (spec §4.10):
    /// variable-type operands numbered 0 pop the stack in program order.
    fn evaluate_operands(&mut self, instr: &Instruction) -> Result<Vec<u16>, ZMachineError> {
        let mut values = Vec::with_capacity(instr.operands.len());
        for operand in &instr.operands {
            use crate::instruction::OperandType;
            let value = match operand.op_type {
                OperandType::LargeConstant | OperandType::SmallConstant => operand.value,
                OperandType::Variable => {
                    self.variables.read(&mut self.stack, &self.memory, operand.value as u8)?
                }
                OperandType::Omitted => unreachable!("decoder never emits omitted operands"),
            };
            values.push(value);
        }
        Ok(values)
    }

    pub fn store_result(&mut self, instr: &Instruction, value: u16) -> Result<(), ZMachineError> {
        if let Some(v) = instr.store_var {
            self.variables.write(&mut self.stack, &mut self.memory, v, value)?;
        }
        Ok(())
    }

    /// Evaluates a branch given the instruction's test `condition`, taking
    /// the special return-0/return-1 offsets into account (spec §4.9).
    pub fn evaluate_branch(
        &mut self,
        instr: &Instruction,
        condition: bool,
    ) -> Result<ExecutionResult, ZMachineError> {
        let Some(branch) = &instr.branch else {
            return Ok(ExecutionResult::Continue);
        };
        if condition != branch.on_true {
            return Ok(ExecutionResult::Continue);
        }
        match branch.offset {
            0 => self.do_return(0),
            1 => self.do_return(1),
            offset => {
                let next = (instr.address + instr.length as u32) as i64;
                let target = next + offset as i64 - 2;
                Ok(ExecutionResult::Jumped(target as u32))
            }
        }
    }

    /// Calls the routine at packed address `packed`. Reading the local
    /// count/defaults header and copying supplied arguments over the
    /// defaults per spec §4.3; a call to address 0 is handled by the caller
    /// (it stores false and never reaches here).
    pub fn do_call(
        &mut self,
        packed: u16,
        args: &[u16],
        store_var: Option<u8>,
        return_pc: u32,
    ) -> Result<ExecutionResult, ZMachineError> {
        let routine_addr = self.header.unpack_address(packed, false) as usize;
        let local_count = self.memory.read_byte(routine_addr)?;
        if local_count as usize > crate::stack::MAX_LOCALS {
            return Err(ZMachineError::OpcodeFault(format!(
                "routine at {routine_addr:#06x} declares {local_count} locals"
            )));
        }

        // V1-4 store a default value per local right after the header byte;
        // V5+ locals always start at zero.
        let (defaults_bytes, body_addr) = if self.header.version <= 4 {
            (local_count as usize * 2, routine_addr + 1 + local_count as usize * 2)
        } else {
            (0, routine_addr + 1)
        };

        self.stack
            .push_frame(return_pc, store_var, local_count, args.len().min(7) as u8)?;

        for i in 0..local_count as usize {
            let default = if defaults_bytes > 0 {
                self.memory.read_word(routine_addr + 1 + i * 2)?
            } else {
                0
            };
            let value = args.get(i).copied().unwrap_or(default);
            self.stack.set_local(i as u8, value)?;
        }

        debug!("call -> routine at {routine_addr:#06x}, {local_count} locals, {} args", args.len());
        Ok(ExecutionResult::Jumped(body_addr as u32))
    }

    /// Pops the current frame and stores `value` into its caller's result
    /// slot (spec §4.3). Errors if called on the main frame.
    pub fn do_return(&mut self, value: u16) -> Result<ExecutionResult, ZMachineError> {
        let frame = self.stack.pop_frame()?;
        if let Some(v) = frame.store_var {
            self.variables.write(&mut self.stack, &mut self.memory, v, value)?;
        }
        Ok(ExecutionResult::Jumped(frame.return_pc))
    }

    /// `throw`: unwind to the frame at `depth` (as captured by `catch`) and
    /// return `value` from it, skipping every intervening frame's own
    /// store/branch semantics entirely.
    pub fn do_throw(&mut self, value: u16, depth: u16) -> Result<ExecutionResult, ZMachineError> {
        let frame = self.stack.unwind_to(depth as usize)?;
        if let Some(v) = frame.store_var {
            self.variables.write(&mut self.stack, &mut self.memory, v, value)?;
        }
        Ok(ExecutionResult::Jumped(frame.return_pc))
    }

    /// Writes `text` to whichever output streams are active: stream 3
    /// (memory redirection) takes priority and suppresses streams 1/2/4
    /// while any redirection is on the stack (spec §6.1).
    pub fn print_text(&mut self, text: &str) -> Result<(), ZMachineError> {
        if let Some(redirect) = self.streams.memory_stack.last_mut() {
            for ch in text.chars() {
                let code = crate::text::unicode_to_zscii(ch).unwrap_or(b'?' as u16);
                redirect.buffer.push(code as u8);
            }
            return Ok(());
        }
        if self.streams.screen_enabled {
            self.io
                .print(text)
                .map_err(|e| ZMachineError::OpcodeFault(e.to_string()))?;
        }
        Ok(())
    }

    pub fn print_newline(&mut self) -> Result<(), ZMachineError> {
        if let Some(redirect) = self.streams.memory_stack.last_mut() {
            redirect.buffer.push(13);
            return Ok(());
        }
        if self.streams.screen_enabled {
            self.io.new_line().map_err(|e| ZMachineError::OpcodeFault(e.to_string()))?;
        }
        Ok(())
    }

    /// `output_stream`: select (positive) or deselect (negative) a stream.
    /// Selecting stream 3 pushes a new redirection with its own buffer;
    /// deselecting it pops one and flushes the captured length + bytes into
    /// the target table (spec §6.1).
    pub fn set_output_stream(&mut self, stream: i16, table_addr: Option<u16>) -> Result<(), ZMachineError> {
        match stream {
            1 => self.streams.screen_enabled = true,
            -1 => self.streams.screen_enabled = false,
            2 => self.streams.transcript_enabled = true,
            -2 => self.streams.transcript_enabled = false,
            4 => self.streams.command_echo_enabled = true,
            -4 => self.streams.command_echo_enabled = false,
            3 => {
                let addr = table_addr.ok_or_else(|| {
                    ZMachineError::OpcodeFault("output_stream 3 requires a table address".to_string())
                })?;
                self.streams.memory_stack.push(MemoryRedirect {
                    table_addr: addr as usize,
                    buffer: Vec::new(),
                });
            }
            -3 => {
                let redirect = self.streams.memory_stack.pop().ok_or_else(|| {
                    ZMachineError::OpcodeFault("output_stream -3 with no active redirection".to_string())
                })?;
                self.memory.write_word(redirect.table_addr, redirect.buffer.len() as u16)?;
                for (i, byte) in redirect.buffer.iter().enumerate() {
                    self.memory.write_byte(redirect.table_addr + 2 + i, *byte)?;
                }
            }
            _ => {
                return Err(ZMachineError::OpcodeFault(format!(
                    "invalid output stream number {stream}"
                )))
            }
        }
        Ok(())
    }
}
