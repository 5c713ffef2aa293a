//! Input opcodes (`sread`/`aread`/`read_char`), persistent-state opcodes
//! (`save`/`restore`/`save_undo`/`restore_undo`), and the screen/style/sound
//! opcodes that simply forward to the I/O capability (spec §4.10, §6.2).

use crate::error::ZMachineError;
use crate::instruction::Instruction;
use crate::io::InputOutcome;
use crate::vm::{ExecutionResult, UndoSnapshot, VM};
use log::{debug, info};

impl VM {
    pub(crate) fn execute_io_op(
        &mut self,
        instr: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, ZMachineError> {
        match instr.name {
            "sread" => self.do_sread(instr, operands, false),
            "aread" => self.do_sread(instr, operands, true),
            "read_char" => self.do_read_char(instr, operands),

            "save" => self.do_save(instr),
            "restore" => self.do_restore(instr),
            "save_undo" => self.do_save_undo(instr),
            "restore_undo" => self.do_restore_undo(instr),

            "split_window" => {
                self.io
                    .split_window(operands[0])
                    .map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "set_window" => {
                self.io.set_window(operands[0] as u8).map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "erase_window" => {
                self.io.erase_window(operands[0] as i16).map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "erase_line" => {
                self.io.erase_line().map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "set_cursor" => {
                self.io
                    .set_cursor(operands[0], operands[1])
                    .map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "get_cursor" => {
                let (line, column) = self.io.get_cursor().map_err(io_fault)?;
                let array_addr = operands[0] as usize;
                self.memory.write_word(array_addr, line)?;
                self.memory.write_word(array_addr + 2, column)?;
                Ok(ExecutionResult::Continue)
            }
            "set_text_style" => {
                self.io.set_text_style(operands[0]).map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "set_buffer_mode" => {
                self.io.set_buffer_mode(operands[0] != 0).map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "output_stream" => {
                let stream = operands[0] as i16;
                let table = if stream == 3 { Some(operands[1]) } else { None };
                self.set_output_stream(stream, table)?;
                self.io.set_output_stream(stream, table).map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "input_stream" => {
                self.io.set_input_stream(operands[0]).map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "sound_effect" => {
                let effect = operands.get(1).copied().unwrap_or(0);
                self.io.sound_effect(operands[0], effect).map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "set_colour" => {
                self.io.set_foreground_colour(operands[0]).map_err(io_fault)?;
                self.io.set_background_colour(operands[1]).map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "set_true_colour" => {
                self.io
                    .set_true_colour(operands[0], operands[1])
                    .map_err(io_fault)?;
                Ok(ExecutionResult::Continue)
            }
            "set_font" => {
                // No font beyond the default fixed/proportional faces is
                // modeled; report success (font 1, the default) regardless.
                self.store_result(instr, 1)?;
                Ok(ExecutionResult::Continue)
            }
            other => Err(ZMachineError::OpcodeFault(format!("unhandled io opcode {other}"))),
        }
    }

    /// `sread` (V1-4) / `aread` (V5+): request a line from the host, write
    /// it into the text buffer, tokenize into the parse buffer if supplied,
    /// and for `aread` store the terminating character.
    fn do_sread(
        &mut self,
        instr: &Instruction,
        operands: &[u16],
        is_aread: bool,
    ) -> Result<ExecutionResult, ZMachineError> {
        // Byte 0 of the text buffer holds its capacity in both layouts.
        let max_len = self.memory.read_byte(operands[0] as usize)? as usize;

        match self.io.read_line(max_len).map_err(io_fault)? {
            InputOutcome::Pending => Ok(ExecutionResult::WaitingForLine),
            InputOutcome::Ready(line) => {
                let text_buffer = operands[0] as usize;
                let lowered = line.text.to_lowercase();
                self.write_text_buffer(text_buffer, &lowered, max_len)?;

                if let Some(&parse_buffer) = operands.get(1).filter(|&&a| a != 0) {
                    if let Some(dict) = &self.dictionary {
                        let tokenizer = crate::dictionary::Tokenizer::new(dict, &self.text);
                        tokenizer.tokenize_into_memory(
                            &mut self.memory,
                            text_buffer,
                            parse_buffer as usize,
                            self.header.version,
                            false,
                        )?;
                    }
                }

                if is_aread {
                    let terminator = line.terminator.unwrap_or(13) as u16;
                    self.store_result(instr, terminator)?;
                }
                debug!("sread/aread: {lowered:?}");
                Ok(ExecutionResult::Continue)
            }
        }
    }

    fn write_text_buffer(&mut self, addr: usize, text: &str, max_len: usize) -> Result<(), ZMachineError> {
        let bytes: Vec<u8> = text.bytes().take(max_len).collect();
        if self.header.version >= 5 {
            self.memory.write_byte(addr + 1, bytes.len() as u8)?;
            for (i, b) in bytes.iter().enumerate() {
                self.memory.write_byte(addr + 2 + i, *b)?;
            }
        } else {
            for (i, b) in bytes.iter().enumerate() {
                self.memory.write_byte(addr + 1 + i, *b)?;
            }
            self.memory.write_byte(addr + 1 + bytes.len(), 0)?;
        }
        Ok(())
    }

    fn do_read_char(&mut self, instr: &Instruction, operands: &[u16]) -> Result<ExecutionResult, ZMachineError> {
        let timeout = operands.get(1).copied().unwrap_or(0);
        match self.io.read_char(timeout).map_err(io_fault)? {
            InputOutcome::Pending => Ok(ExecutionResult::WaitingForChar),
            InputOutcome::Ready(code) => {
                self.store_result(instr, code)?;
                Ok(ExecutionResult::Continue)
            }
        }
    }

    /// `save`: build a Quetzal image for the state once this instruction
    /// has finished (the caller resumes just past it), and hand the bytes to
    /// the host.
    fn do_save(&mut self, instr: &Instruction) -> Result<ExecutionResult, ZMachineError> {
        let resume_pc = instr.address + instr.length as u32;
        let bytes = crate::quetzal::save_to_bytes(&self.header, &self.memory, &self.stack, resume_pc);

        if !self.io.supports_save() {
            return self.report_save_outcome(instr, false);
        }
        match self.io.save(&bytes).map_err(io_fault)? {
            InputOutcome::Pending => Ok(ExecutionResult::WaitingForSave),
            InputOutcome::Ready(ok) => self.report_save_outcome(instr, ok),
        }
    }

    fn report_save_outcome(&mut self, instr: &Instruction, ok: bool) -> Result<ExecutionResult, ZMachineError> {
        if instr.store_var.is_some() {
            self.store_result(instr, ok as u16)?;
            Ok(ExecutionResult::Continue)
        } else {
            self.evaluate_branch(instr, ok)
        }
    }

    /// `restore`: parse the host-supplied bytes and, on success, overwrite
    /// dynamic memory and the call stack and jump to the saved PC. Per
    /// Quetzal convention (spec §4.10), the variable the original `save`
    /// stored into sits in the byte immediately before the resume PC, so a
    /// successful restore writes 2 there directly rather than through the
    /// *current* instruction's own store/branch machinery.
    fn do_restore(&mut self, instr: &Instruction) -> Result<ExecutionResult, ZMachineError> {
        if !self.io.supports_restore() {
            return self.report_restore_failure(instr);
        }
        match self.io.restore().map_err(io_fault)? {
            InputOutcome::Pending => Ok(ExecutionResult::WaitingForRestore),
            InputOutcome::Ready(None) => self.report_restore_failure(instr),
            InputOutcome::Ready(Some(bytes)) => {
                match crate::quetzal::restore_from_bytes(&bytes, &self.header, &self.memory) {
                    Ok(restored) => {
                        self.memory.set_dynamic_memory(&restored.memory)?;
                        self.stack = restored.stack;
                        if self.header.version >= 4 && restored.pc > 0 {
                            let store_byte_addr = (restored.pc - 1) as usize;
                            let store_var = self.memory.read_byte(store_byte_addr)?;
                            self.variables
                                .write(&mut self.stack, &mut self.memory, store_var, 2)?;
                        }
                        info!("restore succeeded, resuming at {:#06x}", restored.pc);
                        Ok(ExecutionResult::Jumped(restored.pc))
                    }
                    Err(e) => {
                        debug!("restore failed to parse: {e}");
                        self.report_restore_failure(instr)
                    }
                }
            }
        }
    }

    fn report_restore_failure(&mut self, instr: &Instruction) -> Result<ExecutionResult, ZMachineError> {
        if instr.store_var.is_some() {
            self.store_result(instr, 0)?;
            Ok(ExecutionResult::Continue)
        } else {
            self.evaluate_branch(instr, false)
        }
    }

    /// `save_undo` (V5+): snapshot dynamic memory and the stack in memory,
    /// keyed to resume right after this instruction.
    fn do_save_undo(&mut self, instr: &Instruction) -> Result<ExecutionResult, ZMachineError> {
        let resume_pc = instr.address + instr.length as u32;
        self.undo_stack.push(UndoSnapshot {
            memory: self.memory.dynamic_slice().to_vec(),
            stack: self.stack.snapshot(),
            pc: resume_pc,
            store_var: instr.store_var,
        });
        self.store_result(instr, 1)?;
        Ok(ExecutionResult::Continue)
    }

    /// `restore_undo` (V5+): reinstate the most recent `save_undo` snapshot.
    /// The success code (2) is stored into the *snapshot's* store variable
    /// (the original `save_undo` instruction's), not this instruction's.
    fn do_restore_undo(&mut self, instr: &Instruction) -> Result<ExecutionResult, ZMachineError> {
        match self.undo_stack.pop() {
            Some(snapshot) => {
                self.memory.set_dynamic_memory(&snapshot.memory)?;
                self.stack.restore(snapshot.stack);
                if let Some(v) = snapshot.store_var {
                    self.variables.write(&mut self.stack, &mut self.memory, v, 2)?;
                }
                Ok(ExecutionResult::Jumped(snapshot.pc))
            }
            None => {
                self.store_result(instr, 0)?;
                Ok(ExecutionResult::Continue)
            }
        }
    }
}

fn io_fault(e: crate::io::IoError) -> ZMachineError {
    ZMachineError::OpcodeFault(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::HeadlessIo;
    use crate::vm::VM;

    fn minimal_story(version: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; 0x200];
        bytes[0] = version;
        bytes[0x0E] = 0x01; // static base 0x100
        bytes[0x0F] = 0x00;
        bytes[0x06] = 0x01; // initial pc
        bytes[0x07] = 0x00;
        bytes[0x12..0x18].copy_from_slice(b"000000");
        bytes
    }

    #[test]
    fn sread_v3_writes_null_terminated_buffer() {
        let story = minimal_story(3);
        let mut io = HeadlessIo::new();
        io.queue_line("take lamp");
        let mut vm = VM::new(story, Box::new(io)).unwrap();

        let text_buffer = 0x50usize;
        vm.memory.write_byte(text_buffer, 20).unwrap();

        let instr = Instruction {
            address: 0,
            length: 1,
            opcode: 4,
            name: "sread",
            form: crate::instruction::Form::Variable,
            operand_count: crate::instruction::OperandCount::Var,
            operands: vec![],
            store_var: None,
            branch: None,
            text: None,
        };
        let result = vm.do_sread(&instr, &[text_buffer as u16, 0], false).unwrap();
        assert!(matches!(result, ExecutionResult::Continue));
        assert_eq!(vm.memory.read_byte(text_buffer + 1).unwrap(), b't');
        assert_eq!(vm.memory.read_byte(text_buffer + 10).unwrap(), 0);
    }

    #[test]
    fn save_undo_then_restore_undo_round_trips_memory() {
        let story = minimal_story(5);
        let io = HeadlessIo::new();
        let mut vm = VM::new(story, Box::new(io)).unwrap();
        vm.memory.write_byte(0x10, 0xAA).unwrap();

        let save_instr = Instruction {
            address: 0x10,
            length: 2,
            opcode: 9,
            name: "save_undo",
            form: crate::instruction::Form::Extended,
            operand_count: crate::instruction::OperandCount::Ext,
            operands: vec![],
            store_var: Some(16),
            branch: None,
            text: None,
        };
        vm.do_save_undo(&save_instr).unwrap();
        vm.memory.write_byte(0x10, 0xBB).unwrap();

        let restore_instr = Instruction {
            address: 0x20,
            length: 2,
            opcode: 10,
            name: "restore_undo",
            form: crate::instruction::Form::Extended,
            operand_count: crate::instruction::OperandCount::Ext,
            operands: vec![],
            store_var: Some(17),
            branch: None,
            text: None,
        };
        let result = vm.do_restore_undo(&restore_instr).unwrap();
        assert!(matches!(result, ExecutionResult::Jumped(_)));
        assert_eq!(vm.memory.read_byte(0x10).unwrap(), 0xAA);
    }
}
