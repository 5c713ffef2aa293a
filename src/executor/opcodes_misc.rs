//! Control-flow and interpreter-identity opcodes that don't fit neatly into
//! the other families (spec §4.10).

use crate::error::ZMachineError;
use crate::instruction::Instruction;
use crate::vm::{ExecutionResult, VM};
use log::info;

impl VM {
    pub(crate) fn execute_misc_op(
        &mut self,
        instr: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, ZMachineError> {
        match instr.name {
            "jz" => self.evaluate_branch(instr, operands[0] == 0),
            "nop" => Ok(ExecutionResult::Continue),
            "verify" => {
                let ok = self.verify_checksum()?;
                self.evaluate_branch(instr, ok)
            }
            // This crate implements no copy-protection scheme, so piracy
            // checks always pass.
            "piracy" => self.evaluate_branch(instr, true),
            "show_status" => {
                let location_obj = self.variables.peek(&self.stack, &self.memory, 16)?;
                let score_or_hours = self.variables.peek(&self.stack, &self.memory, 17)? as i16;
                let moves_or_minutes = self.variables.peek(&self.stack, &self.memory, 18)?;
                let location = if location_obj != 0 {
                    let objects = self.object_table();
                    let (prop_table_addr, _) = objects.get_short_name_address(&self.memory, location_obj)?;
                    self.text.decode(&self.memory, prop_table_addr + 1)?.0
                } else {
                    String::new()
                };
                self.io
                    .show_status_line(&location, score_or_hours, moves_or_minutes)
                    .map_err(|e| ZMachineError::OpcodeFault(e.to_string()))?;
                Ok(ExecutionResult::Continue)
            }
            "quit" => {
                info!("quit opcode executed");
                self.io.quit().map_err(|e| ZMachineError::OpcodeFault(e.to_string()))?;
                Ok(ExecutionResult::Quit)
            }
            "restart" => {
                self.restart();
                self.io.restart().map_err(|e| ZMachineError::OpcodeFault(e.to_string()))?;
                Ok(ExecutionResult::Restarted)
            }
            other => Err(ZMachineError::OpcodeFault(format!("unhandled misc opcode {other}"))),
        }
    }

    /// Sums every byte from 0x40 to the header-declared file length as
    /// unsigned 8-bit values, truncated to 16 bits, and compares against the
    /// header checksum (spec §6.1, the `verify` opcode).
    fn verify_checksum(&self) -> Result<bool, ZMachineError> {
        let bytes = self.memory.original_bytes();
        let end = self.header.file_length.min(bytes.len());
        if end <= 0x40 {
            return Ok(false);
        }
        let sum: u32 = bytes[0x40..end].iter().map(|&b| b as u32).sum();
        Ok((sum & 0xFFFF) as u16 == self.header.checksum)
    }
}
