//! Call stack, routine call/return, and catch/throw opcodes (spec §4.3,
//! §4.10).

use crate::error::ZMachineError;
use crate::instruction::Instruction;
use crate::vm::{ExecutionResult, VM};
use log::debug;

impl VM {
    pub(crate) fn execute_stack_op(
        &mut self,
        instr: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, ZMachineError> {
        let return_pc = instr.address + instr.length as u32;
        match instr.name {
            "call" | "call_vs2" => {
                let packed = operands[0];
                if packed == 0 {
                    self.store_result(instr, 0)?;
                    return Ok(ExecutionResult::Continue);
                }
                self.do_call(packed, &operands[1..], instr.store_var, return_pc)
            }
            "call_1s" => {
                let packed = operands[0];
                if packed == 0 {
                    self.store_result(instr, 0)?;
                    return Ok(ExecutionResult::Continue);
                }
                self.do_call(packed, &[], instr.store_var, return_pc)
            }
            "call_2s" => {
                let packed = operands[0];
                if packed == 0 {
                    self.store_result(instr, 0)?;
                    return Ok(ExecutionResult::Continue);
                }
                self.do_call(packed, &operands[1..2], instr.store_var, return_pc)
            }
            "call_2n" => {
                let packed = operands[0];
                if packed == 0 {
                    return Ok(ExecutionResult::Continue);
                }
                self.do_call(packed, &operands[1..2], None, return_pc)
            }
            "call_1n" => {
                let packed = operands[0];
                if packed == 0 {
                    return Ok(ExecutionResult::Continue);
                }
                self.do_call(packed, &[], None, return_pc)
            }
            "call_vn" | "call_vn2" => {
                let packed = operands[0];
                if packed == 0 {
                    return Ok(ExecutionResult::Continue);
                }
                self.do_call(packed, &operands[1..], None, return_pc)
            }
            "ret" => self.do_return(operands[0]),
            "ret_popped" => {
                let value = self.stack.pop()?;
                self.do_return(value)
            }
            "rtrue" => self.do_return(1),
            "rfalse" => self.do_return(0),
            "jump" => {
                let offset = operands[0] as i16;
                let next = (instr.address + instr.length as u32) as i64;
                let target = next + offset as i64 - 2;
                Ok(ExecutionResult::Jumped(target as u32))
            }
            "push" => {
                self.stack.push(operands[0]);
                Ok(ExecutionResult::Continue)
            }
            "pull" => {
                let value = self.stack.pop()?;
                // Operand 0 is evaluated normally (a Variable-type operand
                // of 0 pops the stack to find out *which* variable to
                // target); the resulting number is the destination.
                let var_num = operands[0] as u8;
                self.variables.write(&mut self.stack, &mut self.memory, var_num, value)?;
                Ok(ExecutionResult::Continue)
            }
            "pop" => {
                self.stack.pop()?;
                Ok(ExecutionResult::Continue)
            }
            "catch" => {
                debug!("catch: stack depth {}", self.stack.get_frame_pointer());
                self.store_result(instr, self.stack.get_frame_pointer() as u16)?;
                Ok(ExecutionResult::Continue)
            }
            "throw" => self.do_throw(operands[0], operands[1]),
            "check_arg_count" => {
                let supplied = self.stack.has_argument(operands[0] as u8);
                self.evaluate_branch(instr, supplied)
            }
            other => Err(ZMachineError::OpcodeFault(format!("unhandled stack opcode {other}"))),
        }
    }
}
