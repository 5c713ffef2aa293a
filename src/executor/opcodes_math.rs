//! Arithmetic, bitwise, and comparison opcodes (spec §4.10).

use crate::error::ZMachineError;
use crate::instruction::Instruction;
use crate::vm::{ExecutionResult, VM};

impl VM {
    pub(crate) fn execute_math_op(
        &mut self,
        instr: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, ZMachineError> {
        match instr.name {
            "je" => {
                let condition = operands.len() > 1 && operands[1..].iter().any(|&o| o == operands[0]);
                self.evaluate_branch(instr, condition)
            }
            "jl" => {
                let condition = (operands[0] as i16) < (operands[1] as i16);
                self.evaluate_branch(instr, condition)
            }
            "jg" => {
                let condition = (operands[0] as i16) > (operands[1] as i16);
                self.evaluate_branch(instr, condition)
            }
            "dec_chk" => {
                let var = operands[0] as u8;
                self.variables.decrement(&mut self.stack, &mut self.memory, var)?;
                let value = self.variables.peek(&self.stack, &self.memory, var)?;
                self.evaluate_branch(instr, (value as i16) < (operands[1] as i16))
            }
            "inc_chk" => {
                let var = operands[0] as u8;
                self.variables.increment(&mut self.stack, &mut self.memory, var)?;
                let value = self.variables.peek(&self.stack, &self.memory, var)?;
                self.evaluate_branch(instr, (value as i16) > (operands[1] as i16))
            }
            "or" => {
                self.store_result(instr, operands[0] | operands[1])?;
                Ok(ExecutionResult::Continue)
            }
            "and" => {
                self.store_result(instr, operands[0] & operands[1])?;
                Ok(ExecutionResult::Continue)
            }
            "add" => {
                let result = (operands[0] as i16).wrapping_add(operands[1] as i16) as u16;
                self.store_result(instr, result)?;
                Ok(ExecutionResult::Continue)
            }
            "sub" => {
                let result = (operands[0] as i16).wrapping_sub(operands[1] as i16) as u16;
                self.store_result(instr, result)?;
                Ok(ExecutionResult::Continue)
            }
            "mul" => {
                let result = (operands[0] as i16).wrapping_mul(operands[1] as i16) as u16;
                self.store_result(instr, result)?;
                Ok(ExecutionResult::Continue)
            }
            "div" => {
                if operands[1] == 0 {
                    return Err(ZMachineError::OpcodeFault("division by zero".to_string()));
                }
                let result = (operands[0] as i16).wrapping_div(operands[1] as i16);
                self.store_result(instr, result as u16)?;
                Ok(ExecutionResult::Continue)
            }
            "mod" => {
                if operands[1] == 0 {
                    return Err(ZMachineError::OpcodeFault("modulo by zero".to_string()));
                }
                let result = (operands[0] as i16).wrapping_rem(operands[1] as i16);
                self.store_result(instr, result as u16)?;
                Ok(ExecutionResult::Continue)
            }
            "not" => {
                self.store_result(instr, !operands[0])?;
                Ok(ExecutionResult::Continue)
            }
            "log_shift" => {
                let places = operands[1] as i16;
                let result = if places >= 0 {
                    operands[0].wrapping_shl(places as u32)
                } else {
                    operands[0].wrapping_shr((-places) as u32)
                };
                self.store_result(instr, result)?;
                Ok(ExecutionResult::Continue)
            }
            "art_shift" => {
                let places = operands[1] as i16;
                let value = operands[0] as i16;
                let result = if places >= 0 {
                    value.wrapping_shl(places as u32)
                } else {
                    value.wrapping_shr((-places) as u32)
                };
                self.store_result(instr, result as u16)?;
                Ok(ExecutionResult::Continue)
            }
            "random" => {
                let range = operands[0] as i16;
                let result = match range.cmp(&0) {
                    std::cmp::Ordering::Greater => self.rand.next_in_range(range as u16),
                    std::cmp::Ordering::Equal => {
                        self.rand.reseed_true_random();
                        0
                    }
                    std::cmp::Ordering::Less => {
                        self.rand.reseed_predictable((-range) as u64);
                        0
                    }
                };
                self.store_result(instr, result)?;
                Ok(ExecutionResult::Continue)
            }
            other => Err(ZMachineError::OpcodeFault(format!("unhandled math opcode {other}"))),
        }
    }
}
