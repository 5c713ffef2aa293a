//! Object tree and property table opcodes (spec §4.5, §4.6, §4.10).

use crate::error::ZMachineError;
use crate::instruction::Instruction;
use crate::property::Properties;
use crate::vm::{ExecutionResult, VM};
use log::debug;

impl VM {
    pub(crate) fn execute_object_op(
        &mut self,
        instr: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, ZMachineError> {
        let objects = self.object_table();
        match instr.name {
            "jin" => {
                let parent = objects.get_parent(&self.memory, operands[0])?;
                self.evaluate_branch(instr, parent == operands[1])
            }
            "test" => {
                let condition = operands[0] & operands[1] == operands[1];
                self.evaluate_branch(instr, condition)
            }
            "test_attr" => {
                let has = objects.test_attribute(&self.memory, operands[0], operands[1])?;
                self.evaluate_branch(instr, has)
            }
            "set_attr" => {
                objects.set_attribute(&mut self.memory, operands[0], operands[1])?;
                Ok(ExecutionResult::Continue)
            }
            "clear_attr" => {
                objects.clear_attribute(&mut self.memory, operands[0], operands[1])?;
                Ok(ExecutionResult::Continue)
            }
            "insert_obj" => {
                debug!("insert_obj {} into {}", operands[0], operands[1]);
                objects.insert_object(&mut self.memory, operands[0], operands[1])?;
                Ok(ExecutionResult::Continue)
            }
            "remove_obj" => {
                objects.remove_from_parent(&mut self.memory, operands[0])?;
                Ok(ExecutionResult::Continue)
            }
            "get_sibling" => {
                let sibling = objects.get_sibling(&self.memory, operands[0])?;
                self.store_result(instr, sibling)?;
                self.evaluate_branch(instr, sibling != 0)
            }
            "get_child" => {
                let child = objects.get_child(&self.memory, operands[0])?;
                self.store_result(instr, child)?;
                self.evaluate_branch(instr, child != 0)
            }
            "get_parent" => {
                let parent = objects.get_parent(&self.memory, operands[0])?;
                self.store_result(instr, parent)?;
                Ok(ExecutionResult::Continue)
            }
            "get_prop" => {
                let props = Properties::new(&objects, self.header.version);
                let value = props.get_property(&self.memory, operands[0], operands[1])?;
                self.store_result(instr, value)?;
                Ok(ExecutionResult::Continue)
            }
            "get_prop_addr" => {
                let props = Properties::new(&objects, self.header.version);
                let addr = props.get_property_address(&self.memory, operands[0], operands[1])?;
                self.store_result(instr, addr as u16)?;
                Ok(ExecutionResult::Continue)
            }
            "get_prop_len" => {
                let props = Properties::new(&objects, self.header.version);
                let len = props.get_property_length(&self.memory, operands[0] as usize)?;
                self.store_result(instr, len as u16)?;
                Ok(ExecutionResult::Continue)
            }
            "get_next_prop" => {
                let props = Properties::new(&objects, self.header.version);
                let next = props.get_next_property(&self.memory, operands[0], operands[1])?;
                self.store_result(instr, next)?;
                Ok(ExecutionResult::Continue)
            }
            "put_prop" => {
                let props = Properties::new(&objects, self.header.version);
                props.put_property(&mut self.memory, operands[0], operands[1], operands[2])?;
                Ok(ExecutionResult::Continue)
            }
            other => Err(ZMachineError::OpcodeFault(format!("unhandled object opcode {other}"))),
        }
    }
}
