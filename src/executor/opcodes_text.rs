//! Text output and string-encoding opcodes (spec §4.7, §4.8, §4.10).

use crate::error::ZMachineError;
use crate::instruction::Instruction;
use crate::text::{unicode_to_zscii, zscii_to_unicode};
use crate::vm::{ExecutionResult, VM};

impl VM {
    pub(crate) fn execute_text_op(
        &mut self,
        instr: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, ZMachineError> {
        match instr.name {
            "print" | "print_ret" => {
                let text = instr.text.as_deref().unwrap_or_default();
                self.print_text(text)?;
                if instr.name == "print_ret" {
                    self.print_newline()?;
                    return self.do_return(1);
                }
                Ok(ExecutionResult::Continue)
            }
            "print_addr" => {
                let (text, _) = self.text.decode(&self.memory, operands[0] as usize)?;
                self.print_text(&text)?;
                Ok(ExecutionResult::Continue)
            }
            "print_paddr" => {
                let addr = self.header.unpack_address(operands[0], true) as usize;
                let (text, _) = self.text.decode(&self.memory, addr)?;
                self.print_text(&text)?;
                Ok(ExecutionResult::Continue)
            }
            "print_obj" => {
                let objects = self.object_table();
                let (prop_table_addr, _) = objects.get_short_name_address(&self.memory, operands[0])?;
                let (text, _) = self.text.decode(&self.memory, prop_table_addr + 1)?;
                self.print_text(&text)?;
                Ok(ExecutionResult::Continue)
            }
            "print_char" => {
                self.print_text(&zscii_to_unicode(operands[0]).to_string())?;
                Ok(ExecutionResult::Continue)
            }
            "print_num" => {
                self.print_text(&(operands[0] as i16).to_string())?;
                Ok(ExecutionResult::Continue)
            }
            "print_unicode" => {
                let ch = char::from_u32(operands[0] as u32).unwrap_or('?');
                self.print_text(&ch.to_string())?;
                Ok(ExecutionResult::Continue)
            }
            "check_unicode" => {
                let ch = char::from_u32(operands[0] as u32);
                let can_print = ch.is_some();
                let can_input = ch.is_some_and(|c| unicode_to_zscii(c).is_some());
                let result = (can_print as u16) | ((can_input as u16) << 1);
                self.store_result(instr, result)?;
                Ok(ExecutionResult::Continue)
            }
            "new_line" => {
                self.print_newline()?;
                Ok(ExecutionResult::Continue)
            }
            "print_table" => {
                let (text_addr, width) = (operands[0] as usize, operands[1] as usize);
                let height = operands.get(2).copied().unwrap_or(1) as usize;
                let skip = operands.get(3).copied().unwrap_or(0) as usize;
                for row in 0..height {
                    if row > 0 {
                        self.print_newline()?;
                    }
                    let row_addr = text_addr + row * (width + skip);
                    for col in 0..width {
                        let byte = self.memory.read_byte(row_addr + col)?;
                        self.print_text(&zscii_to_unicode(byte as u16).to_string())?;
                    }
                }
                Ok(ExecutionResult::Continue)
            }
            "tokenise" => {
                let (text_buffer, parse_buffer) = (operands[0] as usize, operands[1] as usize);
                match operands.get(2).copied().filter(|&a| a != 0) {
                    Some(addr) => {
                        let dict = crate::dictionary::Dictionary::new(&self.memory, addr as usize, self.header.version)?;
                        let tokenizer = crate::dictionary::Tokenizer::new(&dict, &self.text);
                        tokenizer.tokenize_into_memory(
                            &mut self.memory,
                            text_buffer,
                            parse_buffer,
                            self.header.version,
                            false,
                        )?;
                    }
                    None => {
                        let dict = self.dictionary.as_ref().ok_or_else(|| {
                            ZMachineError::DictionaryFault("story has no dictionary".to_string())
                        })?;
                        let tokenizer = crate::dictionary::Tokenizer::new(dict, &self.text);
                        tokenizer.tokenize_into_memory(
                            &mut self.memory,
                            text_buffer,
                            parse_buffer,
                            self.header.version,
                            false,
                        )?;
                    }
                }
                Ok(ExecutionResult::Continue)
            }
            "encode_text" => {
                let (text_addr, length, from, coded_addr) =
                    (operands[0] as usize, operands[1] as usize, operands[2] as usize, operands[3] as usize);
                let bytes = self.memory.read_bytes(text_addr + from, length)?;
                let zscii: String = bytes.iter().map(|&b| zscii_to_unicode(b as u16)).collect();
                for (i, word) in self.text.encode(&zscii).into_iter().enumerate() {
                    self.memory.write_word(coded_addr + i * 2, word)?;
                }
                Ok(ExecutionResult::Continue)
            }
            other => Err(ZMachineError::OpcodeFault(format!("unhandled text opcode {other}"))),
        }
    }
}
