//! Opcode dispatch: routes each decoded instruction to the handler module
//! that owns its semantics (spec §4.10). Grouped the way the teacher splits
//! opcode families into files, one `impl VM` block per file.

mod opcodes_io;
mod opcodes_math;
mod opcodes_memory;
mod opcodes_misc;
mod opcodes_object;
mod opcodes_stack;
mod opcodes_text;

use crate::error::ZMachineError;
use crate::instruction::Instruction;
use crate::vm::{ExecutionResult, VM};

impl VM {
    pub(crate) fn dispatch(
        &mut self,
        instr: &Instruction,
        operands: &[u16],
    ) -> Result<ExecutionResult, ZMachineError> {
        match instr.name {
            // Arithmetic, bitwise, and comparison.
            "add" | "sub" | "mul" | "div" | "mod" | "or" | "and" | "not" | "log_shift"
            | "art_shift" | "random" | "je" | "jl" | "jg" | "dec_chk" | "inc_chk" => {
                self.execute_math_op(instr, operands)
            }

            // Object tree and property table.
            "jin" | "test" | "test_attr" | "set_attr" | "clear_attr" | "insert_obj"
            | "remove_obj" | "get_sibling" | "get_child" | "get_parent" | "get_prop"
            | "get_prop_addr" | "get_prop_len" | "get_next_prop" | "put_prop" => {
                self.execute_object_op(instr, operands)
            }

            // Call stack, routine call/return, catch/throw.
            "call" | "call_1s" | "call_1n" | "call_2s" | "call_vs2" | "call_2n" | "call_vn"
            | "call_vn2" | "ret" | "ret_popped" | "rtrue" | "rfalse" | "jump" | "push" | "pull"
            | "pop" | "catch" | "throw" | "check_arg_count" => self.execute_stack_op(instr, operands),

            // Raw memory access and table scanning/copying.
            "loadw" | "storew" | "loadb" | "storeb" | "load" | "store" | "copy_table"
            | "scan_table" => self.execute_memory_op(instr, operands),

            // Text output/input encoding.
            "print" | "print_ret" | "print_addr" | "print_paddr" | "print_char" | "print_num"
            | "print_obj" | "new_line" | "print_table" | "print_unicode" | "check_unicode"
            | "tokenise" | "encode_text" => self.execute_text_op(instr, operands),

            // I/O: line/char input, windows, styling, save/restore, sound.
            "sread" | "aread" | "read_char" | "save" | "restore" | "save_undo"
            | "restore_undo" | "split_window" | "set_window" | "erase_window" | "erase_line"
            | "set_cursor" | "get_cursor" | "set_text_style" | "set_buffer_mode"
            | "output_stream" | "input_stream" | "sound_effect" | "set_colour"
            | "set_true_colour" | "set_font" => self.execute_io_op(instr, operands),

            // Misc control-flow and interpreter-identity opcodes.
            "jz" | "nop" | "verify" | "piracy" | "show_status" | "quit" | "restart" => {
                self.execute_misc_op(instr, operands)
            }

            other => Err(ZMachineError::OpcodeFault(format!("unhandled opcode {other}"))),
        }
    }
}
