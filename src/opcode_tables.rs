//! Opcode name tables keyed by (operand count, opcode number, version)
//! (spec §4.9). Each entry records the symbolic name and whether the
//! instruction stores a result and/or branches, which the decoder needs to
//! know how many trailing bytes to consume.

use crate::instruction::OperandCount;

#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    pub name: &'static str,
    pub stores: bool,
    pub branches: bool,
    /// `print`/`print_ret` carry an inline Z-string instead of operands.
    pub inline_text: bool,
}

const fn op(name: &'static str) -> OpcodeInfo {
    OpcodeInfo {
        name,
        stores: false,
        branches: false,
        inline_text: false,
    }
}
const fn store(name: &'static str) -> OpcodeInfo {
    OpcodeInfo {
        name,
        stores: true,
        branches: false,
        inline_text: false,
    }
}
const fn branch(name: &'static str) -> OpcodeInfo {
    OpcodeInfo {
        name,
        stores: false,
        branches: true,
        inline_text: false,
    }
}
const fn store_branch(name: &'static str) -> OpcodeInfo {
    OpcodeInfo {
        name,
        stores: true,
        branches: true,
        inline_text: false,
    }
}
const fn text(name: &'static str) -> OpcodeInfo {
    OpcodeInfo {
        name,
        stores: false,
        branches: false,
        inline_text: true,
    }
}

pub fn lookup(count: OperandCount, opcode: u8, version: u8) -> Option<OpcodeInfo> {
    match count {
        OperandCount::Op2 => two_op(opcode),
        OperandCount::Op1 => one_op(opcode, version),
        OperandCount::Op0 => zero_op(opcode, version),
        OperandCount::Var => var_op(opcode, version),
        OperandCount::Ext => ext_op(opcode),
    }
}

fn two_op(opcode: u8) -> Option<OpcodeInfo> {
    Some(match opcode {
        1 => branch("je"),
        2 => branch("jl"),
        3 => branch("jg"),
        4 => branch("dec_chk"),
        5 => branch("inc_chk"),
        6 => branch("jin"),
        7 => branch("test"),
        8 => store("or"),
        9 => store("and"),
        10 => branch("test_attr"),
        11 => op("set_attr"),
        12 => op("clear_attr"),
        13 => op("store"),
        14 => op("insert_obj"),
        15 => store("loadw"),
        16 => store("loadb"),
        17 => store("get_prop"),
        18 => store("get_prop_addr"),
        19 => store("get_next_prop"),
        20 => store("add"),
        21 => store("sub"),
        22 => store("mul"),
        23 => store("div"),
        24 => store("mod"),
        25 => store("call_2s"),
        26 => op("call_2n"),
        27 => op("set_colour"),
        28 => op("throw"),
        _ => return None,
    })
}

fn one_op(opcode: u8, version: u8) -> Option<OpcodeInfo> {
    Some(match opcode {
        0 => branch("jz"),
        1 => store_branch("get_sibling"),
        2 => store_branch("get_child"),
        3 => store("get_parent"),
        4 => store("get_prop_len"),
        5 => op("inc"),
        6 => op("dec"),
        7 => op("print_addr"),
        8 => store("call_1s"),
        9 => op("remove_obj"),
        10 => op("print_obj"),
        11 => op("ret"),
        12 => op("jump"),
        13 => op("print_paddr"),
        14 => store("load"),
        // 1OP:15 is "not" (stores) in V1-4; V5+ repurposes the slot for
        // call_1n, which neither stores nor branches.
        15 if version >= 5 => op("call_1n"),
        15 => store("not"),
        _ => return None,
    })
}

fn zero_op(opcode: u8, version: u8) -> Option<OpcodeInfo> {
    Some(match opcode {
        0 => op("rtrue"),
        1 => op("rfalse"),
        2 => text("print"),
        3 => text("print_ret"),
        4 => op("nop"),
        5 => {
            if version >= 4 {
                store("save")
            } else {
                branch("save")
            }
        }
        6 => {
            if version >= 4 {
                store("restore")
            } else {
                branch("restore")
            }
        }
        7 => op("restart"),
        8 => op("ret_popped"),
        9 => {
            if version >= 5 {
                store("catch")
            } else {
                op("pop")
            }
        }
        10 => op("quit"),
        11 => op("new_line"),
        12 => op("show_status"),
        13 => branch("verify"),
        15 => branch("piracy"),
        _ => return None,
    })
}

fn var_op(opcode: u8, version: u8) -> Option<OpcodeInfo> {
    Some(match opcode {
        0 => store("call"),
        1 => op("storew"),
        2 => op("storeb"),
        3 => op("put_prop"),
        4 => {
            if version >= 5 {
                store("aread")
            } else {
                op("sread")
            }
        }
        5 => op("print_char"),
        6 => op("print_num"),
        7 => store("random"),
        8 => op("push"),
        9 => op("pull"),
        10 => op("split_window"),
        11 => op("set_window"),
        12 => store("call_vs2"),
        13 => op("erase_window"),
        14 => op("erase_line"),
        15 => op("set_cursor"),
        16 => op("get_cursor"),
        17 => op("set_text_style"),
        18 => op("set_buffer_mode"),
        19 => op("output_stream"),
        20 => op("input_stream"),
        21 => op("sound_effect"),
        22 => store("read_char"),
        23 => store_branch("scan_table"),
        24 => store("not"),
        25 => op("call_vn"),
        26 => op("call_vn2"),
        27 => op("tokenise"),
        28 => op("encode_text"),
        29 => op("copy_table"),
        30 => op("print_table"),
        31 => branch("check_arg_count"),
        _ => return None,
    })
}

fn ext_op(opcode: u8) -> Option<OpcodeInfo> {
    Some(match opcode {
        0 => store("save"),
        1 => store("restore"),
        2 => store("log_shift"),
        3 => store("art_shift"),
        4 => store("set_font"),
        9 => store("save_undo"),
        10 => store("restore_undo"),
        11 => op("print_unicode"),
        12 => store("check_unicode"),
        13 => op("set_true_colour"),
        _ => return None,
    })
}
