//! End-to-end dispatch-loop scenarios driven through `VM::step`, mirroring
//! the literal byte sequences called out as testable properties.

use test_log::test;
use zvm::io::HeadlessIo;
use zvm::vm::RunState;
use zvm::VM;

const GLOBALS_ADDR: usize = 0x40;
const STATIC_BASE: usize = 0x300;
const CODE_ADDR: usize = 0x300;

/// A minimal V3 story: header with globals at 0x40 and a static-memory
/// boundary at 0x300, leaving `[0x300, file_len)` free for test bytecode.
fn minimal_story(file_len: usize) -> Vec<u8> {
    minimal_story_with_version(file_len, 3)
}

fn minimal_story_with_version(file_len: usize, version: u8) -> Vec<u8> {
    let mut bytes = vec![0u8; file_len];
    bytes[0x00] = version;
    bytes[0x04] = (STATIC_BASE >> 8) as u8; // high memory base (unused by these tests)
    bytes[0x05] = STATIC_BASE as u8;
    bytes[0x06] = (CODE_ADDR >> 8) as u8; // initial PC
    bytes[0x07] = CODE_ADDR as u8;
    bytes[0x0C] = (GLOBALS_ADDR >> 8) as u8;
    bytes[0x0D] = GLOBALS_ADDR as u8;
    bytes[0x0E] = (STATIC_BASE >> 8) as u8;
    bytes[0x0F] = STATIC_BASE as u8;
    bytes[0x12..0x18].copy_from_slice(b"990101");
    bytes
}

fn vm_with_code(code: &[u8]) -> VM {
    let mut story = minimal_story(0x400);
    story[CODE_ADDR..CODE_ADDR + code.len()].copy_from_slice(code);
    VM::new(story, Box::new(HeadlessIo::new())).unwrap()
}

fn global0(vm: &VM) -> u16 {
    vm.memory.read_word(GLOBALS_ADDR).unwrap()
}

#[test]
fn arithmetic_add_stores_into_global_and_advances_pc() {
    // 2OP long form: add small-constant 10, small-constant 20, -> var 16.
    let mut vm = vm_with_code(&[0x14, 0x0A, 0x14, 0x10]);
    let state = vm.step().unwrap();
    assert!(matches!(state, RunState::Running));
    assert_eq!(global0(&vm), 30);
    assert_eq!(vm.pc as usize, CODE_ADDR + 4);
}

#[test]
fn division_by_zero_is_an_error_and_leaves_globals_untouched() {
    // 2OP long form: div small-constant 100, small-constant 0, -> var 16.
    let mut vm = vm_with_code(&[0x17, 0x64, 0x00, 0x10]);
    let err = vm.step().unwrap_err();
    assert!(err.to_string().to_lowercase().contains("division by zero"));
    assert_eq!(global0(&vm), 0);
}

#[test]
fn signed_branch_offset_jumps_backwards() {
    // jz 0, branch-on-true, 14-bit signed offset -4 (see instruction.rs's
    // own decoder unit test for the bit-level derivation of these bytes).
    let raw: u16 = (-4i16) as u16 & 0x3FFF;
    let b0 = 0x80 | ((raw >> 8) as u8 & 0x3F);
    let b1 = (raw & 0xFF) as u8;
    let mut vm = vm_with_code(&[0x80, 0x00, b0, b1]);
    let state = vm.step().unwrap();
    assert!(matches!(state, RunState::Running));
    // end_of_instruction (CODE_ADDR + 4) + (-4) - 2
    assert_eq!(vm.pc as usize, CODE_ADDR + 4 - 4 - 2);
}

#[test]
fn call_then_return_restores_caller_and_stores_value() {
    const ROUTINE_ADDR: usize = 0x320;
    const ROUTINE_PACKED: u16 = (ROUTINE_ADDR / 2) as u16;

    // VAR:0 call, one large-constant operand (routine packed addr), store
    // var 16; no arguments supplied.
    let call_bytes = [
        0xE0,
        0x3F,
        (ROUTINE_PACKED >> 8) as u8,
        ROUTINE_PACKED as u8,
        0x10,
    ];
    let mut story = minimal_story(0x400);
    story[CODE_ADDR..CODE_ADDR + call_bytes.len()].copy_from_slice(&call_bytes);

    // Routine header: 2 locals with defaults 0x0010, 0x0020, then body.
    story[ROUTINE_ADDR] = 2;
    story[ROUTINE_ADDR + 1] = 0x00;
    story[ROUTINE_ADDR + 2] = 0x10;
    story[ROUTINE_ADDR + 3] = 0x00;
    story[ROUTINE_ADDR + 4] = 0x20;
    // Body at ROUTINE_ADDR + 5: 1OP short form `ret` with small-constant 42.
    story[ROUTINE_ADDR + 5] = 0x9B;
    story[ROUTINE_ADDR + 6] = 0x2A;

    let mut vm = VM::new(story, Box::new(HeadlessIo::new())).unwrap();

    let after_call = vm.step().unwrap();
    assert!(matches!(after_call, RunState::Running));
    assert_eq!(vm.stack.get_frame_pointer(), 2);
    assert_eq!(vm.stack.current_frame().locals[0], 0x0010);
    assert_eq!(vm.stack.current_frame().locals[1], 0x0020);
    assert_eq!(vm.pc as usize, ROUTINE_ADDR + 5);

    let after_ret = vm.step().unwrap();
    assert!(matches!(after_ret, RunState::Running));
    assert_eq!(vm.stack.get_frame_pointer(), 1);
    assert_eq!(global0(&vm), 42);
    assert_eq!(vm.pc as usize, CODE_ADDR + call_bytes.len());
}

/// An in-memory host that actually supports `save`/`restore`, unlike
/// `HeadlessIo` (whose defaults report unsupported), so the `save`/`restore`
/// opcodes can be driven through the dispatcher instead of called directly.
#[derive(Default)]
struct RoundTripIo {
    inner: HeadlessIo,
    slot: Option<Vec<u8>>,
}

impl zvm::io::ZMachineIo for RoundTripIo {
    fn print(&mut self, text: &str) -> Result<(), zvm::io::IoError> {
        self.inner.print(text)
    }
    fn new_line(&mut self) -> Result<(), zvm::io::IoError> {
        self.inner.new_line()
    }
    fn read_line(
        &mut self,
        max_len: usize,
    ) -> Result<zvm::io::InputOutcome<zvm::io::LineInput>, zvm::io::IoError> {
        self.inner.read_line(max_len)
    }
    fn read_char(
        &mut self,
        timeout_tenths: u16,
    ) -> Result<zvm::io::InputOutcome<u16>, zvm::io::IoError> {
        self.inner.read_char(timeout_tenths)
    }
    fn quit(&mut self) -> Result<(), zvm::io::IoError> {
        self.inner.quit()
    }
    fn restart(&mut self) -> Result<(), zvm::io::IoError> {
        self.inner.restart()
    }
    fn supports_save(&self) -> bool {
        true
    }
    fn save(&mut self, bytes: &[u8]) -> Result<zvm::io::InputOutcome<bool>, zvm::io::IoError> {
        self.slot = Some(bytes.to_vec());
        Ok(zvm::io::InputOutcome::Ready(true))
    }
    fn supports_restore(&self) -> bool {
        true
    }
    fn restore(&mut self) -> Result<zvm::io::InputOutcome<Option<Vec<u8>>>, zvm::io::IoError> {
        Ok(zvm::io::InputOutcome::Ready(self.slot.clone()))
    }
}

#[test]
fn save_then_restore_through_the_vm_resumes_with_store_code_two() {
    const STORE_VAR: u8 = 16;

    // V4+ makes `save`/`restore` store opcodes (0OP form); V1-3 would branch.
    let mut story = minimal_story_with_version(0x400, 4);
    let save_bytes = [0xB5u8, STORE_VAR];
    story[CODE_ADDR..CODE_ADDR + save_bytes.len()].copy_from_slice(&save_bytes);
    let restore_addr = CODE_ADDR + save_bytes.len();
    let restore_bytes = [0xB6u8, STORE_VAR];
    story[restore_addr..restore_addr + restore_bytes.len()].copy_from_slice(&restore_bytes);

    let mut vm = VM::new(story, Box::new(RoundTripIo::default())).unwrap();
    vm.memory.write_byte(0x10, 0xAB).unwrap();

    let state = vm.step().unwrap();
    assert!(matches!(state, RunState::Running));
    assert_eq!(global0(&vm), 1); // save opcode reports success
    assert_eq!(vm.pc as usize, restore_addr);

    vm.memory.write_byte(0x10, 0xCD).unwrap();

    let state = vm.step().unwrap();
    assert!(matches!(state, RunState::Running));
    assert_eq!(vm.memory.read_byte(0x10).unwrap(), 0xAB);
    assert_eq!(global0(&vm), 2); // restore opcode reports success
    assert_eq!(vm.pc as usize, CODE_ADDR + save_bytes.len());
}
