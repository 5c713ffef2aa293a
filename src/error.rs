//! Typed error kinds for every fallible VM operation.
//!
//! The dispatch loop never unwinds across an instruction boundary (see
//! `executor`): every fault is returned as a value and surfaced through
//! `ExecutionResult::error`.

use thiserror::Error;

/// The error kinds a Z-machine interpreter can raise while executing a story.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ZMachineError {
    #[error("memory fault: {0}")]
    MemoryFault(String),

    #[error("stack fault: {0}")]
    StackFault(String),

    #[error("variable fault: {0}")]
    VariableFault(String),

    #[error("decode fault: {0}")]
    DecodeFault(String),

    #[error("opcode fault: {0}")]
    OpcodeFault(String),

    #[error("object fault: {0}")]
    ObjectFault(String),

    #[error("dictionary fault: {0}")]
    DictionaryFault(String),

    #[error("save fault: {0}")]
    SaveFault(String),
}

pub type ZResult<T> = Result<T, ZMachineError>;
