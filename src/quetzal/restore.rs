//! Loading a Quetzal save image back into VM state (spec §9).

use crate::error::ZMachineError;
use crate::header::Header;
use crate::memory::Memory;
use crate::quetzal::chunks::IfhdChunk;
use crate::quetzal::compressed_memory::decompress_memory;
use crate::quetzal::iff::IffFile;
use crate::stack::Stack;
use log::{debug, warn};

/// The pieces a restore hands back to the caller, which owns merging them
/// into the live VM (the crate has no global `VM` type to mutate directly).
pub struct RestoredState {
    pub memory: Vec<u8>,
    pub stack: Stack,
    pub pc: u32,
}

pub fn restore_from_bytes(
    bytes: &[u8],
    header: &Header,
    memory: &Memory,
) -> Result<RestoredState, ZMachineError> {
    let iff = IffFile::from_bytes(bytes)?;

    if iff.form_type != *b"IFZS" {
        return Err(ZMachineError::SaveFault(format!(
            "not a Quetzal save file (form type {:?})",
            String::from_utf8_lossy(&iff.form_type)
        )));
    }

    let ifhd_chunk = iff
        .find_chunk(b"IFhd")
        .ok_or_else(|| ZMachineError::SaveFault("missing required IFhd chunk".to_string()))?;
    let ifhd = IfhdChunk::from_bytes(&ifhd_chunk.data)?;
    if !ifhd.matches(header) {
        warn!(
            "save file release/serial ({}, {:?}) does not match loaded story ({}, {})",
            ifhd.release, ifhd.serial, header.release, header.serial
        );
        return Err(ZMachineError::SaveFault(
            "save file does not match the running story file".to_string(),
        ));
    }

    let dynamic_size = header.base_static_mem as usize;
    let restored_memory = if let Some(cmem) = iff.find_chunk(b"CMem") {
        debug!("restoring dynamic memory from CMem");
        decompress_memory(&cmem.data, memory.original_dynamic_slice())?
    } else if let Some(umem) = iff.find_chunk(b"UMem") {
        debug!("restoring dynamic memory from UMem");
        if umem.data.len() != dynamic_size {
            return Err(ZMachineError::SaveFault(format!(
                "UMem size {} does not match dynamic memory size {dynamic_size}",
                umem.data.len()
            )));
        }
        umem.data.clone()
    } else {
        return Err(ZMachineError::SaveFault(
            "missing memory chunk (CMem or UMem)".to_string(),
        ));
    };

    let stks_chunk = iff
        .find_chunk(b"Stks")
        .ok_or_else(|| ZMachineError::SaveFault("missing required Stks chunk".to_string()))?;
    let stack = crate::quetzal::chunks::StksChunk {
        data: stks_chunk.data.clone(),
    }
    .to_stack()?;

    Ok(RestoredState {
        memory: restored_memory,
        stack,
        pc: ifhd.initial_pc,
    })
}
