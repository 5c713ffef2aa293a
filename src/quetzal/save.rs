//! Assembling a Quetzal save image from VM state (spec §9).

use crate::header::Header;
use crate::memory::Memory;
use crate::quetzal::chunks::{IfhdChunk, StksChunk, UmemChunk};
use crate::quetzal::compressed_memory::compress_memory;
use crate::quetzal::iff::IffFile;
use crate::stack::Stack;
use log::debug;

/// Builds the IFF byte image for a save. `current_pc` is the byte address
/// the VM will resume at when the save is later `restore`d (for `save_undo`
/// use) or the `save` instruction's own address (for file-based saves,
/// where real Z-machine interpreters continue after the `save` call
/// regardless of what's recorded here).
pub fn save_to_bytes(header: &Header, memory: &Memory, stack: &Stack, current_pc: u32) -> Vec<u8> {
    let mut iff = IffFile::new();

    let ifhd = IfhdChunk::from_header(header, current_pc);
    iff.add_chunk(*b"IFhd", ifhd.to_bytes());

    let compressed = compress_memory(memory.dynamic_slice(), memory.original_dynamic_slice());
    if compressed.len() < memory.dynamic_slice().len() {
        iff.add_chunk(*b"CMem", compressed);
    } else {
        debug!("CMem would not shrink the image, falling back to UMem");
        let umem = UmemChunk {
            memory: memory.dynamic_slice().to_vec(),
        };
        iff.add_chunk(*b"UMem", umem.to_bytes());
    }

    let stks = StksChunk::from_stack(stack);
    iff.add_chunk(*b"Stks", stks.to_bytes());

    iff.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quetzal::restore::restore_from_bytes;

    fn header_and_memory() -> (Header, Memory) {
        let mut bytes = vec![0u8; 64];
        bytes[0] = 3;
        bytes[3] = 1;
        bytes[0x0E] = 0;
        bytes[0x0F] = 64;
        bytes[0x12..0x18].copy_from_slice(b"000000");
        let mem = Memory::new(bytes, 64);
        let header = Header::parse(&mem).unwrap();
        (header, mem)
    }

    #[test]
    fn save_then_restore_preserves_memory_and_stack() {
        let (header, mut mem) = header_and_memory();
        mem.write_byte(10, 0xAB).unwrap();

        let mut stack = Stack::new();
        stack.initialize();
        stack.push(7);

        let bytes = save_to_bytes(&header, &mem, &stack, 0x400);
        let restored = restore_from_bytes(&bytes, &header, &mem).unwrap();

        assert_eq!(restored.memory[10], 0xAB);
        assert_eq!(restored.stack.current_frame().eval_stack, vec![7]);
    }
}
