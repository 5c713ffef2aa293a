//! Quetzal chunk definitions: `IFhd` (identity), `CMem`/`UMem` (memory),
//! `Stks` (call stack) (spec §9).

use crate::error::ZMachineError;
use crate::header::Header;
use crate::stack::{CallFrame, Stack, MAX_LOCALS};

/// Interface header: identifies which story file (and release) a save
/// belongs to, so `restore` can refuse a save made against a different game.
pub struct IfhdChunk {
    pub release: u16,
    pub serial: [u8; 6],
    pub checksum: u16,
    pub initial_pc: u32,
}

impl IfhdChunk {
    pub fn from_header(header: &Header, current_pc: u32) -> Self {
        let mut serial = [0u8; 6];
        let bytes = header.serial.as_bytes();
        serial[..bytes.len().min(6)].copy_from_slice(&bytes[..bytes.len().min(6)]);
        IfhdChunk {
            release: header.release,
            serial,
            checksum: header.checksum,
            initial_pc: current_pc,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(13);
        out.extend_from_slice(&self.release.to_be_bytes());
        out.extend_from_slice(&self.serial);
        out.extend_from_slice(&self.checksum.to_be_bytes());
        let pc = self.initial_pc.to_be_bytes();
        out.extend_from_slice(&pc[1..4]);
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ZMachineError> {
        if data.len() < 13 {
            return Err(ZMachineError::SaveFault("IFhd chunk too small".to_string()));
        }
        let release = u16::from_be_bytes([data[0], data[1]]);
        let mut serial = [0u8; 6];
        serial.copy_from_slice(&data[2..8]);
        let checksum = u16::from_be_bytes([data[8], data[9]]);
        let initial_pc = ((data[10] as u32) << 16) | ((data[11] as u32) << 8) | data[12] as u32;
        Ok(IfhdChunk {
            release,
            serial,
            checksum,
            initial_pc,
        })
    }

    pub fn matches(&self, header: &Header) -> bool {
        let serial_str: String = self.serial.iter().map(|&b| b as char).collect();
        self.release == header.release
            && serial_str == header.serial
            && self.checksum == header.checksum
    }
}

/// Uncompressed dynamic memory, used when a smaller `CMem` isn't worth it
/// (or as the fallback a restore reads if no `CMem` chunk is present).
pub struct UmemChunk {
    pub memory: Vec<u8>,
}

impl UmemChunk {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.memory.clone()
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        UmemChunk { memory: data }
    }
}

/// Flattened call stack: one record per frame, oldest first, each carrying
/// its own evaluation-stack contents (this crate keeps the eval stack
/// per-frame rather than as one shared array with per-frame base offsets).
pub struct StksChunk {
    pub data: Vec<u8>,
}

impl StksChunk {
    pub fn from_stack(stack: &Stack) -> Self {
        let mut data = Vec::new();
        for frame in stack.frames_oldest_first() {
            let pc_bytes = frame.return_pc.to_be_bytes();
            data.extend_from_slice(&pc_bytes[1..4]);

            let mut flags = frame.local_count & 0x0F;
            if frame.store_var.is_some() {
                flags |= 0x10;
            }
            data.push(flags);

            if let Some(v) = frame.store_var {
                data.push(v);
            }

            // Bit N set means argument N was NOT supplied (spec encoding).
            let supplied_mask: u8 = if frame.argument_count >= 7 {
                0x7F
            } else {
                (1u8 << frame.argument_count) - 1
            };
            data.push(supplied_mask);

            data.extend_from_slice(&(frame.eval_stack.len() as u16).to_be_bytes());
            for i in 0..frame.local_count as usize {
                data.extend_from_slice(&frame.locals[i].to_be_bytes());
            }
            for value in &frame.eval_stack {
                data.extend_from_slice(&value.to_be_bytes());
            }
        }
        StksChunk { data }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn to_stack(&self) -> Result<Stack, ZMachineError> {
        let mut frames = Vec::new();
        let data = &self.data;
        let mut offset = 0;

        while offset < data.len() {
            let need = |n: usize, what: &str| -> Result<(), ZMachineError> {
                if offset + n > data.len() {
                    Err(ZMachineError::SaveFault(format!("Stks chunk truncated reading {what}")))
                } else {
                    Ok(())
                }
            };

            need(4, "frame header")?;
            let return_pc = ((data[offset] as u32) << 16)
                | ((data[offset + 1] as u32) << 8)
                | data[offset + 2] as u32;
            let flags = data[offset + 3];
            offset += 4;

            let local_count = (flags & 0x0F) as usize;
            if local_count > MAX_LOCALS {
                return Err(ZMachineError::SaveFault(format!(
                    "frame declares {local_count} locals, max is {MAX_LOCALS}"
                )));
            }
            let has_store = flags & 0x10 != 0;

            let store_var = if has_store {
                need(1, "store variable")?;
                let v = data[offset];
                offset += 1;
                Some(v)
            } else {
                None
            };

            need(1, "argument mask")?;
            let supplied_mask = data[offset];
            offset += 1;
            let argument_count = supplied_mask.trailing_ones().min(7) as u8;

            need(2, "eval stack count")?;
            let stack_count = u16::from_be_bytes([data[offset], data[offset + 1]]) as usize;
            offset += 2;

            let mut locals = [0u16; MAX_LOCALS];
            need(local_count * 2, "locals")?;
            for local in locals.iter_mut().take(local_count) {
                *local = u16::from_be_bytes([data[offset], data[offset + 1]]);
                offset += 2;
            }

            need(stack_count * 2, "evaluation stack")?;
            let mut eval_stack = Vec::with_capacity(stack_count);
            for _ in 0..stack_count {
                eval_stack.push(u16::from_be_bytes([data[offset], data[offset + 1]]));
                offset += 2;
            }

            frames.push(CallFrame {
                return_pc,
                store_var,
                locals,
                local_count: local_count as u8,
                eval_stack,
                argument_count,
            });
        }

        if frames.is_empty() {
            return Err(ZMachineError::SaveFault("Stks chunk has no frames".to_string()));
        }
        Ok(Stack::from_frames(frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ifhd_round_trips() {
        let mut header_bytes = vec![0u8; 64];
        header_bytes[0] = 3;
        header_bytes[3] = 7;
        header_bytes[0x12..0x18].copy_from_slice(b"990101");
        let mem = crate::memory::Memory::new(header_bytes, 64);
        let header = Header::parse(&mem).unwrap();

        let chunk = IfhdChunk::from_header(&header, 0x4ABC);
        let bytes = chunk.to_bytes();
        let parsed = IfhdChunk::from_bytes(&bytes).unwrap();
        assert!(parsed.matches(&header));
        assert_eq!(parsed.initial_pc, 0x4ABC);
    }

    #[test]
    fn stks_round_trips_through_bytes() {
        let mut stack = Stack::new();
        stack.initialize();
        stack.push(10);
        stack.push(20);
        stack.push_frame(0x1000, Some(3), 2, 2).unwrap();
        stack.set_local(0, 100).unwrap();
        stack.set_local(1, 200).unwrap();
        stack.push(42);

        let chunk = StksChunk::from_stack(&stack);
        let restored = chunk.to_stack().unwrap();
        assert_eq!(restored.get_frame_pointer(), 2);
        assert_eq!(restored.current_frame().locals[0], 100);
        assert_eq!(restored.current_frame().eval_stack, vec![42]);
    }
}
