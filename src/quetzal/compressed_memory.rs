//! XOR-RLE compression for Quetzal `CMem` chunks: XOR current dynamic
//! memory against the original story image, then run-length encode the
//! resulting zero bytes (spec §9).

use crate::error::ZMachineError;
use log::debug;

/// Runs of unchanged bytes are encoded as `0x00, run_length - 1` (max run
/// 256); any byte that differs from the original is stored as the raw XOR.
pub fn compress_memory(current: &[u8], original: &[u8]) -> Vec<u8> {
    debug_assert_eq!(current.len(), original.len());

    let mut compressed = Vec::new();
    let mut i = 0;
    while i < current.len() {
        let xor_byte = current[i] ^ original[i];
        if xor_byte == 0 {
            let start = i;
            while i < current.len() && (current[i] ^ original[i]) == 0 {
                i += 1;
            }
            let mut remaining = i - start;
            while remaining > 0 {
                let run = remaining.min(256);
                compressed.push(0);
                compressed.push((run - 1) as u8);
                remaining -= run;
            }
        } else {
            compressed.push(xor_byte);
            i += 1;
        }
    }
    debug!("compressed {} bytes to {} bytes", current.len(), compressed.len());
    compressed
}

pub fn decompress_memory(compressed: &[u8], original: &[u8]) -> Result<Vec<u8>, ZMachineError> {
    let mut out = Vec::with_capacity(original.len());
    let mut c = 0;
    let mut o = 0;

    while c < compressed.len() && o < original.len() {
        let byte = compressed[c];
        c += 1;
        if byte == 0 {
            let run_length_byte = *compressed.get(c).ok_or_else(|| {
                ZMachineError::SaveFault("truncated RLE run in CMem chunk".to_string())
            })?;
            c += 1;
            let run_length = run_length_byte as usize + 1;
            for _ in 0..run_length {
                if o >= original.len() {
                    return Err(ZMachineError::SaveFault(
                        "CMem run extends past end of dynamic memory".to_string(),
                    ));
                }
                out.push(original[o]);
                o += 1;
            }
        } else {
            out.push(original[o] ^ byte);
            o += 1;
        }
    }
    out.extend_from_slice(&original[o..]);

    if out.len() != original.len() {
        return Err(ZMachineError::SaveFault(format!(
            "decompressed size {} does not match original size {}",
            out.len(),
            original.len()
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_then_decompress_round_trips() {
        let original = vec![0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80];
        let current = vec![0x10, 0x21, 0x30, 0x40, 0x50, 0x60, 0x71, 0x80];
        let compressed = compress_memory(&current, &original);
        let restored = decompress_memory(&compressed, &original).unwrap();
        assert_eq!(current, restored);
    }

    #[test]
    fn long_runs_compress_well() {
        let original = vec![0xFFu8; 1000];
        let mut current = original.clone();
        current[500] = 0xFE;
        let compressed = compress_memory(&current, &original);
        assert!(compressed.len() < current.len());
        assert_eq!(decompress_memory(&compressed, &original).unwrap(), current);
    }
}
