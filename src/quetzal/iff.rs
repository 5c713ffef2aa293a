//! IFF (Interchange File Format) chunked container: the FORM/IFZS
//! envelope every Quetzal save lives inside.

use crate::error::ZMachineError;

pub struct IffChunk {
    pub chunk_type: [u8; 4],
    pub data: Vec<u8>,
}

pub struct IffFile {
    pub form_type: [u8; 4],
    pub chunks: Vec<IffChunk>,
}

impl IffFile {
    pub fn new() -> Self {
        IffFile {
            form_type: *b"IFZS",
            chunks: Vec::new(),
        }
    }

    pub fn add_chunk(&mut self, chunk_type: [u8; 4], data: Vec<u8>) {
        self.chunks.push(IffChunk { chunk_type, data });
    }

    pub fn find_chunk(&self, chunk_type: &[u8; 4]) -> Option<&IffChunk> {
        self.chunks.iter().find(|c| &c.chunk_type == chunk_type)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let total_size = 4
            + self
                .chunks
                .iter()
                .map(|c| 8 + c.data.len() + (c.data.len() % 2))
                .sum::<usize>();

        let mut out = Vec::with_capacity(8 + total_size);
        out.extend_from_slice(b"FORM");
        out.extend_from_slice(&(total_size as u32).to_be_bytes());
        out.extend_from_slice(&self.form_type);

        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.chunk_type);
            out.extend_from_slice(&(chunk.data.len() as u32).to_be_bytes());
            out.extend_from_slice(&chunk.data);
            if chunk.data.len() % 2 == 1 {
                out.push(0);
            }
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ZMachineError> {
        fault_if(bytes.len() < 12, "file too small to contain an IFF header")?;
        fault_if(&bytes[0..4] != b"FORM", "missing FORM header")?;

        let form_type: [u8; 4] = bytes[8..12].try_into().unwrap();
        let mut iff = IffFile {
            form_type,
            chunks: Vec::new(),
        };

        let mut cursor = 12;
        while cursor + 8 <= bytes.len() {
            let chunk_type: [u8; 4] = bytes[cursor..cursor + 4].try_into().unwrap();
            let size = u32::from_be_bytes(bytes[cursor + 4..cursor + 8].try_into().unwrap()) as usize;
            cursor += 8;
            fault_if(cursor + size > bytes.len(), "chunk size extends past end of file")?;
            let data = bytes[cursor..cursor + size].to_vec();
            cursor += size;
            if size % 2 == 1 {
                cursor += 1;
            }
            iff.chunks.push(IffChunk { chunk_type, data });
        }
        Ok(iff)
    }
}

impl Default for IffFile {
    fn default() -> Self {
        Self::new()
    }
}

fn fault_if(cond: bool, message: &str) -> Result<(), ZMachineError> {
    if cond {
        Err(ZMachineError::SaveFault(message.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let mut iff = IffFile::new();
        iff.add_chunk(*b"IFhd", vec![1, 2, 3]);
        iff.add_chunk(*b"Stks", vec![4, 5, 6, 7]);
        let bytes = iff.to_bytes();
        let parsed = IffFile::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.form_type, *b"IFZS");
        assert_eq!(parsed.find_chunk(b"IFhd").unwrap().data, vec![1, 2, 3]);
        assert_eq!(parsed.find_chunk(b"Stks").unwrap().data, vec![4, 5, 6, 7]);
    }

    #[test]
    fn rejects_non_form_files() {
        assert!(IffFile::from_bytes(b"JUNKxxxxxxxx").is_err());
    }
}
