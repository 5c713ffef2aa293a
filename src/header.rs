//! Header parsing (spec §3, §4.2): the fixed structure at offsets
//! 0x00-0x3F (extended in V5+) that every other subsystem reads its base
//! addresses from.

use crate::error::ZMachineError;
use crate::memory::Memory;

/// Parsed header fields. Kept as typed accessors over the raw bytes rather
/// than a struct of copies, since a few fields (screen dimensions) are
/// writable by the interpreter at runtime.
pub struct Header {
    pub version: u8,
    pub flags1: u8,
    pub release: u16,
    pub base_high_mem: u16,
    pub initial_pc: u16,
    pub dictionary_addr: u16,
    pub object_table_addr: u16,
    pub global_variables_addr: u16,
    pub base_static_mem: u16,
    pub flags2: u16,
    pub serial: String,
    pub abbrev_table_addr: u16,
    pub file_length: usize,
    pub checksum: u16,
    pub routines_offset: u16,
    pub strings_offset: u16,
}

impl Header {
    pub fn parse(memory: &Memory) -> Result<Header, ZMachineError> {
        let version = memory.read_byte(0x00)?;
        if !(1..=8).contains(&version) {
            return Err(ZMachineError::DecodeFault(format!(
                "unsupported story file version {version}"
            )));
        }

        let flags1 = memory.read_byte(0x01)?;
        let release = memory.read_word(0x02)?;
        let base_high_mem = memory.read_word(0x04)?;
        let initial_pc = memory.read_word(0x06)?;
        let dictionary_addr = memory.read_word(0x08)?;
        let object_table_addr = memory.read_word(0x0A)?;
        let global_variables_addr = memory.read_word(0x0C)?;
        let base_static_mem = memory.read_word(0x0E)?;
        let flags2 = memory.read_word(0x10)?;

        let serial_bytes = memory.read_bytes(0x12, 6)?;
        let serial: String = serial_bytes.iter().map(|&b| b as char).collect();

        let abbrev_table_addr = memory.read_word(0x18)?;

        let len_word = memory.read_word(0x1A)? as usize;
        let length_multiplier = match version {
            1..=3 => 2,
            4..=5 => 4,
            _ => 8,
        };
        let file_length = len_word * length_multiplier;

        let checksum = memory.read_word(0x1C)?;

        let (routines_offset, strings_offset) = if version >= 6 {
            (memory.read_word(0x28)?, memory.read_word(0x2A)?)
        } else {
            (0, 0)
        };

        Ok(Header {
            version,
            flags1,
            release,
            base_high_mem,
            initial_pc,
            dictionary_addr,
            object_table_addr,
            global_variables_addr,
            base_static_mem,
            flags2,
            serial,
            abbrev_table_addr,
            file_length,
            checksum,
            routines_offset,
            strings_offset,
        })
    }

    /// Packed-address multiplier for this story's version (2/4/8).
    pub fn packed_address_multiplier(&self) -> u32 {
        match self.version {
            1..=3 => 2,
            4..=5 => 4,
            6 | 7 => 4,
            _ => 8,
        }
    }

    /// Resolve a packed address to a byte address. V6/V7 routines and
    /// strings use distinct header-supplied offsets.
    pub fn unpack_address(&self, packed: u16, is_string: bool) -> u32 {
        let base = packed as u32 * self.packed_address_multiplier();
        match self.version {
            6 | 7 => {
                let offset = if is_string {
                    self.strings_offset
                } else {
                    self.routines_offset
                } as u32;
                base + 8 * offset
            }
            _ => base,
        }
    }

    /// Max Z-characters a routine/dictionary encoder packs into a string:
    /// 6 for V1-3, 9 for V4+.
    pub fn max_zchars(&self) -> usize {
        if self.version <= 3 {
            6
        } else {
            9
        }
    }

    pub fn is_version(&self, v: u8) -> bool {
        self.version == v
    }

    /// Interpreter identity/version and screen dimensions are writable
    /// fields in dynamic memory (V4+); this just marks their offsets for
    /// the executor's `show_status`/terminal-setup opcodes to use directly
    /// via `Memory::write_byte`/`write_word`.
    pub const INTERPRETER_NUMBER_ADDR: usize = 0x1E;
    pub const INTERPRETER_VERSION_ADDR: usize = 0x1F;
    pub const SCREEN_HEIGHT_CHARS_ADDR: usize = 0x20;
    pub const SCREEN_WIDTH_CHARS_ADDR: usize = 0x21;
    pub const SCREEN_WIDTH_UNITS_ADDR: usize = 0x22;
    pub const SCREEN_HEIGHT_UNITS_ADDR: usize = 0x24;

    /// Stamps the interpreter identity (V4+ only; earlier versions have no
    /// such fields and the story never reads them).
    pub fn set_interpreter_identity(
        &self,
        memory: &mut Memory,
        number: u8,
        version: u8,
    ) -> Result<(), ZMachineError> {
        if self.version < 4 {
            return Ok(());
        }
        memory.write_byte(Self::INTERPRETER_NUMBER_ADDR, number)?;
        memory.write_byte(Self::INTERPRETER_VERSION_ADDR, version)
    }

    /// Stamps screen dimensions in characters (V4+) and, for V5+, also in
    /// screen units (1 unit == 1 character, since this crate has no font
    /// metrics of its own).
    pub fn set_screen_size(
        &self,
        memory: &mut Memory,
        width_chars: u8,
        height_chars: u8,
    ) -> Result<(), ZMachineError> {
        if self.version < 4 {
            return Ok(());
        }
        memory.write_byte(Self::SCREEN_WIDTH_CHARS_ADDR, width_chars)?;
        memory.write_byte(Self::SCREEN_HEIGHT_CHARS_ADDR, height_chars)?;
        if self.version >= 5 {
            memory.write_word(Self::SCREEN_WIDTH_UNITS_ADDR, width_chars as u16)?;
            memory.write_word(Self::SCREEN_HEIGHT_UNITS_ADDR, height_chars as u16)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(version: u8) -> Vec<u8> {
        let mut b = vec![0u8; 64];
        b[0x00] = version;
        b[0x02] = 0x00;
        b[0x03] = 0x01; // release 1
        b[0x0E] = 0x01;
        b[0x0F] = 0x00; // static base 0x100
        b[0x12..0x18].copy_from_slice(b"123456");
        b
    }

    #[test]
    fn parses_v3_fields() {
        let bytes = header_bytes(3);
        let mem = Memory::new(bytes, 0x100);
        let header = Header::parse(&mem).unwrap();
        assert_eq!(header.version, 3);
        assert_eq!(header.release, 1);
        assert_eq!(header.serial, "123456");
        assert_eq!(header.base_static_mem, 0x100);
    }

    #[test]
    fn packed_address_multipliers_by_version() {
        for (version, mult) in [(3u8, 2u32), (5, 4), (8, 8)] {
            let mem = Memory::new(header_bytes(version), 0x100);
            let header = Header::parse(&mem).unwrap();
            assert_eq!(header.packed_address_multiplier(), mult);
        }
    }

    #[test]
    fn rejects_out_of_range_version() {
        let mut bytes = header_bytes(3);
        bytes[0] = 9;
        let mem = Memory::new(bytes, 0x100);
        assert!(Header::parse(&mem).is_err());
    }
}
