//! Z-character text codec: decode and encode, abbreviation expansion, and
//! ZSCII<->Unicode translation (spec §3, §4.7).

use crate::error::ZMachineError;
use crate::memory::Memory;
use log::{debug, trace};

pub const ALPHABET_A0: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";
pub const ALPHABET_A1: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Z-char 6 in A2 is the ZSCII escape, not a literal character, so index 0
/// of this table is never actually looked up for it.
pub const ALPHABET_A2: &[u8; 26] = b" \n0123456789.,!?_#'\"/\\-:()";

/// ZSCII extension table (codes 155-251): accented Latin and similar.
/// Index 0 corresponds to ZSCII code 155.
const ZSCII_EXTRA: &[char; 69] = &[
    'ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß', '»', '«', 'ë', 'ï', 'ÿ', 'Ë', 'Ï', 'á', 'é', 'í', 'ó', 'ú',
    'ý', 'Á', 'É', 'Í', 'Ó', 'Ú', 'Ý', 'à', 'è', 'ì', 'ò', 'ù', 'À', 'È', 'Ì', 'Ò', 'Ù', 'â', 'ê',
    'î', 'ô', 'û', 'Â', 'Ê', 'Î', 'Ô', 'Û', 'å', 'Å', 'ø', 'Ø', 'ã', 'ñ', 'õ', 'Ã', 'Ñ', 'Õ', 'æ',
    'Æ', 'ç', 'Ç', 'þ', 'ð', 'Þ', 'Ð', '£', 'œ', 'Œ', '¡', '¿',
];

pub fn zscii_to_unicode(code: u16) -> char {
    match code {
        13 => '\n',
        32..=126 => code as u8 as char,
        155..=251 => ZSCII_EXTRA[(code - 155) as usize],
        _ => '?',
    }
}

pub fn unicode_to_zscii(ch: char) -> Option<u16> {
    if ('\u{20}'..='\u{7e}').contains(&ch) {
        return Some(ch as u16);
    }
    if ch == '\n' {
        return Some(13);
    }
    ZSCII_EXTRA.iter().position(|&c| c == ch).map(|i| i as u16 + 155)
}

/// Alphabet triple used for decode/encode. V5+ stories may override A0/A1/A2
/// via a header-indicated custom table; callers that parse such a header
/// construct this directly instead of using `Default`.
pub struct AlphabetTable {
    pub a0: [u8; 26],
    pub a1: [u8; 26],
    pub a2: [u8; 26],
}

impl Default for AlphabetTable {
    fn default() -> Self {
        AlphabetTable {
            a0: *ALPHABET_A0,
            a1: *ALPHABET_A1,
            a2: *ALPHABET_A2,
        }
    }
}

pub struct TextCodec {
    version: u8,
    abbrev_table_addr: usize,
    alphabets: AlphabetTable,
}

impl TextCodec {
    pub fn new(version: u8, abbrev_table_addr: usize, alphabets: AlphabetTable) -> Self {
        TextCodec {
            version,
            abbrev_table_addr,
            alphabets,
        }
    }

    /// Decode a Z-string starting at `addr`. Returns `(text, bytes_consumed)`.
    pub fn decode(&self, memory: &Memory, addr: usize) -> Result<(String, usize), ZMachineError> {
        self.decode_inner(memory, addr, true)
    }

    fn decode_inner(
        &self,
        memory: &Memory,
        addr: usize,
        allow_abbreviations: bool,
    ) -> Result<(String, usize), ZMachineError> {
        let zchars = self.collect_zchars(memory, addr)?;
        let bytes_consumed = zchars.len() / 3 * 2;
        let text = self.zchars_to_string(memory, &zchars, allow_abbreviations)?;
        Ok((text, bytes_consumed))
    }

    fn collect_zchars(&self, memory: &Memory, addr: usize) -> Result<Vec<u8>, ZMachineError> {
        let mut chars = Vec::new();
        let mut offset = addr;
        loop {
            let word = memory.read_word(offset)?;
            offset += 2;
            let is_end = word & 0x8000 != 0;
            chars.push(((word >> 10) & 0x1F) as u8);
            chars.push(((word >> 5) & 0x1F) as u8);
            chars.push((word & 0x1F) as u8);
            trace!("z-word {word:#06x} -> chars {:?}, end={is_end}", &chars[chars.len() - 3..]);
            if is_end {
                break;
            }
        }
        Ok(chars)
    }

    /// `alphabet` is 0/1/2 for A0/A1/A2. `zc` is the 6..=31 code being
    /// resolved; for A2's Z-char 6, two further entries are consumed from
    /// `zchars` starting at `*i` to form the 10-bit ZSCII escape.
    fn resolve_char(&self, alphabet: u8, zc: u8, zchars: &[u8], i: &mut usize) -> Option<char> {
        if zc < 6 {
            return None;
        }
        let index = (zc - 6) as usize;
        match alphabet {
            0 => Some(self.alphabets.a0[index] as char),
            1 => Some(self.alphabets.a1[index] as char),
            2 => {
                if zc == 6 {
                    if *i + 1 >= zchars.len() {
                        trace!("ZSCII escape truncated at end of string");
                        return Some('?');
                    }
                    let high = zchars[*i];
                    let low = zchars[*i + 1];
                    *i += 2;
                    let code = ((high as u16) << 5) | low as u16;
                    Some(zscii_to_unicode(code))
                } else {
                    Some(self.alphabets.a2[index] as char)
                }
            }
            _ => None,
        }
    }

    /// Cycle the current alphabet for V1-2 shift (-lock): `zc == 2` rotates
    /// up one step, `zc == 3` rotates up two (i.e. down one).
    fn shift_cycle(current: u8, zc: u8) -> u8 {
        if zc == 2 {
            (current + 1) % 3
        } else {
            (current + 2) % 3
        }
    }

    fn zchars_to_string(
        &self,
        memory: &Memory,
        zchars: &[u8],
        allow_abbreviations: bool,
    ) -> Result<String, ZMachineError> {
        let mut result = String::new();
        let mut locked_alphabet: u8 = 0;
        let mut i = 0;

        while i < zchars.len() {
            let zc = zchars[i];
            i += 1;

            let is_abbrev_prefix = match self.version {
                1 => false,
                2 => zc == 1,
                _ => (1..=3).contains(&zc),
            };

            if is_abbrev_prefix {
                if i >= zchars.len() {
                    break;
                }
                let next = zchars[i];
                i += 1;
                if allow_abbreviations {
                    result.push_str(&self.expand_abbreviation(memory, zc, next)?);
                }
                continue;
            }

            match zc {
                0 => result.push(' '),
                1 if self.version == 1 => result.push('\n'),
                2 | 3 if self.version <= 2 => {
                    locked_alphabet = Self::shift_cycle(locked_alphabet, zc);
                }
                4 | 5 if self.version >= 3 => {
                    let target = if zc == 4 { 1 } else { 2 };
                    if i < zchars.len() {
                        let next_zc = zchars[i];
                        i += 1;
                        if next_zc == 0 {
                            result.push(' ');
                        } else if let Some(c) = self.resolve_char(target, next_zc, zchars, &mut i) {
                            result.push(c);
                        }
                    }
                }
                4 | 5 => {
                    let temp = Self::shift_cycle(locked_alphabet, zc);
                    if i < zchars.len() {
                        let next_zc = zchars[i];
                        i += 1;
                        if next_zc == 0 {
                            result.push(' ');
                        } else if let Some(c) = self.resolve_char(temp, next_zc, zchars, &mut i) {
                            result.push(c);
                        }
                    }
                }
                6..=31 => {
                    if let Some(c) = self.resolve_char(locked_alphabet, zc, zchars, &mut i) {
                        result.push(c);
                    }
                }
                _ => unreachable!("zc is a 5-bit value, always 0..=31"),
            }
        }
        Ok(result)
    }

    /// `index = 32*(prefix-1) + next`; expansion is one level deep: nested
    /// abbreviation prefixes inside the referenced string are emitted
    /// literally, never expanded again.
    fn expand_abbreviation(
        &self,
        memory: &Memory,
        prefix: u8,
        next: u8,
    ) -> Result<String, ZMachineError> {
        let index = (prefix as usize - 1) * 32 + next as usize;
        let entry_addr = self.abbrev_table_addr + 2 * index;
        let word_addr = memory.read_word(entry_addr)?;
        let byte_addr = word_addr as usize * 2;
        debug!("expanding abbreviation {index} at {byte_addr:#06x}");
        let (text, _) = self.decode_inner(memory, byte_addr, false)?;
        Ok(text)
    }

    /// Encode `text` into exactly `max_zchars(version)` Z-chars packed into
    /// 2 or 3 big-endian words, the last with its high bit set. Truncates at
    /// the boundary without back-tracking, and pads the tail with Z-char 5.
    pub fn encode(&self, text: &str) -> Vec<u16> {
        let max_zchars = if self.version <= 3 { 6 } else { 9 };
        let mut zchars: Vec<u8> = Vec::with_capacity(max_zchars);

        for ch in text.to_lowercase().chars() {
            if zchars.len() >= max_zchars {
                break;
            }
            if let Some(idx) = self.alphabets.a0.iter().position(|&c| c as char == ch) {
                zchars.push(6 + idx as u8);
            } else if let Some(idx) = self.alphabets.a1.iter().position(|&c| c as char == ch) {
                if zchars.len() + 2 > max_zchars {
                    zchars.push(4);
                    break;
                }
                zchars.push(4);
                zchars.push(6 + idx as u8);
            } else if let Some(idx) = self.alphabets.a2.iter().position(|&c| c as char == ch) {
                if zchars.len() + 2 > max_zchars {
                    zchars.push(5);
                    break;
                }
                zchars.push(5);
                zchars.push(6 + idx as u8);
            } else if let Some(code) = unicode_to_zscii(ch) {
                if zchars.len() + 4 > max_zchars {
                    zchars.push(5);
                    break;
                }
                zchars.push(5);
                zchars.push(6);
                zchars.push(((code >> 5) & 0x1F) as u8);
                zchars.push((code & 0x1F) as u8);
            }
        }

        while zchars.len() < max_zchars {
            zchars.push(5);
        }
        zchars.truncate(max_zchars);

        let mut words = Vec::with_capacity(max_zchars.div_ceil(3));
        for chunk in zchars.chunks(3) {
            let word = ((chunk[0] as u16) << 10) | ((chunk[1] as u16) << 5) | chunk[2] as u16;
            words.push(word);
        }
        if let Some(last) = words.last_mut() {
            *last |= 0x8000;
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(version: u8) -> TextCodec {
        TextCodec::new(version, 0, AlphabetTable::default())
    }

    #[test]
    fn decodes_simple_word() {
        let mut mem = Memory::new(vec![0u8; 32], 32);
        // "hello" -> codes [14, 11, 18, 18, 21] (6 + letter index)
        let word1 = (14u16 << 10) | (11 << 5) | 18;
        let word2 = ((18u16 << 10) | (21 << 5) | 5) | 0x8000;
        mem.write_word(0, word1).unwrap();
        mem.write_word(2, word2).unwrap();
        let codec = codec(3);
        let (text, len) = codec.decode(&mem, 0).unwrap();
        assert_eq!(text, "hello");
        assert_eq!(len, 4);
    }

    #[test]
    fn decodes_space_and_shift() {
        let mut mem = Memory::new(vec![0u8; 32], 32);
        // 'a', space, shift-to-A1, 'b' (uppercase 'B')
        let a = 6u8; // a
        let space = 0u8;
        let shift = 4u8;
        let b_upper = 6u8; // index 0 -> 'B' in A1
        let word1 = ((a as u16) << 10) | ((space as u16) << 5) | shift as u16;
        let word2 = ((b_upper as u16) << 10) | 0x8000;
        mem.write_word(0, word1).unwrap();
        mem.write_word(2, word2).unwrap();
        let codec = codec(3);
        let (text, _) = codec.decode(&mem, 0).unwrap();
        assert_eq!(text, "a B");
    }

    #[test]
    fn encode_then_decode_round_trips_within_alphabet() {
        let codec = codec(3);
        let words = codec.encode("abcxyz");
        let mut mem = Memory::new(vec![0u8; 16], 16);
        for (i, w) in words.iter().enumerate() {
            mem.write_word(i * 2, *w).unwrap();
        }
        let (text, _) = codec.decode(&mem, 0).unwrap();
        assert!(text.starts_with("abcxyz"));
    }

    #[test]
    fn encode_pads_and_truncates_to_max_zchars() {
        let codec = codec(3);
        let words = codec.encode("ab");
        assert_eq!(words.len(), 2);
        let codec4 = codec(5);
        let words4 = codec4.encode("abcdefghijklmnop");
        assert_eq!(words4.len(), 3);
    }

    #[test]
    fn abbreviation_expands_one_level_only() {
        let mut mem = Memory::new(vec![0u8; 64], 64);
        let abbrev_table_addr = 0x00;
        let target_word_addr = 0x10 / 2;
        mem.write_word(0, target_word_addr as u16).unwrap();
        // abbreviation string at byte 0x10: zchar 1 (abbrev prefix in V3+)
        // followed by zchar 6 ('a'), terminated. With nested abbreviations
        // disabled this must not recurse or panic.
        let word = ((1u16 << 10) | (6 << 5) | 5) | 0x8000;
        mem.write_word(0x10, word).unwrap();

        let codec = TextCodec::new(3, abbrev_table_addr, AlphabetTable::default());
        let result = codec.expand_abbreviation(&mem, 1, 0);
        assert!(result.is_ok());
    }
}
