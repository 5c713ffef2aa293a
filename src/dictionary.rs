//! Dictionary (binary search over sorted encoded-word entries) and the
//! input tokenizer (spec §3, §4.8).

use crate::error::ZMachineError;
use crate::memory::Memory;
use crate::text::TextCodec;
use log::debug;
use std::cmp::Ordering;

pub struct Dictionary {
    separators: Vec<u8>,
    entry_length: u8,
    entry_count: i32,
    entries_addr: usize,
    encoded_word_bytes: usize,
}

impl Dictionary {
    pub fn new(memory: &Memory, dict_addr: usize, version: u8) -> Result<Self, ZMachineError> {
        let sep_count = memory.read_byte(dict_addr)? as usize;
        let separators = memory.read_bytes(dict_addr + 1, sep_count)?.to_vec();
        let header_addr = dict_addr + 1 + sep_count;
        let entry_length = memory.read_byte(header_addr)?;
        let entry_count_raw = memory.read_word(header_addr + 1)? as i16;
        let entries_addr = header_addr + 3;
        Ok(Dictionary {
            separators,
            entry_length,
            entry_count: entry_count_raw as i32,
            entries_addr,
            encoded_word_bytes: if version <= 3 { 4 } else { 6 },
        })
    }

    pub fn is_separator(&self, ch: u8) -> bool {
        self.separators.contains(&ch)
    }

    /// Binary search the sorted dictionary for the already-encoded word
    /// bytes (4 bytes in V1-3, 6 in V4+). Returns the entry's byte address,
    /// or 0 if not found.
    pub fn lookup(&self, memory: &Memory, encoded: &[u8]) -> Result<u16, ZMachineError> {
        debug_assert_eq!(encoded.len(), self.encoded_word_bytes);

        // A negative entry count means entries are unsorted; fall back to a
        // linear scan (rare in practice, kept for completeness).
        if self.entry_count < 0 {
            return self.lookup_linear(memory, encoded, (-self.entry_count) as usize);
        }

        let mut low: i64 = 0;
        let mut high: i64 = self.entry_count as i64 - 1;
        while low <= high {
            let mid = (low + high) / 2;
            let addr = self.entries_addr + mid as usize * self.entry_length as usize;
            let candidate = memory.read_bytes(addr, self.encoded_word_bytes)?;
            match candidate.cmp(encoded) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid - 1,
                Ordering::Equal => {
                    debug!("dictionary found entry at {addr:#06x}");
                    return Ok(addr as u16);
                }
            }
        }
        Ok(0)
    }

    fn lookup_linear(
        &self,
        memory: &Memory,
        encoded: &[u8],
        count: usize,
    ) -> Result<u16, ZMachineError> {
        for i in 0..count {
            let addr = self.entries_addr + i * self.entry_length as usize;
            let candidate = memory.read_bytes(addr, self.encoded_word_bytes)?;
            if candidate == encoded {
                return Ok(addr as u16);
            }
        }
        Ok(0)
    }
}

/// A single parsed input token.
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub length: usize,
    pub dict_addr: u16,
}

pub struct Tokenizer<'a> {
    dictionary: &'a Dictionary,
    codec: &'a TextCodec,
}

impl<'a> Tokenizer<'a> {
    pub fn new(dictionary: &'a Dictionary, codec: &'a TextCodec) -> Self {
        Tokenizer { dictionary, codec }
    }

    /// Split `input` into tokens: runs of ASCII space are skipped, each
    /// separator character is its own token, and everything else reads
    /// until the next space or separator.
    pub fn tokenize(&self, memory: &Memory, input: &str) -> Result<Vec<Token>, ZMachineError> {
        let chars: Vec<char> = input.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == ' ' {
                i += 1;
                continue;
            }
            let byte = chars[i] as u8;
            if self.dictionary.is_separator(byte) {
                tokens.push(self.make_token(memory, &chars[i..i + 1].iter().collect::<String>(), i)?);
                i += 1;
                continue;
            }
            let start = i;
            let mut end = i;
            while end < chars.len()
                && chars[end] != ' '
                && !self.dictionary.is_separator(chars[end] as u8)
            {
                end += 1;
            }
            let word: String = chars[start..end].iter().collect();
            tokens.push(self.make_token(memory, &word, start)?);
            i = end;
        }
        Ok(tokens)
    }

    fn make_token(&self, memory: &Memory, word: &str, start: usize) -> Result<Token, ZMachineError> {
        let lowered = word.to_lowercase();
        let encoded_words = self.codec.encode(&lowered);
        let mut encoded_bytes = Vec::with_capacity(encoded_words.len() * 2);
        for w in &encoded_words {
            encoded_bytes.extend_from_slice(&w.to_be_bytes());
        }
        let truncated = &encoded_bytes[..self.encoded_word_len()];
        let dict_addr = self.dictionary.lookup(memory, truncated)?;
        Ok(Token {
            text: lowered,
            start,
            length: word.len(),
            dict_addr,
        })
    }

    fn encoded_word_len(&self) -> usize {
        self.dictionary.encoded_word_bytes
    }

    /// Read the text buffer, tokenize it, and write the parse buffer in the
    /// `read`/`tokenise` opcode layout. `version` selects the text-buffer
    /// format (V1-4: null-terminated from byte 1; V5+: length-prefixed from
    /// byte 2). `skip_unknown` omits tokens whose dictionary address is 0.
    #[allow(clippy::too_many_arguments)]
    pub fn tokenize_into_memory(
        &self,
        memory: &mut Memory,
        text_buffer: usize,
        parse_buffer: usize,
        version: u8,
        skip_unknown: bool,
    ) -> Result<(), ZMachineError> {
        let text = self.read_text_buffer(memory, text_buffer, version)?;
        let tokens = self.tokenize(memory, &text)?;

        let max_tokens = memory.read_byte(parse_buffer)? as usize;
        let text_start_offset = if version >= 5 { 2 } else { 1 };

        let mut written = 0usize;
        for token in &tokens {
            if written >= max_tokens {
                break;
            }
            if skip_unknown && token.dict_addr == 0 {
                continue;
            }
            let entry_addr = parse_buffer + 2 + written * 4;
            memory.write_word(entry_addr, token.dict_addr)?;
            memory.write_byte(entry_addr + 2, token.length as u8)?;
            memory.write_byte(entry_addr + 3, (token.start + text_start_offset) as u8)?;
            written += 1;
        }
        memory.write_byte(parse_buffer + 1, written as u8)?;
        Ok(())
    }

    fn read_text_buffer(
        &self,
        memory: &Memory,
        text_buffer: usize,
        version: u8,
    ) -> Result<String, ZMachineError> {
        if version >= 5 {
            let len = memory.read_byte(text_buffer + 1)? as usize;
            let bytes = memory.read_bytes(text_buffer + 2, len)?;
            Ok(bytes.iter().map(|&b| b as char).collect())
        } else {
            let mut s = String::new();
            let mut addr = text_buffer + 1;
            loop {
                let b = memory.read_byte(addr)?;
                if b == 0 {
                    break;
                }
                s.push(b as char);
                addr += 1;
            }
            Ok(s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::AlphabetTable;

    fn build_dict(words: &[&str]) -> (Memory, usize) {
        let codec = TextCodec::new(3, 0, AlphabetTable::default());
        let mut encoded: Vec<(Vec<u8>, &str)> = words
            .iter()
            .map(|w| {
                let zwords = codec.encode(w);
                let mut bytes = Vec::new();
                for z in zwords {
                    bytes.extend_from_slice(&z.to_be_bytes());
                }
                (bytes, *w)
            })
            .collect();
        encoded.sort_by(|a, b| a.0.cmp(&b.0));

        let dict_addr = 0x00;
        let entry_len = 4 + 2; // encoded word + 2 bytes game data
        let mut bytes = vec![0u8; dict_addr + 3 + entry_len * encoded.len()];
        bytes[dict_addr] = 0; // no separators
        let header_addr = dict_addr + 1;
        bytes[header_addr] = entry_len as u8;
        bytes[header_addr + 1] = 0;
        bytes[header_addr + 2] = encoded.len() as u8;
        let entries_addr = header_addr + 3;
        for (i, (enc, _)) in encoded.iter().enumerate() {
            let addr = entries_addr + i * entry_len;
            bytes[addr..addr + 4].copy_from_slice(enc);
        }
        let mem = Memory::new(bytes, dict_addr + 3 + entry_len * encoded.len());
        (mem, dict_addr)
    }

    #[test]
    fn binary_search_matches_linear_scan() {
        let words = ["apple", "banana", "cherry", "date", "elderberry"];
        let (mem, dict_addr) = build_dict(&words);
        let dict = Dictionary::new(&mem, dict_addr, 3).unwrap();
        let codec = TextCodec::new(3, 0, AlphabetTable::default());

        for w in words {
            let zwords = codec.encode(w);
            let mut bytes = Vec::new();
            for z in zwords {
                bytes.extend_from_slice(&z.to_be_bytes());
            }
            let found = dict.lookup(&mem, &bytes).unwrap();
            assert_ne!(found, 0, "expected to find {w}");
        }

        let zwords = codec.encode("zzzzzz");
        let mut bytes = Vec::new();
        for z in zwords {
            bytes.extend_from_slice(&z.to_be_bytes());
        }
        assert_eq!(dict.lookup(&mem, &bytes).unwrap(), 0);
    }

    #[test]
    fn tokenizer_splits_on_spaces_and_separators() {
        let words = ["take", "lamp"];
        let (mem, dict_addr) = build_dict(&words);
        let dict = Dictionary::new(&mem, dict_addr, 3).unwrap();
        let codec = TextCodec::new(3, 0, AlphabetTable::default());
        let tokenizer = Tokenizer::new(&dict, &codec);

        let tokens = tokenizer.tokenize(&mem, "take lamp").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "take");
        assert_eq!(tokens[1].text, "lamp");
        assert_ne!(tokens[0].dict_addr, 0);
    }
}
