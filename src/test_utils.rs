// Test utilities for building dialogue bytes without real game data
use crate::parser::{is_letter_byte, END_OF_LINE, LETTER_OFFSET};
use crate::script::TalkCommand;
use crate::word_dict::WordDict;

/// Byte-level encoder for TLK dialogue segments
pub struct ScriptBytes {
    pub bytes: Vec<u8>,
}

impl ScriptBytes {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Append text using the offset letter encoding
    pub fn text(mut self, text: &str) -> Self {
        for c in text.chars() {
            let b = (c as u32 as u8).wrapping_add(LETTER_OFFSET);
            assert!(is_letter_byte(b), "'{}' has no letter encoding", c);
            self.bytes.push(b);
        }
        self
    }

    pub fn op(mut self, command: TalkCommand) -> Self {
        let b = command
            .as_byte()
            .unwrap_or_else(|| panic!("{:?} has no opcode byte", command));
        self.bytes.push(b);
        self
    }

    pub fn byte(mut self, b: u8) -> Self {
        self.bytes.push(b);
        self
    }

    /// Terminate the current line
    pub fn end(mut self) -> Self {
        self.bytes.push(END_OF_LINE);
        self
    }

    /// Text followed by a line terminator
    pub fn line(self, text: &str) -> Self {
        self.text(text).end()
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// A short dictionary: byte 1 = "thee", byte 2 = "thou", byte 3 = "art"
pub fn small_dict() -> WordDict {
    WordDict::new(vec![
        "thee".to_string(),
        "thou".to_string(),
        "art".to_string(),
    ])
}

/// Lay out a TLK file from (npc, segment) pairs
pub fn tlk_file(npcs: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&(npcs.len() as u16).to_le_bytes());
    let mut offset = 2 + npcs.len() * 4;
    for (npc, segment) in npcs {
        data.extend_from_slice(&npc.to_le_bytes());
        data.extend_from_slice(&(offset as u16).to_le_bytes());
        offset += segment.len();
    }
    for (_, segment) in npcs {
        data.extend_from_slice(segment);
    }
    data
}
