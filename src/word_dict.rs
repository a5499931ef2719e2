//! Compressed word dictionary
//!
//! Dialogue bytes below the letter range select whole words from a shared
//! word list. The selecting bytes are not contiguous: the original data skips
//! a handful of values, and each range below is shifted down by the number of
//! skipped values that precede it so the word indices stay dense.

use log::{debug, trace};

use crate::error::TalkError;

/// Merchant strings store word bytes with the high bit set
pub const MERCHANT_WORD_ADJUST: u8 = 0x80;

/// (first byte, last byte, index shift) for every word-selecting range
const WORD_RANGES: [(u8, u8, i16); 8] = [
    (1, 7, 0),
    (9, 27, -1),
    (29, 49, -2),
    (51, 64, -3),
    (66, 66, -4),
    (68, 69, -5),
    (71, 71, -6),
    (76, 129, -10),
];

lazy_static! {
    static ref WORD_INDEX: [Option<u8>; 256] = build_word_index();
}

/// Map every byte to its word index, or None if it selects no word
fn build_word_index() -> [Option<u8>; 256] {
    let mut table = [None; 256];
    for &(first, last, shift) in WORD_RANGES.iter() {
        for b in first..=last {
            // Byte 1 selects word 0
            let index = b as i16 + shift - 1;
            table[b as usize] = Some(index as u8);
        }
    }
    table
}

/// Dictionary index selected by a word byte
pub fn word_index(b: u8) -> Option<usize> {
    WORD_INDEX[b as usize].map(|i| i as usize)
}

/// True if the byte falls in one of the word-selecting ranges
pub fn is_word_byte(b: u8) -> bool {
    WORD_INDEX[b as usize].is_some()
}

#[derive(Debug, Clone, Default)]
pub struct WordDict {
    words: Vec<String>,
}

impl WordDict {
    pub fn new(words: Vec<String>) -> WordDict {
        debug!("Word dictionary with {} words", words.len());
        WordDict { words }
    }

    /// Build from a blob of NUL-terminated words
    pub fn from_nul_separated(bytes: &[u8]) -> WordDict {
        let mut chunks: Vec<&[u8]> = bytes.split(|b| *b == 0).collect();
        // A trailing terminator leaves one empty chunk behind
        if chunks.last().is_some_and(|c| c.is_empty()) {
            chunks.pop();
        }
        let words = chunks
            .into_iter()
            .map(|c| c.iter().map(|b| *b as char).collect())
            .collect();
        WordDict::new(words)
    }

    /// Build from text holding one word per line
    pub fn from_lines(text: &str) -> WordDict {
        let words = text
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect();
        WordDict::new(words)
    }

    pub fn is_word_byte(&self, b: u8) -> bool {
        is_word_byte(b)
    }

    /// The word selected by a byte
    pub fn word(&self, b: u8) -> Result<&str, TalkError> {
        let index = word_index(b).ok_or(TalkError::UnmappedWordByte(b))?;
        self.words
            .get(index)
            .map(|w| w.as_str())
            .ok_or(TalkError::WordIndexOutOfRange(b, index, self.words.len()))
    }

    /// Expand a merchant string, where bytes with the high bit set select
    /// words. Words are separated from surrounding text by single spaces.
    pub fn replace_merchant_string(&self, raw: &[u8]) -> Result<String, TalkError> {
        let mut result = String::new();
        let mut after_word = false;

        for &b in raw {
            if b & 0x80 != 0 {
                let word = self.word(b.wrapping_add(MERCHANT_WORD_ADJUST))?;
                if !result.is_empty() && !result.ends_with(' ') {
                    result.push(' ');
                }
                trace!("Merchant byte {:#04x} -> '{}'", b, word);
                result.push_str(word);
                after_word = true;
            } else {
                if after_word && b != b' ' {
                    result.push(' ');
                }
                result.push(b as char);
                after_word = false;
            }
        }

        Ok(result)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
#[path = "word_dict_tests.rs"]
mod tests;
