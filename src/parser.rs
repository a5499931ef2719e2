// Dialogue byte parser
// Turns one NPC's raw TLK segment into script lines in a single pass

use log::{debug, trace};

use crate::script::{ScriptItem, ScriptLine, TalkCommand};
use crate::word_dict::WordDict;

/// Terminates every script line
pub const END_OF_LINE: u8 = 0x00;

/// Letters are stored with the high bit set
pub const LETTER_OFFSET: u8 = 0x80;

/// True for bytes holding an offset letter, digit or punctuation mark
pub fn is_letter_byte(b: u8) -> bool {
    matches!(b, 0xA0..=0xA1 | 0xA5..=0xDA | 0xE1..=0xFA)
}

/// Punctuation that attaches to the word before it
fn is_closing_punctuation(c: char) -> bool {
    matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '\'' | '"' | ')')
}

/// Parser state for a single segment
struct LineBuilder {
    lines: Vec<ScriptLine>,
    current: ScriptLine,
    text: String,
    after_word: bool,
}

impl LineBuilder {
    fn new() -> Self {
        LineBuilder {
            lines: Vec::new(),
            current: ScriptLine::new(),
            text: String::new(),
            after_word: false,
        }
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.current.push(ScriptItem::text(text));
        }
        self.after_word = false;
    }

    fn push_item(&mut self, item: ScriptItem) {
        self.flush_text();
        self.current.push(item);
    }

    fn push_char(&mut self, c: char) {
        // Words carry no spacing of their own
        if self.after_word && c != ' ' && !is_closing_punctuation(c) {
            self.text.push(' ');
        }
        self.text.push(c);
        self.after_word = false;
    }

    fn push_word(&mut self, word: &str) {
        if !self.text.is_empty() && !self.text.ends_with(' ') {
            self.text.push(' ');
        }
        self.text.push_str(word);
        self.after_word = true;
    }

    fn end_line(&mut self) {
        self.flush_text();
        if !self.current.is_empty() {
            let line = std::mem::take(&mut self.current);
            debug!("Line {}: {}", self.lines.len(), line);
            self.lines.push(line);
        }
    }

    fn finish(mut self) -> Vec<ScriptLine> {
        self.end_line();
        self.lines
    }
}

/// Parse an NPC's dialogue bytes into lines.
///
/// Letters win over opcodes, opcodes over dictionary words. Word lookups
/// that fail, and any byte nothing else claims, pass through as Unknown
/// items so newer data never stops the parse.
pub fn parse_lines(segment: &[u8], dict: &WordDict) -> Vec<ScriptLine> {
    let mut builder = LineBuilder::new();

    for (pos, &b) in segment.iter().enumerate() {
        if b == END_OF_LINE {
            builder.end_line();
            continue;
        }

        if is_letter_byte(b) {
            builder.push_char((b - LETTER_OFFSET) as char);
            continue;
        }

        if let Some(command) = TalkCommand::from_byte(b) {
            trace!("{:#06x}: opcode {:?}", pos, command);
            let item = match command.label_number() {
                Some(_) => ScriptItem::label(command),
                None => ScriptItem::command(command),
            };
            builder.push_item(item);
            continue;
        }

        if dict.is_word_byte(b) {
            match dict.word(b) {
                Ok(word) => {
                    trace!("{:#06x}: word '{}'", pos, word);
                    builder.push_word(word);
                    continue;
                }
                Err(e) => debug!("{:#06x}: {}, passing byte through", pos, e),
            }
        }

        trace!("{:#06x}: unknown byte {:#04x}", pos, b);
        builder.push_item(ScriptItem::unknown(b));
    }

    builder.finish()
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
