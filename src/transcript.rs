//! Host-side rendering of the output stream

use crate::script::{ScriptItem, TalkCommand};

/// Accumulates what the player has seen of a conversation
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    text: String,
    rune_mode: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Transcript::default()
    }

    /// Record one item and return the text it adds, if any
    pub fn push(&mut self, item: &ScriptItem) -> Option<String> {
        let added = match item.command {
            TalkCommand::PlainString => item.text_str().to_string(),
            TalkCommand::NewLine => "\n".to_string(),
            TalkCommand::Rune => {
                self.rune_mode = !self.rune_mode;
                return None;
            }
            TalkCommand::AskName => "\nWhat is thy name? ".to_string(),
            // KeyWait and the rest draw nothing
            _ => return None,
        };
        if added.is_empty() {
            return None;
        }
        self.text.push_str(&added);
        Some(added)
    }

    /// True while text should be drawn in runes
    pub fn rune_mode(&self) -> bool {
        self.rune_mode
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
