//! Script items and lines
//!
//! A parsed dialogue line is a flat list of items. Each item is an opcode tag
//! with optional payloads: literal text, a label number (or raw byte for
//! opcodes the engine does not model), and a resolved target line.

use std::fmt::{Display, Error, Formatter};

/// Number of distinct label markers
pub const TOTAL_LABELS: u8 = 10;

/// Opcode tags found in dialogue data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TalkCommand {
    /// Literal text, carried in the item's text payload
    PlainString,
    AvatarsName,
    EndConversation,
    Pause,
    JoinParty,
    Gold,
    Change,
    /// Separates alternative keywords on a question line
    Or,
    AskName,
    KarmaPlusOne,
    KarmaMinusOne,
    CallGuards,
    IfElseKnowsName,
    NewLine,
    Rune,
    KeyWait,
    StartLabelDefinition,
    Label1,
    Label2,
    Label3,
    Label4,
    Label5,
    Label6,
    Label7,
    Label8,
    Label9,
    Label10,
    EndScript,
    StartNewSection,
    GotoLabel,
    /// Label definition header, or a resolved jump once the script is indexed
    DefineLabel,
    DoNothingSection,
    /// Opcode passed through untouched, raw byte in the item's num payload
    Unknown,
}

impl TalkCommand {
    /// Decode a control opcode byte
    pub fn from_byte(b: u8) -> Option<TalkCommand> {
        let command = match b {
            0x81 => TalkCommand::AvatarsName,
            0x82 => TalkCommand::EndConversation,
            0x83 => TalkCommand::Pause,
            0x84 => TalkCommand::JoinParty,
            0x85 => TalkCommand::Gold,
            0x86 => TalkCommand::Change,
            0x87 => TalkCommand::Or,
            0x88 => TalkCommand::AskName,
            0x89 => TalkCommand::KarmaPlusOne,
            0x8A => TalkCommand::KarmaMinusOne,
            0x8B => TalkCommand::CallGuards,
            0x8C => TalkCommand::IfElseKnowsName,
            0x8D => TalkCommand::NewLine,
            0x8E => TalkCommand::Rune,
            0x8F => TalkCommand::KeyWait,
            0x90 => TalkCommand::StartLabelDefinition,
            0x91 => TalkCommand::Label1,
            0x92 => TalkCommand::Label2,
            0x93 => TalkCommand::Label3,
            0x94 => TalkCommand::Label4,
            0x95 => TalkCommand::Label5,
            0x96 => TalkCommand::Label6,
            0x97 => TalkCommand::Label7,
            0x98 => TalkCommand::Label8,
            0x99 => TalkCommand::Label9,
            0x9A => TalkCommand::Label10,
            0x9E => TalkCommand::EndScript,
            0xA2 => TalkCommand::StartNewSection,
            0xFD => TalkCommand::GotoLabel,
            0xFE => TalkCommand::DefineLabel,
            0xFF => TalkCommand::DoNothingSection,
            _ => return None,
        };
        Some(command)
    }

    /// The opcode byte, if the command has one
    pub fn as_byte(&self) -> Option<u8> {
        let b = match self {
            TalkCommand::PlainString | TalkCommand::Unknown => return None,
            TalkCommand::AvatarsName => 0x81,
            TalkCommand::EndConversation => 0x82,
            TalkCommand::Pause => 0x83,
            TalkCommand::JoinParty => 0x84,
            TalkCommand::Gold => 0x85,
            TalkCommand::Change => 0x86,
            TalkCommand::Or => 0x87,
            TalkCommand::AskName => 0x88,
            TalkCommand::KarmaPlusOne => 0x89,
            TalkCommand::KarmaMinusOne => 0x8A,
            TalkCommand::CallGuards => 0x8B,
            TalkCommand::IfElseKnowsName => 0x8C,
            TalkCommand::NewLine => 0x8D,
            TalkCommand::Rune => 0x8E,
            TalkCommand::KeyWait => 0x8F,
            TalkCommand::StartLabelDefinition => 0x90,
            TalkCommand::Label1 => 0x91,
            TalkCommand::Label2 => 0x92,
            TalkCommand::Label3 => 0x93,
            TalkCommand::Label4 => 0x94,
            TalkCommand::Label5 => 0x95,
            TalkCommand::Label6 => 0x96,
            TalkCommand::Label7 => 0x97,
            TalkCommand::Label8 => 0x98,
            TalkCommand::Label9 => 0x99,
            TalkCommand::Label10 => 0x9A,
            TalkCommand::EndScript => 0x9E,
            TalkCommand::StartNewSection => 0xA2,
            TalkCommand::GotoLabel => 0xFD,
            TalkCommand::DefineLabel => 0xFE,
            TalkCommand::DoNothingSection => 0xFF,
        };
        Some(b)
    }

    /// Label number (1-based) for the Label1..Label10 markers
    pub fn label_number(&self) -> Option<u8> {
        match self.as_byte() {
            Some(b @ 0x91..=0x9A) => Some(b - 0x90),
            _ => None,
        }
    }

    /// Markers consumed while splitting and indexing; never executed
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TalkCommand::Or
                | TalkCommand::StartNewSection
                | TalkCommand::DoNothingSection
                | TalkCommand::StartLabelDefinition
                | TalkCommand::EndScript
        )
    }
}

/// A single element of a script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptItem {
    pub command: TalkCommand,
    pub text: Option<String>,
    /// Label number for label markers and jumps, raw byte for Unknown
    pub num: Option<u16>,
    /// Target line index of a resolved label jump
    pub line: Option<usize>,
}

impl ScriptItem {
    pub fn command(command: TalkCommand) -> ScriptItem {
        ScriptItem {
            command,
            text: None,
            num: None,
            line: None,
        }
    }

    pub fn text<S: Into<String>>(text: S) -> ScriptItem {
        ScriptItem {
            command: TalkCommand::PlainString,
            text: Some(text.into()),
            num: None,
            line: None,
        }
    }

    /// A numbered label marker, carrying its number as literal text
    pub fn label(command: TalkCommand) -> ScriptItem {
        let number = command.label_number().unwrap_or(0);
        ScriptItem {
            command,
            text: Some(number.to_string()),
            num: Some(number as u16),
            line: None,
        }
    }

    /// A label jump resolved to its target line
    pub fn jump(label: u8, line: usize) -> ScriptItem {
        ScriptItem {
            command: TalkCommand::DefineLabel,
            text: None,
            num: Some(label as u16),
            line: Some(line),
        }
    }

    pub fn unknown(b: u8) -> ScriptItem {
        ScriptItem {
            command: TalkCommand::Unknown,
            text: None,
            num: Some(b as u16),
            line: None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.command == TalkCommand::PlainString
    }

    pub fn text_str(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn label_number(&self) -> Option<u8> {
        self.command.label_number()
    }
}

impl Display for ScriptItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self.command {
            TalkCommand::PlainString => write!(f, "\"{}\"", self.text_str()),
            TalkCommand::Unknown => write!(f, "<{:#04x}>", self.num.unwrap_or(0)),
            TalkCommand::DefineLabel | TalkCommand::GotoLabel => {
                write!(f, "<{:?}", self.command)?;
                if let Some(n) = self.num {
                    write!(f, " {}", n)?;
                }
                if let Some(line) = self.line {
                    write!(f, " -> line {}", line)?;
                }
                write!(f, ">")
            }
            command => write!(f, "<{:?}>", command),
        }
    }
}

/// An ordered list of script items
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptLine {
    items: Vec<ScriptItem>,
}

impl ScriptLine {
    pub fn new() -> ScriptLine {
        ScriptLine { items: Vec::new() }
    }

    pub fn push(&mut self, item: ScriptItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[ScriptItem] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<ScriptItem> {
        &mut self.items
    }

    pub fn get(&self, index: usize) -> Option<&ScriptItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_command(&self, command: TalkCommand) -> bool {
        self.items.iter().any(|i| i.command == command)
    }

    pub fn mentions_avatar_name(&self) -> bool {
        self.contains_command(TalkCommand::AvatarsName)
    }

    /// Concatenated literal text of the line
    pub fn plain_text(&self) -> String {
        self.items
            .iter()
            .filter(|i| i.is_text())
            .map(|i| i.text_str())
            .collect()
    }

    /// Lowercased keywords of a question line; alternatives are split by Or
    pub fn keywords(&self) -> Vec<String> {
        let mut keywords = Vec::new();
        let mut current = String::new();
        for item in &self.items {
            match item.command {
                TalkCommand::PlainString => current.push_str(item.text_str()),
                TalkCommand::Or => keywords.push(std::mem::take(&mut current)),
                _ => {}
            }
        }
        keywords.push(current);
        keywords
            .into_iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }

    fn starts_with(&self, first: TalkCommand, second: TalkCommand) -> bool {
        matches!(
            (self.items.first(), self.items.get(1)),
            (Some(a), Some(b)) if a.command == first && b.command == second
        )
    }

    pub fn starts_label_block(&self) -> bool {
        self.items
            .first()
            .is_some_and(|i| i.command == TalkCommand::StartLabelDefinition)
    }

    /// True for the line that closes the label block
    pub fn is_label_terminator(&self) -> bool {
        self.starts_with(TalkCommand::StartLabelDefinition, TalkCommand::EndScript)
    }

    /// (label number, line index) if the line is an indexed label definition
    pub fn label_definition(&self) -> Option<(u8, usize)> {
        if !self.starts_with(TalkCommand::StartLabelDefinition, TalkCommand::DefineLabel) {
            return None;
        }
        let item = &self.items[1];
        match (item.num, item.line) {
            (Some(n), Some(line)) => Some((n as u8, line)),
            _ => None,
        }
    }

    /// The playable part of a label definition line
    pub fn label_body(&self) -> ScriptLine {
        let skip = if self.label_definition().is_some() { 2 } else { 0 };
        ScriptLine {
            items: self.items[skip..].to_vec(),
        }
    }

    /// Partition the line into branch sections.
    ///
    /// StartNewSection opens a new section and is dropped. DoNothingSection
    /// stands for an empty branch. IfElseKnowsName always sits alone in its
    /// own section so the two sections after it form its branch pair.
    pub fn split_into_sections(&self) -> Vec<ScriptLine> {
        let mut sections: Vec<ScriptLine> = Vec::new();
        let mut force_split = true;

        for item in &self.items {
            match item.command {
                TalkCommand::StartNewSection => {
                    force_split = true;
                    continue;
                }
                TalkCommand::DoNothingSection => {
                    sections.push(ScriptLine::new());
                    force_split = true;
                    continue;
                }
                TalkCommand::IfElseKnowsName => {
                    sections.push(ScriptLine {
                        items: vec![item.clone()],
                    });
                    force_split = true;
                    continue;
                }
                _ => {}
            }

            if force_split {
                sections.push(ScriptLine::new());
                force_split = false;
            }
            if let Some(section) = sections.last_mut() {
                section.push(item.clone());
            }
        }

        sections
    }
}

impl From<Vec<ScriptItem>> for ScriptLine {
    fn from(items: Vec<ScriptItem>) -> ScriptLine {
        ScriptLine { items }
    }
}

impl Display for ScriptLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}
