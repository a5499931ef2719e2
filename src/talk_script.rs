//! Parsed NPC dialogue
//!
//! A TalkScript holds every line of one NPC's dialogue plus two indexes built
//! from those lines: the keyword questions the NPC answers and the labels that
//! answers can jump to.
//!
//! Line layout after parsing:
//!
//! ```text
//! 0..=4      Name, Description, Greeting, Job, Bye
//! 5..        keyword line, answer line, keyword line, answer line, ...
//! label      [StartLabelDefinition, LabelN, body...]
//!              optional default answer line, then keyword/answer pairs
//! end        [StartLabelDefinition, EndScript]
//! ```

use std::collections::BTreeMap;
use std::fmt::{Display, Error, Formatter};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::parser::parse_lines;
use crate::script::{ScriptItem, ScriptLine, TalkCommand};
use crate::word_dict::WordDict;

/// Keywords only matter up to this many characters
pub const KEYWORD_SIGNIFICANT_CHARS: usize = 4;

/// Introduces the Name line when the player asks for it
pub const DEFAULT_NAME_INTRO: &str = "My name is ";

/// Fixed line slots at the start of every script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkSlot {
    Name = 0,
    Description = 1,
    Greeting = 2,
    Job = 3,
    Bye = 4,
}

impl TalkSlot {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Index of the first keyword line
const FIRST_QUESTION_LINE: usize = TalkSlot::Bye as usize + 1;

/// Find the answer to a player's keyword
fn find_answer<'a>(
    questions: &'a IndexMap<String, ScriptLine>,
    input: &str,
) -> Option<&'a ScriptLine> {
    let input = input.trim().to_lowercase();
    if let Some(answer) = questions.get(&input) {
        return Some(answer);
    }
    let prefix: String = input.chars().take(KEYWORD_SIGNIFICANT_CHARS).collect();
    if prefix.chars().count() < KEYWORD_SIGNIFICANT_CHARS {
        return None;
    }
    questions.iter().find_map(|(keyword, answer)| {
        let key_prefix: String = keyword.chars().take(KEYWORD_SIGNIFICANT_CHARS).collect();
        (key_prefix == prefix).then_some(answer)
    })
}

/// A jump target with its own follow-up questions
#[derive(Debug, Clone, PartialEq)]
pub struct TalkLabel {
    pub number: u8,
    /// Index of the definition line in the script
    pub initial_line: usize,
    pub default_answers: Vec<ScriptLine>,
    pub questions: IndexMap<String, ScriptLine>,
}

impl TalkLabel {
    pub fn answer(&self, input: &str) -> Option<&ScriptLine> {
        find_answer(&self.questions, input)
    }

    /// True if the label expects the player to reply
    pub fn awaits_reply(&self) -> bool {
        !self.questions.is_empty() || !self.default_answers.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TalkScript {
    lines: Vec<ScriptLine>,
    questions: IndexMap<String, ScriptLine>,
    labels: BTreeMap<u8, TalkLabel>,
}

impl TalkScript {
    /// Parse an NPC's TLK segment and index it
    pub fn parse(segment: &[u8], dict: &WordDict) -> TalkScript {
        TalkScript::from_lines(parse_lines(segment, dict))
    }

    /// Index parsed lines: label headers, label jumps, then label bodies
    /// and questions
    pub fn from_lines(mut lines: Vec<ScriptLine>) -> TalkScript {
        let label_start = lines
            .iter()
            .skip(FIRST_QUESTION_LINE)
            .position(|l| l.starts_label_block())
            .map_or(lines.len(), |p| p + FIRST_QUESTION_LINE);

        let spans = locate_labels(&mut lines, label_start);
        let targets: BTreeMap<u8, usize> = spans.iter().map(|s| (s.number, s.line)).collect();
        resolve_jumps(&mut lines, &targets);

        let labels: BTreeMap<u8, TalkLabel> = spans
            .iter()
            .map(|span| (span.number, build_label(&lines, span)))
            .collect();
        let questions = index_questions(&lines, label_start);

        debug!(
            "Script indexed: {} lines, {} questions, {} labels",
            lines.len(),
            questions.len(),
            labels.len()
        );

        TalkScript {
            lines,
            questions,
            labels,
        }
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&ScriptLine> {
        self.lines.get(index)
    }

    pub fn slot(&self, slot: TalkSlot) -> Option<&ScriptLine> {
        self.lines.get(slot.index())
    }

    pub fn questions(&self) -> &IndexMap<String, ScriptLine> {
        &self.questions
    }

    /// Answer line for a keyword, matched case-insensitively
    pub fn answer(&self, input: &str) -> Option<&ScriptLine> {
        find_answer(&self.questions, input)
    }

    pub fn labels(&self) -> &BTreeMap<u8, TalkLabel> {
        &self.labels
    }

    pub fn label(&self, number: u8) -> Option<&TalkLabel> {
        self.labels.get(&number)
    }

    /// The NPC's name as plain text
    pub fn npc_name(&self) -> String {
        self.slot(TalkSlot::Name)
            .map(|l| l.plain_text())
            .unwrap_or_default()
    }
}

/// Where a label definition sits in the script
struct LabelSpan {
    number: u8,
    /// Definition line
    line: usize,
    /// One past the last line of the label's body
    end: usize,
}

/// Find label definitions and rewrite their headers into resolved form
fn locate_labels(lines: &mut [ScriptLine], label_start: usize) -> Vec<LabelSpan> {
    let mut spans = Vec::new();
    let mut index = label_start;

    while index < lines.len() {
        let line = &lines[index];
        if line.is_label_terminator() {
            debug!("Label block ends at line {}", index);
            break;
        }

        let end = lines[index + 1..]
            .iter()
            .position(|l| l.starts_label_block())
            .map_or(lines.len(), |p| p + index + 1);

        match line.get(1).and_then(|i| i.label_number()) {
            Some(number) if line.starts_label_block() => {
                lines[index].items_mut()[1] = ScriptItem::jump(number, index);
                spans.push(LabelSpan {
                    number,
                    line: index,
                    end,
                });
            }
            _ => warn!("Line {} is not a label definition: {}", index, line),
        }
        index = end;
    }

    spans
}

/// Fold every [GotoLabel, LabelN] pair into a single resolved jump
fn resolve_jumps(lines: &mut [ScriptLine], targets: &BTreeMap<u8, usize>) {
    for (index, line) in lines.iter_mut().enumerate() {
        let items = line.items_mut();
        let mut i = 0;
        while i < items.len() {
            let number = match items.get(i + 1) {
                Some(next) if items[i].command == TalkCommand::GotoLabel => next.label_number(),
                _ => None,
            };
            if let Some(number) = number {
                match targets.get(&number) {
                    Some(&target) => items[i] = ScriptItem::jump(number, target),
                    None => {
                        warn!("Line {} jumps to undefined label {}", index, number);
                        items[i].num = Some(number as u16);
                    }
                }
                items.remove(i + 1);
            }
            i += 1;
        }
    }
}

/// Split a label's body into its default answer and keyword pairs
fn build_label(lines: &[ScriptLine], span: &LabelSpan) -> TalkLabel {
    let body_len = span.end - span.line - 1;
    let mut body = lines[span.line + 1..span.end].iter();

    let mut default_answers = Vec::new();
    if body_len % 2 == 1 {
        if let Some(default) = body.next() {
            default_answers.push(default.clone());
        }
    }

    let mut questions = IndexMap::new();
    while let (Some(keys), Some(answer)) = (body.next(), body.next()) {
        for keyword in keys.keywords() {
            questions.insert(keyword, answer.clone());
        }
    }

    debug!(
        "Label {} at line {}: {} default answers, {} questions",
        span.number,
        span.line,
        default_answers.len(),
        questions.len()
    );

    TalkLabel {
        number: span.number,
        initial_line: span.line,
        default_answers,
        questions,
    }
}

/// Seed built-in questions from the fixed slots, then add keyword pairs
fn index_questions(lines: &[ScriptLine], label_start: usize) -> IndexMap<String, ScriptLine> {
    let mut questions = IndexMap::new();

    if let Some(name) = lines.get(TalkSlot::Name.index()) {
        let mut answer = ScriptLine::new();
        answer.push(ScriptItem::text(DEFAULT_NAME_INTRO));
        for item in name.items() {
            answer.push(item.clone());
        }
        questions.insert("name".to_string(), answer);
    }
    if let Some(job) = lines.get(TalkSlot::Job.index()) {
        questions.insert("job".to_string(), job.clone());
        questions.insert("work".to_string(), job.clone());
    }
    if let Some(bye) = lines.get(TalkSlot::Bye.index()) {
        let mut answer = bye.clone();
        if !answer.contains_command(TalkCommand::EndConversation) {
            answer.push(ScriptItem::command(TalkCommand::EndConversation));
        }
        questions.insert("bye".to_string(), answer);
    }

    let mut index = FIRST_QUESTION_LINE;
    while index < label_start {
        let keys = &lines[index];
        let Some(answer) = lines.get(index + 1).filter(|_| index + 1 < label_start) else {
            warn!("Keyword line {} has no answer: {}", index, keys);
            break;
        };
        for keyword in keys.keywords() {
            debug!("Question '{}' answered by line {}", keyword, index + 1);
            questions.insert(keyword, answer.clone());
        }
        index += 2;
    }

    questions
}

impl Display for TalkScript {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        writeln!(f, "Lines: {}", self.lines.len())?;
        for (i, line) in self.lines.iter().enumerate() {
            writeln!(f, "  {:3}: {}", i, line)?;
        }
        writeln!(f, "Questions: {}", self.questions.len())?;
        for (keyword, answer) in &self.questions {
            writeln!(f, "  {:>8} => {}", keyword, answer)?;
        }
        writeln!(f, "Labels: {}", self.labels.len())?;
        for label in self.labels.values() {
            writeln!(
                f,
                "  label {} at line {}, {} default answers",
                label.number,
                label.initial_line,
                label.default_answers.len()
            )?;
            for (keyword, answer) in &label.questions {
                writeln!(f, "    {:>8} => {}", keyword, answer)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "talk_script_tests.rs"]
mod tests;
