#![crate_name = "palaver"]

#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod conversation;
pub mod error;
pub mod parser;
pub mod party;
pub mod script;
pub mod talk_script;
pub mod tlk;
pub mod transcript;
pub mod word_dict;

#[cfg(test)]
mod test_utils;

pub use config::EngineConfig;
pub use conversation::{Conversation, NpcRef};
pub use error::TalkError;
pub use party::{Party, PartyState};
pub use script::{ScriptItem, ScriptLine, TalkCommand};
pub use talk_script::{TalkScript, TalkSlot};
pub use tlk::TalkFile;
pub use word_dict::WordDict;
