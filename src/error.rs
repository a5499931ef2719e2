// Dialogue engine error handling

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TalkError {
    // TLK file errors
    HeaderTooSmall(usize),                  // buffer length
    TableTruncated(usize, usize),           // entry count, buffer length
    SegmentOutOfBounds(u16, usize, usize, usize), // npc, start, end, buffer length

    // Dictionary errors
    UnmappedWordByte(u8),
    WordIndexOutOfRange(u8, usize, usize), // byte, index, word count

    // Session errors
    AlreadyStarted,
    Cancelled,
    Disconnected,
    SessionPanicked,

    // Load errors
    ConfigError(String),
    IOError(String),
}

impl fmt::Display for TalkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TalkError::HeaderTooSmall(len) => {
                write!(f, "TLK buffer of {} bytes is too small for its header", len)
            }
            TalkError::TableTruncated(count, len) => {
                write!(
                    f,
                    "TLK offset table of {} entries does not fit in {} bytes",
                    count, len
                )
            }
            TalkError::SegmentOutOfBounds(npc, start, end, len) => {
                write!(
                    f,
                    "Segment for NPC {} spans {:#06x}..{:#06x}, outside buffer of {} bytes",
                    npc, start, end, len
                )
            }
            TalkError::UnmappedWordByte(b) => {
                write!(f, "Byte {:#04x} does not select a dictionary word", b)
            }
            TalkError::WordIndexOutOfRange(b, index, count) => {
                write!(
                    f,
                    "Byte {:#04x} selects word {} but the dictionary holds {} words",
                    b, index, count
                )
            }
            TalkError::AlreadyStarted => write!(f, "Conversation already started"),
            TalkError::Cancelled => write!(f, "Conversation cancelled"),
            TalkError::Disconnected => write!(f, "Conversation channel disconnected"),
            TalkError::SessionPanicked => write!(f, "Conversation thread panicked"),
            TalkError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            TalkError::IOError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for TalkError {}

impl From<std::io::Error> for TalkError {
    fn from(e: std::io::Error) -> Self {
        TalkError::IOError(e.to_string())
    }
}

impl From<toml::de::Error> for TalkError {
    fn from(e: toml::de::Error) -> Self {
        TalkError::ConfigError(e.to_string())
    }
}
