use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::TalkError;

/// Size of the entry count that opens the file
const COUNT_SIZE: usize = 2;

/// Size of one (npc index, file offset) entry
const ENTRY_SIZE: usize = 4;

/// Read a little-endian u16 at the given offset
fn get_le_u16(bytes: &[u8], offset: usize) -> u16 {
    (bytes[offset] as u16) | ((bytes[offset + 1] as u16) << 8)
}

/// One row of the offset table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TalkEntry {
    pub npc: u16,
    pub offset: u16,
}

/// TalkFile is a borrowed view over a TLK resource: one byte segment per NPC,
/// in offset table order. Segments point into the original buffer.
#[derive(Debug)]
pub struct TalkFile<'a> {
    entries: Vec<TalkEntry>,
    segments: IndexMap<u16, &'a [u8]>,
}

impl<'a> TalkFile<'a> {
    /// Parse the offset table and slice out every NPC's segment
    pub fn parse(data: &'a [u8]) -> Result<TalkFile<'a>, TalkError> {
        if data.len() < COUNT_SIZE {
            return Err(TalkError::HeaderTooSmall(data.len()));
        }

        let count = get_le_u16(data, 0) as usize;
        let table_end = COUNT_SIZE + count * ENTRY_SIZE;
        if data.len() < table_end {
            return Err(TalkError::TableTruncated(count, data.len()));
        }

        let entries: Vec<TalkEntry> = (0..count)
            .map(|i| {
                let pos = COUNT_SIZE + i * ENTRY_SIZE;
                TalkEntry {
                    npc: get_le_u16(data, pos),
                    offset: get_le_u16(data, pos + 2),
                }
            })
            .collect();

        debug!(
            "TLK file: {} entries, table ends at {:#06x}, {} bytes total",
            count,
            table_end,
            data.len()
        );

        let mut segments = IndexMap::with_capacity(count);
        for (i, entry) in entries.iter().enumerate() {
            let start = entry.offset as usize;
            // Table order, not sorted order, bounds each segment
            let end = match entries.get(i + 1) {
                Some(next) => next.offset as usize,
                None => data.len(),
            };

            if start > end || start >= data.len() || end > data.len() {
                return Err(TalkError::SegmentOutOfBounds(
                    entry.npc,
                    start,
                    end,
                    data.len(),
                ));
            }

            if segments.insert(entry.npc, &data[start..end]).is_some() {
                warn!(
                    "NPC {} appears more than once in the TLK table, keeping entry {}",
                    entry.npc, i
                );
            }
        }

        Ok(TalkFile { entries, segments })
    }

    /// The raw dialogue bytes for one NPC
    pub fn segment(&self, npc: u16) -> Option<&'a [u8]> {
        self.segments.get(&npc).copied()
    }

    pub fn entries(&self) -> &[TalkEntry] {
        &self.entries
    }

    /// Iterate (npc, segment) pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (u16, &'a [u8])> + '_ {
        self.segments.iter().map(|(npc, seg)| (*npc, *seg))
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl<'a> Display for TalkFile<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        writeln!(f, "Number of NPC entries: {}", self.entries.len())?;
        for entry in &self.entries {
            let len = self.segments.get(&entry.npc).map_or(0, |s| s.len());
            writeln!(
                f,
                "  NPC {:3}  offset {:#06x}  {:5} bytes",
                entry.npc, entry.offset, len
            )?;
        }
        Ok(())
    }
}
