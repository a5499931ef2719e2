//! The slice of game state a conversation may read and change

use std::collections::HashMap;

use log::debug;

/// Index of an NPC in the TLK offset table
pub type NpcId = u16;

/// Map or town the encounter takes place in
pub type Location = u8;

/// Game state consumed by the conversation engine.
///
/// A running conversation owns its PartyState for the whole session, so no
/// other code can change the same state while the NPC is talking.
pub trait PartyState {
    /// True if the Avatar has told this NPC their name
    fn has_met(&self, npc: NpcId) -> bool;

    fn set_met(&mut self, location: Location, npc: NpcId);

    fn avatar_name(&self) -> String;

    /// True if another companion can join
    fn has_room(&self) -> bool;

    fn join_npc(&mut self, npc: NpcId) -> Result<(), String>;

    /// Karma shift requested by the script; ignored unless overridden
    fn adjust_karma(&mut self, _delta: i32) {}
}

/// Simple in-memory party
#[derive(Debug, Clone)]
pub struct Party {
    avatar: String,
    capacity: usize,
    members: Vec<NpcId>,
    met: HashMap<NpcId, Location>,
    karma: i32,
}

impl Party {
    pub fn new(avatar: &str, capacity: usize) -> Party {
        Party {
            avatar: avatar.to_string(),
            capacity,
            members: Vec::new(),
            met: HashMap::new(),
            karma: 0,
        }
    }

    pub fn members(&self) -> &[NpcId] {
        &self.members
    }

    /// Where the Avatar first introduced themselves to the NPC
    pub fn met_at(&self, npc: NpcId) -> Option<Location> {
        self.met.get(&npc).copied()
    }

    pub fn karma(&self) -> i32 {
        self.karma
    }
}

impl PartyState for Party {
    fn has_met(&self, npc: NpcId) -> bool {
        self.met.contains_key(&npc)
    }

    fn set_met(&mut self, location: Location, npc: NpcId) {
        debug!("Avatar met NPC {} at location {}", npc, location);
        self.met.entry(npc).or_insert(location);
    }

    fn avatar_name(&self) -> String {
        self.avatar.clone()
    }

    fn has_room(&self) -> bool {
        self.members.len() < self.capacity
    }

    fn join_npc(&mut self, npc: NpcId) -> Result<(), String> {
        if self.members.contains(&npc) {
            return Err(format!("NPC {} is already in the party", npc));
        }
        if !self.has_room() {
            return Err("The party is full".to_string());
        }
        self.members.push(npc);
        Ok(())
    }

    fn adjust_karma(&mut self, delta: i32) {
        self.karma += delta;
    }
}
