//! Roster aggregate and talker selection.
//!
//! Entries are created by full list refreshes and pruned when a later
//! refresh no longer contains them. Talk state survives refreshes.

use std::collections::HashMap;

use super::participant::{ParticipantRecord, ParticipantRow, Talker};

/// Default recency window for talk flags (milliseconds).
pub const DEFAULT_TALK_TIMEOUT_MILLIS: i64 = 60_000;

#[derive(Debug, Clone, Default)]
pub struct Roster {
    participants: HashMap<String, ParticipantRecord>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roster with a full list, keeping talk flags of known ids.
    ///
    /// Every listed participant is stamped with `now`; ids missing from
    /// `rows` are removed.
    pub fn refresh(&mut self, rows: Vec<ParticipantRow>, now: i64) {
        let mut previous = std::mem::take(&mut self.participants);
        for row in rows {
            let record = match previous.remove(&row.id) {
                Some(mut existing) => {
                    existing.nickname = row.nickname;
                    existing.channel_id = row.channel_id;
                    existing.last_activity = now;
                    existing
                }
                None => ParticipantRecord::new(row, now),
            };
            self.participants.insert(record.id.clone(), record);
        }
    }

    /// Apply a talk-status change. Returns `false` for unknown ids.
    pub fn apply_talk(&mut self, id: &str, talking: bool, whispering: bool, now: i64) -> bool {
        match self.participants.get_mut(id) {
            Some(record) => {
                record.is_talking = talking;
                record.is_whispering = whispering;
                record.last_activity = now;
                true
            }
            None => false,
        }
    }

    /// Apply a channel move. Returns `false` for unknown ids.
    pub fn apply_move(&mut self, id: &str, channel_id: &str) -> bool {
        match self.participants.get_mut(id) {
            Some(record) => {
                record.channel_id = Some(channel_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Clear talk flags of a participant that left; the entry itself stays
    /// until the next full refresh drops it.
    pub fn mark_silent(&mut self, id: &str) -> bool {
        match self.participants.get_mut(id) {
            Some(record) => {
                record.is_talking = false;
                record.is_whispering = false;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&ParticipantRecord> {
        self.participants.get(id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participants(&self) -> impl Iterator<Item = &ParticipantRecord> {
        self.participants.values()
    }

    /// Pick the participant currently talking.
    ///
    /// A fresh whisperer who is also talking always wins over a fresh plain
    /// talker; within each pass the first match is taken.
    pub fn select_talker(&self, now: i64, talk_timeout_millis: i64) -> Talker {
        let fresh = |r: &&ParticipantRecord| r.is_fresh(now, talk_timeout_millis);

        if let Some(record) = self
            .participants
            .values()
            .filter(fresh)
            .find(|r| r.is_talking && r.is_whispering)
        {
            return Talker {
                nickname: record.nickname.clone(),
                talking: true,
                whispering: true,
            };
        }

        if let Some(record) = self.participants.values().filter(fresh).find(|r| r.is_talking) {
            return Talker {
                nickname: record.nickname.clone(),
                talking: true,
                whispering: false,
            };
        }

        Talker::nobody()
    }
}
