//! Participant entities.

use serde::Serialize;

/// A participant as known to the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantRecord {
    /// Protocol-assigned client id (`clid`), unique within one session
    pub id: String,
    pub nickname: String,
    pub is_talking: bool,
    pub is_whispering: bool,
    /// Unix timestamp of the last list refresh or talk event (milliseconds)
    pub last_activity: i64,
    pub channel_id: Option<String>,
}

impl ParticipantRecord {
    pub fn new(row: ParticipantRow, now: i64) -> Self {
        Self {
            id: row.id,
            nickname: row.nickname,
            is_talking: false,
            is_whispering: false,
            last_activity: now,
            channel_id: row.channel_id,
        }
    }

    /// Whether the last activity is still inside the recency window.
    pub fn is_fresh(&self, now: i64, talk_timeout_millis: i64) -> bool {
        self.last_activity.saturating_add(talk_timeout_millis) > now
    }
}

/// One row of a full participant list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRow {
    pub id: String,
    pub nickname: String,
    pub channel_id: Option<String>,
}

/// Result of talker selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Talker {
    pub nickname: String,
    pub talking: bool,
    pub whispering: bool,
}

impl Talker {
    /// Nobody is talking.
    pub fn nobody() -> Self {
        Self::default()
    }

    pub fn is_nobody(&self) -> bool {
        !self.talking
    }
}
