//! Notification lines pushed by the plug-in without a preceding command.

use crate::{domain::QueryError, infrastructure::codec::Record};

/// Every notification name starts with this prefix.
pub const NOTIFY_PREFIX: &str = "notify";

const TALK_STATUS: &str = "notifytalkstatuschange";
const CLIENT_MOVED: &str = "notifyclientmoved";
const CLIENT_ENTERED: &str = "notifycliententerview";
const CLIENT_LEFT: &str = "notifyclientleftview";
const CLIENT_UPDATED: &str = "notifyclientupdated";
const HANDLER_CHANGED: &str = "notifycurrentserverconnectionchanged";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    TalkStatus {
        clid: String,
        talking: bool,
        whispering: bool,
    },
    /// `(clid, target channel)` for every moved participant.
    ClientMoved(Vec<(String, String)>),
    ClientEntered,
    ClientLeft(Vec<String>),
    ClientUpdated,
    /// The user switched to another server tab.
    HandlerChanged,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// `schandlerid` the event belongs to, when the plug-in sent one
    pub handler: Option<String>,
    pub kind: NotificationKind,
}

/// Whether a parsed line is a notification.
pub fn is_notification(records: &[Record]) -> bool {
    records
        .first()
        .and_then(Record::first_key)
        .is_some_and(|key| key.starts_with(NOTIFY_PREFIX))
}

impl Notification {
    /// Interpret a notification line.
    ///
    /// Records after the first carry only per-participant keys (e.g. a
    /// multi-client move lists one `clid` per record); shared keys are taken
    /// from the first record.
    pub fn from_records(records: &[Record]) -> Result<Self, QueryError> {
        let first = records
            .first()
            .ok_or_else(|| QueryError::Malformed("empty notification".to_string()))?;
        let name = first.first_key().unwrap_or_default();
        let handler = first.get("schandlerid").map(str::to_string);

        let kind = match name {
            TALK_STATUS => NotificationKind::TalkStatus {
                clid: required(first, "clid", name)?.to_string(),
                talking: flag(required(first, "status", name)?, "status")?,
                whispering: match first.get("isreceivedwhisper") {
                    Some(value) => flag(value, "isreceivedwhisper")?,
                    None => false,
                },
            },
            CLIENT_MOVED => {
                let channel = required(first, "ctid", name)?;
                let moves = records
                    .iter()
                    .map(|record| -> Result<(String, String), QueryError> {
                        let clid = required(record, "clid", name)?;
                        let target = record.get("ctid").unwrap_or(channel);
                        Ok((clid.to_string(), target.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                NotificationKind::ClientMoved(moves)
            }
            CLIENT_ENTERED => NotificationKind::ClientEntered,
            CLIENT_LEFT => NotificationKind::ClientLeft(
                records
                    .iter()
                    .filter_map(|record| record.get("clid"))
                    .map(str::to_string)
                    .collect(),
            ),
            CLIENT_UPDATED => NotificationKind::ClientUpdated,
            HANDLER_CHANGED => NotificationKind::HandlerChanged,
            other => NotificationKind::Other(other.to_string()),
        };

        Ok(Notification { handler, kind })
    }
}

fn required<'a>(record: &'a Record, key: &str, name: &str) -> Result<&'a str, QueryError> {
    record
        .get(key)
        .ok_or_else(|| QueryError::Malformed(format!("{} without {}", name, key)))
}

fn flag(value: &str, key: &str) -> Result<bool, QueryError> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(QueryError::Malformed(format!(
            "{} is not a flag: {:?}",
            key, other
        ))),
    }
}
