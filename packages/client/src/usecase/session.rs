//! Request/response driver for one physical connection.
//!
//! The protocol has no request ids: every command is answered by zero or
//! more data lines and exactly one terminal `error` line, in command order.
//! Notifications can be interleaved anywhere and are applied to the roster
//! as soon as they are read.
//!
//! A command that is not answered within one poll interval stays in flight.
//! It is not written again while it is owed; its reply is kept until the
//! same command is executed again, so a slow plug-in still completes every
//! request.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use kikoe_shared::time::Clock;

use crate::{
    domain::{
        DisconnectReason, IdentityKey, LineTransport, QueryError, ReplyStatus, RosterRepository,
    },
    infrastructure::codec::{Command, Record, parse_line},
};

use super::notification::{Notification, NotificationKind, is_notification};

/// First line sent by the plug-in after accepting a connection.
pub const GREETING_BANNER: &str = "TS3 Client";

/// Key of the terminal status record.
const STATUS_KEY: &str = "error";

/// Outcome of a command whose transport round-trip did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Terminal status `0` arrived; data records in arrival order.
    Complete(Vec<Record>),
    /// No terminal status within the poll interval. The reply is kept and
    /// returned when the same command is executed again.
    Pending,
}

/// Command written to the plug-in whose terminal line has not arrived yet.
#[derive(Debug)]
struct InFlight {
    line: String,
    rows: Vec<Record>,
}

/// Outcome of a command once its terminal line arrived.
#[derive(Debug)]
enum Settled {
    Complete(Vec<Record>),
    Failed { id: u32, message: String },
}

impl Settled {
    fn into_reply(self) -> Result<Reply, QueryError> {
        match self {
            Settled::Complete(rows) => Ok(Reply::Complete(rows)),
            Settled::Failed { id, message } => Err(QueryError::Command { id, message }),
        }
    }
}

/// Per-connection state that is rebuilt on every reconnect.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub events_registered: bool,
    pub refresh_roster_pending: bool,
    /// Unix timestamp of the last keepalive (milliseconds)
    pub last_keepalive: i64,
    /// Identity last pushed as nickname; `None` until the first sync
    pub last_pushed: Option<IdentityKey>,
    /// Server handler selected in the plug-in, from the greeting
    pub selected_handler: Option<String>,
}

impl ConnectionContext {
    fn new(now: i64) -> Self {
        Self {
            events_registered: false,
            refresh_roster_pending: true,
            last_keepalive: now,
            last_pushed: None,
            selected_handler: None,
        }
    }
}

pub struct QuerySession {
    transport: Box<dyn LineTransport>,
    roster: Arc<dyn RosterRepository>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    /// Commands still owed a terminal line, oldest first
    in_flight: VecDeque<InFlight>,
    /// Settled replies nobody has asked for again yet, by command line
    late_replies: HashMap<String, Settled>,
    pub context: ConnectionContext,
}

impl QuerySession {
    pub fn new(
        transport: Box<dyn LineTransport>,
        roster: Arc<dyn RosterRepository>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        let now = clock.now_millis();
        Self {
            transport,
            roster,
            clock,
            poll_interval,
            in_flight: VecDeque::new(),
            late_replies: HashMap::new(),
            context: ConnectionContext::new(now),
        }
    }

    pub fn roster(&self) -> &Arc<dyn RosterRepository> {
        &self.roster
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Verify the banner, then drain the welcome text until the line goes quiet.
    pub async fn greet(&mut self, greeting_timeout: Duration) -> Result<(), QueryError> {
        match self.transport.read_line(greeting_timeout).await? {
            Some(line) if line == GREETING_BANNER => {}
            Some(line) => return Err(QueryError::Greeting(line)),
            None => return Err(QueryError::NoResponse),
        }

        while let Some(line) = self.transport.read_line(self.poll_interval).await? {
            if let Some(handler) = selected_handler(&line) {
                tracing::debug!("Plug-in selected server handler {}", handler);
                self.context.selected_handler = Some(handler);
            }
        }
        Ok(())
    }

    /// Send a command and collect its reply.
    ///
    /// Notifications read while waiting are applied to the roster. A read
    /// timeout yields [`Reply::Pending`]; the session stays usable and the
    /// next call with the same command picks up where this one stopped.
    pub async fn execute(&mut self, command: &Command) -> Result<Reply, QueryError> {
        let line = command.to_line();
        if let Some(late) = self.late_replies.remove(&line) {
            tracing::debug!("Using late reply to '{}'", command.name());
            return late.into_reply();
        }

        if self.in_flight.iter().any(|entry| entry.line == line) {
            tracing::debug!("'{}' is still owed a reply, waiting for it", command.name());
        } else {
            self.transport.write_line(&line).await?;
            self.in_flight.push_back(InFlight {
                line: line.clone(),
                rows: Vec::new(),
            });
        }

        loop {
            let Some(received) = self.transport.read_line(self.poll_interval).await? else {
                tracing::debug!("No reply to '{}' yet", command.name());
                return Ok(Reply::Pending);
            };
            if let Some((settled, reply)) = self.receive(&received)? {
                if settled == line {
                    return reply.into_reply();
                }
                self.keep_late_reply(settled, reply);
            }
        }
    }

    /// Read at most one line and react to it.
    pub async fn poll(&mut self) -> Result<(), QueryError> {
        let Some(line) = self.transport.read_line(self.poll_interval).await? else {
            return Ok(());
        };
        if let Some((settled, reply)) = self.receive(&line)? {
            self.keep_late_reply(settled, reply);
        }
        Ok(())
    }

    /// Route one received line.
    ///
    /// Returns the command line and outcome when a terminal line settles the
    /// oldest command in flight. Connection-fatal statuses are errors.
    fn receive(&mut self, line: &str) -> Result<Option<(String, Settled)>, QueryError> {
        if line.is_empty() {
            return Ok(None);
        }

        let records = parse_line(line);
        if let Some(status) = status_record(&records) {
            let outcome = match check_status(status) {
                Ok(()) => Ok(()),
                Err(QueryError::Command { id, message }) => Err((id, message)),
                Err(e) => return Err(e),
            };
            let Some(entry) = self.in_flight.pop_front() else {
                if let Err((id, message)) = outcome {
                    tracing::warn!("Unsolicited error status (id={}): {}", id, message);
                }
                return Ok(None);
            };
            let reply = match outcome {
                Ok(()) => Settled::Complete(entry.rows),
                Err((id, message)) => Settled::Failed { id, message },
            };
            return Ok(Some((entry.line, reply)));
        }

        if is_notification(&records) {
            self.handle_notification(&records)?;
        } else if let Some(entry) = self.in_flight.front_mut() {
            entry.rows.extend(records);
        } else {
            tracing::debug!("Ignoring unsolicited data line: {}", line);
        }
        Ok(None)
    }

    fn keep_late_reply(&mut self, line: String, reply: Settled) {
        let name = line.split(' ').next().unwrap_or_default();
        if let Settled::Failed { id, message } = &reply {
            tracing::warn!("Late failure of '{}' (id={}): {}", name, id, message);
        } else {
            tracing::debug!("Keeping late reply to '{}'", name);
        }
        self.late_replies.insert(line, reply);
    }

    /// Apply a notification line to the roster and connection flags.
    pub fn handle_notification(&mut self, records: &[Record]) -> Result<(), QueryError> {
        let notification = Notification::from_records(records)?;

        if let NotificationKind::HandlerChanged = notification.kind {
            tracing::info!(
                "Plug-in switched to server handler {}",
                notification.handler.as_deref().unwrap_or("?")
            );
            self.context.selected_handler = notification.handler;
            self.context.refresh_roster_pending = true;
            return Ok(());
        }

        if let (Some(selected), Some(handler)) =
            (&self.context.selected_handler, &notification.handler)
            && selected != handler
        {
            tracing::trace!("Ignoring notification for handler {}", handler);
            return Ok(());
        }

        match notification.kind {
            NotificationKind::TalkStatus {
                clid,
                talking,
                whispering,
            } => {
                let now = self.clock.now_millis();
                if !self.roster.apply_talk(&clid, talking, whispering, now) {
                    tracing::debug!("Talk status for unknown participant {}", clid);
                }
            }
            NotificationKind::ClientMoved(moves) => {
                for (clid, channel) in moves {
                    self.roster.apply_move(&clid, &channel);
                }
            }
            NotificationKind::ClientLeft(clids) => {
                for clid in clids {
                    self.roster.mark_silent(&clid);
                }
                self.context.refresh_roster_pending = true;
            }
            NotificationKind::ClientEntered | NotificationKind::ClientUpdated => {
                self.context.refresh_roster_pending = true;
            }
            NotificationKind::HandlerChanged => {}
            NotificationKind::Other(name) => {
                tracing::trace!("Ignoring notification {}", name);
            }
        }
        Ok(())
    }

    /// Best-effort close after a short grace period.
    pub async fn close(&mut self, grace: Duration) {
        self.transport.close(grace).await;
    }
}

fn status_record(records: &[Record]) -> Option<&Record> {
    records
        .first()
        .filter(|record| record.first_key() == Some(STATUS_KEY))
}

/// Map a terminal status record onto the error taxonomy.
pub fn check_status(record: &Record) -> Result<(), QueryError> {
    let id: u32 = record
        .get("id")
        .ok_or_else(|| QueryError::Malformed("status line without id".to_string()))?
        .parse()
        .map_err(|_| QueryError::Malformed(format!("status id is not numeric: {:?}", record)))?;
    let message = record.get("msg").unwrap_or_default().to_string();

    match ReplyStatus::from_id(id) {
        ReplyStatus::Ok => Ok(()),
        ReplyStatus::MissingCredential => {
            tracing::warn!(
                "ClientQuery rejected the request: API key missing or invalid. \
                 Copy the key from the plug-in's ClientQuery settings into the `apikey` option."
            );
            Err(QueryError::NotConnected(DisconnectReason::MissingCredential))
        }
        ReplyStatus::SessionGone(id) => Err(QueryError::NotConnected(
            DisconnectReason::SessionGone { id, message },
        )),
        ReplyStatus::Failed(id) => Err(QueryError::Command { id, message }),
    }
}

fn selected_handler(line: &str) -> Option<String> {
    parse_line(line)
        .first()
        .filter(|record| record.first_key() == Some("selected"))
        .and_then(|record| record.get("schandlerid"))
        .map(str::to_string)
}
