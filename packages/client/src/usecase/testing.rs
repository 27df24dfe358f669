//! Scripted in-memory transport shared by the unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::domain::{LineTransport, QueryError};

/// Plays back queued lines and records everything written.
///
/// `None` entries in the incoming queue simulate a read timeout; an empty
/// queue times out as well. Replies registered with [`reply_to`] or
/// [`reply_late_to`] are queued whenever a command with that name is written.
///
/// [`reply_to`]: ScriptedTransport::reply_to
/// [`reply_late_to`]: ScriptedTransport::reply_late_to
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    incoming: Arc<Mutex<VecDeque<Option<String>>>>,
    written: Arc<Mutex<Vec<String>>>,
    replies: Arc<Mutex<HashMap<String, Vec<Option<String>>>>>,
    closed: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_line(&self, line: &str) -> &Self {
        self.incoming.lock().unwrap().push_back(Some(line.to_string()));
        self
    }

    pub(crate) fn push_timeout(&self) -> &Self {
        self.incoming.lock().unwrap().push_back(None);
        self
    }

    pub(crate) fn reply_to(&self, command: &str, lines: &[&str]) -> &Self {
        let script = lines.iter().map(|l| Some(l.to_string())).collect();
        self.replies.lock().unwrap().insert(command.to_string(), script);
        self
    }

    /// Like [`reply_to`](Self::reply_to), but the reply only shows up after
    /// one read timeout.
    pub(crate) fn reply_late_to(&self, command: &str, lines: &[&str]) -> &Self {
        let script = std::iter::once(None)
            .chain(lines.iter().map(|l| Some(l.to_string())))
            .collect();
        self.replies.lock().unwrap().insert(command.to_string(), script);
        self
    }

    pub(crate) fn written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    /// Number of written lines whose command name is `command`.
    pub(crate) fn count_sent(&self, command: &str) -> usize {
        self.written()
            .iter()
            .filter(|line| line.split(' ').next() == Some(command))
            .count()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LineTransport for ScriptedTransport {
    async fn write_line(&mut self, line: &str) -> Result<(), QueryError> {
        self.written.lock().unwrap().push(line.to_string());
        let name = line.split(' ').next().unwrap_or_default();
        if let Some(reply) = self.replies.lock().unwrap().get(name) {
            let mut incoming = self.incoming.lock().unwrap();
            incoming.extend(reply.iter().cloned());
        }
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, QueryError> {
        let next = self.incoming.lock().unwrap().pop_front();
        match next {
            Some(line) => Ok(line),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn close(&mut self, _grace: Duration) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
