//! Error types for the query client.

use std::fmt;

use thiserror::Error;

/// Why the remote session has to be rebuilt from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The plug-in rejected the command because no (valid) API key was sent.
    MissingCredential,
    /// The plug-in lost its server link or the selected handler is invalid.
    SessionGone { id: u32, message: String },
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::MissingCredential => f.write_str("missing or invalid API key"),
            DisconnectReason::SessionGone { id, message } => {
                write!(f, "session gone (id={}): {}", id, message)
            }
        }
    }
}

/// Errors raised while talking to the ClientQuery plug-in.
///
/// Only [`QueryError::Command`] leaves the connection usable; every other
/// variant makes the runner tear the socket down and back off.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Not connected: {0}")]
    NotConnected(DisconnectReason),

    #[error("Command failed (id={id}): {message}")]
    Command { id: u32, message: String },

    #[error("Unexpected greeting: {0:?}")]
    Greeting(String),

    #[error("No response from remote")]
    NoResponse,

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    /// Whether the connection has to be torn down after this error.
    pub fn is_connection_fatal(&self) -> bool {
        !matches!(self, QueryError::Command { .. })
    }
}
