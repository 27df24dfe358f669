//! Transport seams.
//!
//! The session only needs to write a line and read a line with a deadline;
//! the connector produces a fresh transport per connection attempt.

use std::time::Duration;

use async_trait::async_trait;

use super::QueryError;

/// A connected, newline-framed text stream.
#[async_trait]
pub trait LineTransport: Send {
    /// Send one line; the newline terminator is appended by the transport.
    async fn write_line(&mut self, line: &str) -> Result<(), QueryError>;

    /// Read one line without its terminator.
    ///
    /// Returns `Ok(None)` when nothing complete arrived within `timeout`.
    /// A partially received line is kept for the next call.
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, QueryError>;

    /// Wait `grace` for in-flight writes, then close. Never fails.
    async fn close(&mut self, grace: Duration);
}

/// Opens transports to the remote endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LineTransport>, QueryError>;

    /// Human-readable endpoint for logs.
    fn endpoint(&self) -> String;
}
