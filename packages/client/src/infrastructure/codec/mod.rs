//! ClientQuery wire format: value escaping, line parsing and command rendering.

pub mod command;
pub mod escape;
pub mod message;

pub use command::Command;
pub use message::{Record, parse_line};
