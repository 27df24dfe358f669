//! Shared utilities for the kikoe workspace: logging setup and clock abstraction.

pub mod logger;
pub mod time;
