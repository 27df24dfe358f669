//! Infrastructure layer: wire codec, TCP transport and in-memory storage.

pub mod codec;
pub mod repository;
pub mod transport;
