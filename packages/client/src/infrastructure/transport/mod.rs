//! Transport implementations.

pub mod tcp;

pub use tcp::{CLIENT_QUERY_PORT, TcpConnector, TcpTransport};
