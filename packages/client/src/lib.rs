//! Resilient client for a voice-chat application's ClientQuery plug-in.
//!
//! The client keeps a connection to the plug-in alive, tracks which
//! participants are talking or whispering, and embeds a host-supplied
//! participant number into the local nickname.
//!
//! ```no_run
//! use kikoe_client::{QueryClient, Settings};
//!
//! let client = QueryClient::new(Settings::default());
//! client.start();
//! client.update("12", "Officer Bob");
//! println!("talking: {}", client.talker_nickname());
//! client.disconnect();
//! ```

// layers
pub mod domain;
pub mod infrastructure;
pub mod usecase;

// caller-facing API
pub mod client;

pub use client::{ConfigSource, QueryClient, Settings, Timings};
pub use domain::{ConnectionPhase, ParticipantRecord, QueryError, Talker};
