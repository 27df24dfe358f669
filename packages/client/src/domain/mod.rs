//! Domain layer: roster model, talker selection, identity rules and the
//! seams (repository, transport) implemented by the infrastructure layer.

pub mod error;
pub mod identity;
pub mod participant;
pub mod phase;
pub mod repository;
pub mod roster;
pub mod status;
pub mod transport;

pub use error::{DisconnectReason, QueryError};
pub use identity::{IdentityKey, IdentityState, compute_nickname, strip_number_prefix};
pub use participant::{ParticipantRecord, ParticipantRow, Talker};
pub use phase::ConnectionPhase;
pub use repository::RosterRepository;
pub use roster::{DEFAULT_TALK_TIMEOUT_MILLIS, Roster};
pub use status::ReplyStatus;
pub use transport::{Connector, LineTransport};

#[cfg(test)]
pub use transport::MockConnector;
