//! UseCase layer: one connection's command driver and the operations the
//! connection loop performs on it.

pub mod notification;
pub mod refresh_roster;
pub mod session;
pub mod sync_identity;

#[cfg(test)]
pub(crate) mod testing;

pub use refresh_roster::RefreshRosterUseCase;
pub use session::{ConnectionContext, GREETING_BANNER, QuerySession, Reply};
pub use sync_identity::SyncIdentityUseCase;
