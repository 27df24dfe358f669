//! Connection lifecycle phases.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ConnectionPhase {
    #[default]
    Disconnected,
    Connecting,
    Greeting,
    Authenticating,
    RegisteringEvents,
    Listening,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionPhase::Disconnected => "disconnected",
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::Greeting => "greeting",
            ConnectionPhase::Authenticating => "authenticating",
            ConnectionPhase::RegisteringEvents => "registering-events",
            ConnectionPhase::Listening => "listening",
        };
        f.write_str(name)
    }
}
