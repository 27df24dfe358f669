//! Client settings.
//!
//! Settings come from a plain key→value lookup ([`ConfigSource`]) so the host
//! application can back them with whatever configuration store it has.

use std::{collections::HashMap, time::Duration};

use serde::Serialize;

pub const KEY_HOST: &str = "host";
pub const KEY_API_KEY: &str = "apikey";
pub const KEY_PUSH_NUMBER: &str = "push_number";
pub const KEY_PUSH_NAME: &str = "push_name";

pub const DEFAULT_HOST: &str = "localhost";

/// Key→value lookup used to build [`Settings`].
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Delays and intervals of the connection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timings {
    /// Wait before reconnecting after any failure
    pub reconnect_delay: Duration,
    /// Extra wait after the plug-in rejected the API key
    pub auth_pause: Duration,
    /// Read timeout for the greeting banner
    pub greeting_timeout: Duration,
    /// Read timeout in steady state; bounds shutdown latency
    pub poll_interval: Duration,
    /// Interval between keepalive commands
    pub keepalive_interval: Duration,
    /// Grace period before closing the socket
    pub close_grace: Duration,
    /// Talk flags older than this are ignored by talker selection
    pub talk_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(10),
            auth_pause: Duration::from_secs(5),
            greeting_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
            keepalive_interval: Duration::from_secs(60),
            close_grace: Duration::from_secs(1),
            talk_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub host: String,
    /// Empty disables authentication
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Embed the participant number into the local nickname
    pub push_number: bool,
    /// Also replace the nickname with the host-supplied display name
    pub push_name: bool,
    pub timings: Timings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_key: String::new(),
            push_number: true,
            push_name: false,
            timings: Timings::default(),
        }
    }
}

impl Settings {
    /// Build settings from a key→value source, falling back to defaults.
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let defaults = Settings::default();
        Self {
            host: source
                .get(KEY_HOST)
                .filter(|host| !host.trim().is_empty())
                .unwrap_or(defaults.host),
            api_key: source
                .get(KEY_API_KEY)
                .map(|key| key.trim().to_string())
                .unwrap_or(defaults.api_key),
            push_number: read_bool(source, KEY_PUSH_NUMBER, defaults.push_number),
            push_name: read_bool(source, KEY_PUSH_NAME, defaults.push_name),
            timings: defaults.timings,
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

fn read_bool(source: &dyn ConfigSource, key: &str, default: bool) -> bool {
    let Some(raw) = source.get(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => {
            tracing::warn!(
                "Invalid boolean {:?} for '{}', using default {}",
                other,
                key,
                default
            );
            default
        }
    }
}
