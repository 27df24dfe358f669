//! Local identity and nickname derivation.

use std::sync::LazyLock;

use regex::Regex;

/// Longest nickname the plug-in accepts (characters).
pub const MAX_NICKNAME_CHARS: usize = 30;

/// Leading `#<digits> ` marker of a previously pushed participant number.
static NUMBER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#? *[0-9]+ ?").expect("number prefix pattern is valid")
});

/// Identity fields supplied by the host application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityState {
    /// Participant number, empty when unknown
    pub participant_number: String,
    pub display_name: String,
}

impl IdentityState {
    /// The part of the identity that, when changed, requires a nickname push.
    pub fn sync_key(&self, push_name: bool) -> IdentityKey {
        IdentityKey {
            participant_number: self.participant_number.clone(),
            display_name: push_name.then(|| self.display_name.clone()),
        }
    }
}

/// Identity as last pushed to the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    pub participant_number: String,
    pub display_name: Option<String>,
}

/// Remove a leading participant-number marker from a nickname.
pub fn strip_number_prefix(nickname: &str) -> &str {
    match NUMBER_PREFIX.find(nickname) {
        Some(m) => &nickname[m.end()..],
        None => nickname,
    }
}

/// Compute the nickname to push for `identity`, starting from the
/// participant's `current` nickname.
pub fn compute_nickname(current: &str, identity: &IdentityState, push_name: bool) -> String {
    let stripped = strip_number_prefix(current);
    if identity.participant_number.is_empty() {
        return stripped.to_string();
    }

    let base = if push_name && !identity.display_name.is_empty() {
        identity.display_name.as_str()
    } else {
        stripped
    };
    let nickname = format!("#{} {}", identity.participant_number, base);
    nickname.chars().take(MAX_NICKNAME_CHARS).collect()
}
