//! Classification of the numeric result carried by every terminal `error` line.

/// Command succeeded.
pub const STATUS_OK: u32 = 0;
/// Conversion error.
pub const STATUS_CONVERT_ERROR: u32 = 1540;
/// The selected server handler is not connected.
pub const STATUS_NOT_CONNECTED: u32 = 1794;
/// Missing or invalid API key.
pub const STATUS_MISSING_CREDENTIAL: u32 = 1796;
/// Invalid server connection handler id.
pub const STATUS_INVALID_HANDLER: u32 = 1799;

/// What a terminal status id means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    MissingCredential,
    SessionGone(u32),
    Failed(u32),
}

impl ReplyStatus {
    pub fn from_id(id: u32) -> Self {
        match id {
            STATUS_OK => ReplyStatus::Ok,
            STATUS_MISSING_CREDENTIAL => ReplyStatus::MissingCredential,
            STATUS_NOT_CONNECTED | STATUS_CONVERT_ERROR | STATUS_INVALID_HANDLER => {
                ReplyStatus::SessionGone(id)
            }
            other => ReplyStatus::Failed(other),
        }
    }
}
