use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Size of the chunks the backend writes incoming uploads with (1 MiB).
pub const WRITE_CHUNK_SIZE: usize = 1024 * 1024;

/// Timeout for a single upload call, from request to reply.
///
/// Uploads carry the whole file in one payload, so this is deliberately
/// generous compared to a plain request/response.
pub const UPLOAD_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Error code replied when a payload cannot be decoded.
pub const ERR_BAD_PAYLOAD: i32 = 400;

/// Error code replied for a command the backend does not handle.
pub const ERR_UNSUPPORTED: i32 = 404;

/// Error code replied when the backend fails internally.
pub const ERR_INTERNAL: i32 = 500;

/// Error code replied for a known command the backend has no handler for.
pub const ERR_NOT_IMPLEMENTED: i32 = 501;

/// Command identifier carried by every envelope.
///
/// Serialized as the snake_case command names the backend registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "greet")]
    Greet,
    #[serde(rename = "create_user")]
    CreateUser,
    #[serde(rename = "username")]
    Username,
    #[serde(rename = "display_directory")]
    DisplayDirectory,
    #[serde(rename = "upload_video")]
    UploadVideo,

    // Replies
    #[serde(rename = "result")]
    Result,
    #[serde(rename = "error")]
    Error,
}

impl CommandName {
    /// Wire name of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::Greet => "greet",
            CommandName::CreateUser => "create_user",
            CommandName::Username => "username",
            CommandName::DisplayDirectory => "display_directory",
            CommandName::UploadVideo => "upload_video",
            CommandName::Result => "result",
            CommandName::Error => "error",
        }
    }
}

impl std::fmt::Display for CommandName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
