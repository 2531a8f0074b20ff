//! Intake error types.

use ycloud_protocol::ProtocolError;

use crate::status::TransferStatus;

/// Loading a selected file's bytes failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to read {name}: {source}")]
pub struct ReadError {
    /// Name of the file the read was for.
    pub name: String,
    #[source]
    pub source: std::io::Error,
}

/// The call to the backend could not be completed.
///
/// A backend that answers but reports failure is not an error; that shows up
/// as `Ok(false)` from the invoker.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("channel error: {0}")]
    Channel(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backend error {code}: {message}")]
    Remote { code: i32, message: String },

    #[error("timed out waiting for the backend")]
    Timeout,
}

/// Internal consistency faults in the status model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: TransferStatus,
        to: TransferStatus,
    },

    #[error("no entry {index} in generation {generation}")]
    UnknownEntry { generation: u64, index: usize },
}
