//! Storage-side helpers for uploaded files.
//!
//! Used by the backend to persist the bytes of one uploaded file: the
//! file name is validated against directory escapes, the payload checksum
//! is verified and the bytes are written in fixed-size chunks.

mod checksum;
mod validation;
mod writer;

pub use checksum::{checksum_bytes, verify_checksum};
pub use validation::validate_upload_name;
pub use writer::ChunkWriter;

/// Default write chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Errors produced while storing an uploaded file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("invalid file name: {0}")]
    InvalidName(String),
}
