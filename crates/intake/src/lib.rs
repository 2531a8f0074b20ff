//! Client-side file intake pipeline.
//!
//! This crate implements the **business logic** behind the "select files and
//! upload them" screen. It has no UI or transport dependencies: the host
//! provides a [`CommandChannel`] that reaches the backend and renders the
//! [`IntakeView`] published by the [`StatusTracker`].
//!
//! # Pipeline
//!
//! 1. **Describe**: one [`FileDescriptor`] per selected file
//! 2. **Reset**: the tracker starts a new generation, all files `Pending`
//! 3. **Read**: the file's bytes are loaded ([`ByteReader`])
//! 4. **Upload**: the bytes are sent to the backend ([`TransferInvoker`])
//! 5. **Settle**: the file ends `Succeeded` or `Failed`
//!
//! Steps 3 to 5 run independently per file.

pub mod controller;
pub mod descriptor;
pub mod error;
pub mod invoker;
pub mod reader;
pub mod size;
pub mod status;

// Re-export primary types for convenience.
pub use controller::{BatchFuture, BatchReport, FileOutcome, IntakeController, SelectionEvent};
pub use descriptor::{FileDescriptor, FileHandle};
pub use error::{ReadError, StatusError, TransferError};
pub use invoker::{CommandChannel, RpcInvoker, TransferInvoker};
pub use reader::{ByteReader, FsByteReader};
pub use size::format_size;
pub use status::{
    Advance, EntryKey, FileRow, IntakeView, StatusMarker, StatusTracker, TransferStatus,
    count_label,
};
