//! Typed command envelope for ycloud client-backend calls.
//!
//! Every call crosses the boundary as a [`Message`] naming a
//! [`CommandName`] and carrying a JSON payload; the payload types live in
//! [`messages`].

pub mod constants;
pub mod envelope;
pub mod messages;

// Re-export primary types for convenience.
pub use constants::CommandName;
pub use envelope::{CallError, Message, ProtocolError};
pub use messages::{GreetRequest, GreetResponse, UploadRequest, UploadResponse};
