//! Adapter bridging the in-process backend to the intake crate's
//! `CommandChannel` trait.
//!
//! Envelopes are serialized to JSON and back on both legs, so the backend
//! sees exactly what it would receive over a real IPC boundary.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ycloud_backend::{Handler, dispatch};
use ycloud_intake::{CommandChannel, TransferError};
use ycloud_protocol::Message;

/// Implements `CommandChannel` by dispatching to a local [`Handler`].
pub struct LocalChannel<H> {
    backend: Arc<H>,
}

impl<H: Handler> LocalChannel<H> {
    pub fn new(backend: Arc<H>) -> Self {
        Self { backend }
    }
}

impl<H: Handler> CommandChannel for LocalChannel<H> {
    fn call(
        &self,
        request: Message,
    ) -> Pin<Box<dyn Future<Output = Result<Message, TransferError>> + Send + '_>> {
        Box::pin(async move {
            let wire = serde_json::to_string(&request)?;
            let received: Message = serde_json::from_str(&wire)?;

            let reply = dispatch(self.backend.as_ref(), received).await;

            let wire = serde_json::to_string(&reply)?;
            Ok(serde_json::from_str(&wire)?)
        })
    }
}
