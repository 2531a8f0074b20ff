//! Backend transfer boundary.
//!
//! `TransferInvoker` is what the pipeline calls; `RpcInvoker` implements it
//! on top of any [`CommandChannel`], which is the only piece that knows how
//! envelopes actually reach the backend.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, warn};
use ycloud_protocol::constants::UPLOAD_REQUEST_TIMEOUT;
use ycloud_protocol::{CommandName, Message, UploadRequest, UploadResponse};

use crate::error::TransferError;

/// Raw request/response call to the backend.
///
/// The host application implements this on top of its IPC mechanism.
/// Using a trait keeps the pipeline decoupled from transport and testable
/// with mocks.
pub trait CommandChannel: Send + Sync {
    /// Sends a request envelope and waits for the reply envelope.
    fn call(
        &self,
        request: Message,
    ) -> Pin<Box<dyn Future<Output = Result<Message, TransferError>> + Send + '_>>;
}

/// Sends one file's name and bytes to the backend.
///
/// Resolves to `Ok(true)` when the backend stored the file, `Ok(false)` when
/// the backend answered with a failure, and `Err` when the call itself could
/// not be completed. Each invocation is exactly one backend call carrying
/// the full payload.
pub trait TransferInvoker: Send + Sync {
    fn transfer<'a>(
        &'a self,
        file_name: &'a str,
        bytes: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<bool, TransferError>> + Send + 'a>>;
}

/// [`TransferInvoker`] speaking the `upload_video` command over a channel.
pub struct RpcInvoker<C> {
    channel: C,
    timeout: Duration,
    send_checksum: bool,
}

impl<C: CommandChannel> RpcInvoker<C> {
    /// Creates an invoker with the default upload timeout, sending checksums.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            timeout: UPLOAD_REQUEST_TIMEOUT,
            send_checksum: true,
        }
    }

    /// Overrides the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables the SHA-256 checksum sent with each upload.
    pub fn with_checksum(mut self, enabled: bool) -> Self {
        self.send_checksum = enabled;
        self
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<bool, TransferError> {
        let checksum = if self.send_checksum {
            ycloud_transfer::checksum_bytes(&bytes)
        } else {
            String::new()
        };
        let size = bytes.len();
        let request = UploadRequest {
            filename: file_name.to_string(),
            bytes,
            checksum,
        };

        let id = uuid::Uuid::new_v4().to_string();
        let message = Message::new(&id, CommandName::UploadVideo, Some(&request))?;
        drop(request);

        debug!(file = %file_name, bytes = size, request_id = %id, "sending upload");

        let reply = tokio::time::timeout(self.timeout, self.channel.call(message))
            .await
            .map_err(|_| TransferError::Timeout)??;

        if reply.id != id {
            return Err(TransferError::Channel(format!(
                "reply id {} does not match request {id}",
                reply.id
            )));
        }
        if reply.is_error() {
            let (code, message) = reply
                .error
                .map(|e| (e.code, e.message))
                .unwrap_or_else(|| (0, "error reply without details".into()));
            warn!(file = %file_name, code, error = %message, "backend rejected upload");
            return Err(TransferError::Remote { code, message });
        }

        let response: UploadResponse = reply.require_payload()?;
        Ok(response.success)
    }
}

impl<C: CommandChannel> TransferInvoker for RpcInvoker<C> {
    fn transfer<'a>(
        &'a self,
        file_name: &'a str,
        bytes: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<bool, TransferError>> + Send + 'a>> {
        Box::pin(self.upload(file_name, bytes))
    }
}
