use std::path::{Path, PathBuf};

use tracing::{info, warn};
use ycloud_protocol::constants::{ERR_BAD_PAYLOAD, ERR_INTERNAL};
use ycloud_protocol::{Message, UploadRequest, UploadResponse};
use ycloud_transfer::{ChunkWriter, StoreError, verify_checksum};

use crate::handler::{Handler, HandlerFuture};

/// Backend that stores uploaded files in a local directory.
///
/// A file that cannot be stored is reported as `success: false`, not as an
/// error reply; error replies are reserved for undecodable requests.
#[derive(Debug, Clone)]
pub struct StorageBackend {
    writer: ChunkWriter,
    verify_checksum: bool,
}

impl StorageBackend {
    /// Creates a backend writing into `storage_dir`.
    ///
    /// A `chunk_size` of 0 selects the default write chunk size.
    pub fn new(storage_dir: &Path, chunk_size: usize) -> Self {
        Self {
            writer: ChunkWriter::new(storage_dir, chunk_size),
            verify_checksum: true,
        }
    }

    /// Enables or disables checksum verification of incoming uploads.
    pub fn with_checksum_verification(mut self, enabled: bool) -> Self {
        self.verify_checksum = enabled;
        self
    }

    /// Returns the storage directory.
    pub fn storage_dir(&self) -> &Path {
        self.writer.base_path()
    }

    async fn store(&self, req: &UploadRequest) -> Result<PathBuf, StoreError> {
        if self.verify_checksum {
            verify_checksum(&req.bytes, &req.checksum)?;
        }
        self.writer.write_file(&req.filename, &req.bytes).await
    }
}

impl Handler for StorageBackend {
    fn on_upload_video(&self, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let req: UploadRequest = match msg.require_payload() {
                Ok(r) => r,
                Err(e) => {
                    warn!(id = %msg.id, error = %e, "rejecting upload with bad payload");
                    return msg.reply_error(ERR_BAD_PAYLOAD, format!("invalid payload: {e}"));
                }
            };

            let resp = match self.store(&req).await {
                Ok(path) => {
                    info!(
                        filename = %req.filename,
                        bytes = req.bytes.len(),
                        path = %path.display(),
                        "upload stored"
                    );
                    UploadResponse {
                        success: true,
                        stored_path: Some(path.display().to_string()),
                    }
                }
                Err(e) => {
                    warn!(filename = %req.filename, error = %e, "upload not stored");
                    UploadResponse {
                        success: false,
                        stored_path: None,
                    }
                }
            };

            msg.reply(Some(&resp))
                .unwrap_or_else(|e| msg.reply_error(ERR_INTERNAL, e.to_string()))
        })
    }
}
