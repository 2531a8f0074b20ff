//! Loading a selected file into memory.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::descriptor::FileHandle;
use crate::error::ReadError;

/// Asynchronously turns a file handle into its full contents.
///
/// Implementations must not block the executor: a pending read suspends
/// only the calling pipeline. On failure no bytes are returned.
pub trait ByteReader: Send + Sync {
    fn read<'a>(
        &'a self,
        file: &'a FileHandle,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ReadError>> + Send + 'a>>;
}

/// Reads files from the local file system with `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsByteReader;

impl ByteReader for FsByteReader {
    fn read<'a>(
        &'a self,
        file: &'a FileHandle,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ReadError>> + Send + 'a>> {
        Box::pin(async move {
            let bytes = tokio::fs::read(&file.path).await.map_err(|source| ReadError {
                name: file.name.clone(),
                source,
            })?;
            debug!(file = %file.name, bytes = bytes.len(), "file read");
            Ok(bytes)
        })
    }
}
