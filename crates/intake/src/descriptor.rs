//! Selected files and their metadata snapshots.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::size::format_size;

/// One file as yielded by the file picker.
///
/// Carries the name and length the picker reported, plus the location the
/// bytes are read from later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

impl FileHandle {
    /// Creates a handle from already known metadata.
    pub fn new(name: impl Into<String>, size_bytes: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            path: path.into(),
        }
    }

    /// Stats `path` and builds a handle from its file system metadata.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            size_bytes: metadata.len(),
            path: path.to_path_buf(),
        })
    }
}

/// Immutable metadata snapshot of one selected file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    name: String,
    size_bytes: u64,
}

impl FileDescriptor {
    /// Creates a descriptor.
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
        }
    }

    /// Name of the file; opaque, may contain any character.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte length reported at selection time.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Human-readable size, recomputed on every call.
    pub fn display_size(&self) -> String {
        format_size(self.size_bytes)
    }
}

impl From<&FileHandle> for FileDescriptor {
    fn from(handle: &FileHandle) -> Self {
        Self::new(handle.name.clone(), handle.size_bytes)
    }
}
