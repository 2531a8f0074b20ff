use std::path::{Path, PathBuf};

use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::{DEFAULT_CHUNK_SIZE, StoreError};

/// Suffix of the file a write lands in before it is renamed into place.
const PARTIAL_SUFFIX: &str = ".part";

/// Writes uploaded files into a storage directory in fixed-size chunks.
///
/// Data goes to a staging file unique to each write (`.<name>.<uuid>.part`)
/// and is renamed once fully flushed, so a failed write never leaves a
/// truncated file under the final name. Concurrent writes of the same name
/// never share a staging file; the last rename wins with intact contents.
#[derive(Debug, Clone)]
pub struct ChunkWriter {
    base_path: PathBuf,
    chunk_size: usize,
}

impl ChunkWriter {
    /// Creates a writer rooted at `base_path`.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (1 MiB) is used.
    pub fn new(base_path: &Path, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            base_path: base_path.to_path_buf(),
            chunk_size,
        }
    }

    /// Writes `data` to `<base_path>/<name>` and returns the final path.
    ///
    /// The name is validated before anything touches the disk. An existing
    /// file with the same name is replaced.
    pub async fn write_file(&self, name: &str, data: &[u8]) -> Result<PathBuf, StoreError> {
        crate::validate_upload_name(name)?;

        tokio::fs::create_dir_all(&self.base_path).await?;

        let full_path = self.base_path.join(name);
        let partial_path = self.base_path.join(format!(
            ".{name}.{}{PARTIAL_SUFFIX}",
            uuid::Uuid::new_v4().simple()
        ));

        let staged = match self.write_chunks(&partial_path, data).await {
            Ok(()) => tokio::fs::rename(&partial_path, &full_path)
                .await
                .map_err(StoreError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = staged {
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(e);
        }

        debug!(
            path = %full_path.display(),
            bytes = data.len(),
            chunk_size = self.chunk_size,
            "file stored"
        );
        Ok(full_path)
    }

    async fn write_chunks(&self, path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let file = tokio::fs::File::create(path).await?;
        let mut writer = BufWriter::new(file);
        for chunk in data.chunks(self.chunk_size) {
            writer.write_all(chunk).await?;
        }
        writer.flush().await?;
        writer.into_inner().sync_all().await?;
        Ok(())
    }

    /// Returns the storage directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_file_in_chunks() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path(), 4);

        let data: Vec<u8> = (0..=250).collect();
        let path = writer.write_file("clip.bin", &data).await.unwrap();

        assert_eq!(path, dir.path().join("clip.bin"));
        assert_eq!(std::fs::read(&path).unwrap(), data);
        assert_eq!(entries(dir.path()), vec!["clip.bin".to_string()]);
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_writes_of_same_name_stay_intact() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path(), 4096);
        let first = vec![0x01u8; 4 * 1024 * 1024];
        let second = vec![0x02u8; 3 * 1024 * 1024];

        for _ in 0..5 {
            let (a, b) = tokio::join!(
                writer.write_file("clip.bin", &first),
                writer.write_file("clip.bin", &second)
            );
            assert!(a.is_ok());
            assert!(b.is_ok());

            let stored = std::fs::read(dir.path().join("clip.bin")).unwrap();
            assert!(stored == first || stored == second);
            assert_eq!(entries(dir.path()), vec!["clip.bin".to_string()]);
        }
    }

    #[tokio::test]
    async fn name_ending_in_part_does_not_collide() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path(), 2);

        let (a, b) = tokio::join!(
            writer.write_file("x", b"plain"),
            writer.write_file("x.part", b"suffixed")
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(std::fs::read(dir.path().join("x")).unwrap(), b"plain");
        assert_eq!(std::fs::read(dir.path().join("x.part")).unwrap(), b"suffixed");
        assert_eq!(entries(dir.path()), vec!["x".to_string(), "x.part".to_string()]);
    }

    #[tokio::test]
    async fn zero_chunk_size_uses_default() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path(), 0);
        assert_eq!(writer.chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path(), 0);
        let path = writer.write_file("empty.bin", &[]).await.unwrap();
        assert_eq!(std::fs::metadata(path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn creates_missing_storage_dir() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("input").join("videos");
        let writer = ChunkWriter::new(&base, 0);
        writer.write_file("a.mp4", b"abc").await.unwrap();
        assert_eq!(std::fs::read(base.join("a.mp4")).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let writer = ChunkWriter::new(dir.path(), 0);
        writer.write_file("a.mp4", b"first version").await.unwrap();
        writer.write_file("a.mp4", b"v2").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("a.mp4")).unwrap(), b"v2");
    }

    #[tokio::test]
    async fn rejects_traversal_before_writing() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("store");
        let writer = ChunkWriter::new(&base, 0);
        let result = writer.write_file("../escape.mp4", b"x").await;
        assert!(matches!(result, Err(StoreError::InvalidName(_))));
        assert!(!base.exists());
        assert!(!dir.path().join("escape.mp4").exists());
    }
}
