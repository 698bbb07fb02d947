//! `tokio::fs` implementation of the storage gateway.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use super::{FileHandle, StorageError, StorageGateway, StorageStream, join_path};

/// Storage gateway backed by a directory on the local file system.
///
/// Listings are returned sorted by file name so repeated listings of an
/// unchanged directory are stable.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Creates a gateway rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, path: &str) -> Result<PathBuf, StorageError> {
        if path.is_empty() || path.contains('\\') {
            return Err(StorageError::invalid_path(path));
        }
        let mut absolute = self.root.clone();
        for segment in path.split('/') {
            if !is_safe_segment(segment) {
                return Err(StorageError::invalid_path(path));
            }
            absolute.push(segment);
        }
        Ok(absolute)
    }
}

fn is_safe_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn file_name_of(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

#[async_trait]
impl StorageGateway for FsStorage {
    async fn resolve(&self, path: &str) -> Result<FileHandle, StorageError> {
        let absolute = self.absolute(path)?;
        let metadata = tokio::fs::metadata(&absolute)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        if !metadata.is_file() {
            return Err(StorageError::not_found(path));
        }
        Ok(FileHandle {
            name: file_name_of(path),
            path: path.to_string(),
            size_bytes: metadata.len(),
        })
    }

    #[instrument(level = "debug", skip(self))]
    async fn create_directory(&self, name: &str) -> Result<(), StorageError> {
        let absolute = self.absolute(name)?;
        if tokio::fs::metadata(&absolute)
            .await
            .is_ok_and(|meta| meta.is_dir())
        {
            return Err(StorageError::already_exists(name));
        }
        tokio::fs::create_dir_all(&absolute)
            .await
            .map_err(|e| StorageError::io(name, e))?;
        debug!(path = %absolute.display(), "created directory");
        Ok(())
    }

    async fn create_file(&self, path: &str) -> Result<FileHandle, StorageError> {
        let absolute = self.absolute(path)?;
        File::create(&absolute)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        Ok(FileHandle {
            name: file_name_of(path),
            path: path.to_string(),
            size_bytes: 0,
        })
    }

    async fn open_stream(
        &self,
        handle: &FileHandle,
    ) -> Result<Box<dyn StorageStream>, StorageError> {
        let absolute = self.absolute(&handle.path)?;
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&absolute)
            .await
            .map_err(|e| StorageError::io(handle.path.clone(), e))?;
        Ok(Box::new(FsStream {
            path: handle.path.clone(),
            writer: BufWriter::new(file),
        }))
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<FileHandle>, StorageError> {
        let absolute = self.absolute(dir)?;
        let mut reader = tokio::fs::read_dir(&absolute)
            .await
            .map_err(|e| StorageError::io(dir, e))?;

        let mut handles = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| StorageError::io(dir, e))?
        {
            let Ok(metadata) = entry.metadata().await else {
                // Removed between read_dir and stat.
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(ToString::to_string) else {
                debug!(entry = ?entry.file_name(), "skipping non UTF-8 file name");
                continue;
            };
            handles.push(FileHandle {
                path: join_path(dir, &name),
                name,
                size_bytes: metadata.len(),
            });
        }
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(handles)
    }

    async fn delete_file(&self, handle: &FileHandle) -> Result<(), StorageError> {
        let absolute = self.absolute(&handle.path)?;
        tokio::fs::remove_file(&absolute)
            .await
            .map_err(|e| StorageError::io(handle.path.clone(), e))
    }
}

struct FsStream {
    path: String,
    writer: BufWriter<File>,
}

#[async_trait]
impl StorageStream for FsStream {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        self.writer
            .write_all(bytes)
            .await
            .map_err(|e| StorageError::io(self.path.clone(), e))
    }

    async fn close(mut self: Box<Self>) -> Result<(), StorageError> {
        self.writer
            .flush()
            .await
            .map_err(|e| StorageError::io(self.path.clone(), e))?;
        self.writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| StorageError::io(self.path.clone(), e))
    }
}
