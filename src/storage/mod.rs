//! Storage gateway abstraction for persisted media files.
//!
//! The library manager only talks to storage through [`StorageGateway`], an
//! async trait object. Paths are storage-relative strings using `/` as the
//! separator (for example `videos/clip_1700000000000.mp4`).
//!
//! [`FsStorage`] is the `tokio::fs` implementation rooted at a base directory.

mod error;
mod fs;

use async_trait::async_trait;

pub use error::StorageError;
pub use fs::FsStorage;

/// A file known to the storage gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// Final path segment.
    pub name: String,
    /// Storage-relative path.
    pub path: String,
    /// Size in bytes at the time the handle was produced.
    pub size_bytes: u64,
}

/// An open write stream returned by [`StorageGateway::open_stream`].
#[async_trait]
pub trait StorageStream: Send {
    /// Appends `bytes` to the stream.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError>;

    /// Flushes and closes the stream, making the written data durable.
    async fn close(self: Box<Self>) -> Result<(), StorageError>;
}

/// File operations the media library depends on.
///
/// Implementations serialize their own file operations; callers never hold
/// locks across these calls.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Looks up an existing file.
    async fn resolve(&self, path: &str) -> Result<FileHandle, StorageError>;

    /// Creates a directory. Returns [`StorageError::AlreadyExists`] if it is already there.
    async fn create_directory(&self, name: &str) -> Result<(), StorageError>;

    /// Creates (or truncates) a file and returns its handle.
    async fn create_file(&self, path: &str) -> Result<FileHandle, StorageError>;

    /// Opens a write stream over a file created with [`create_file`](Self::create_file).
    async fn open_stream(&self, handle: &FileHandle)
    -> Result<Box<dyn StorageStream>, StorageError>;

    /// Lists the files directly inside `dir`, in the gateway's native order.
    async fn list_files(&self, dir: &str) -> Result<Vec<FileHandle>, StorageError>;

    /// Deletes a file.
    async fn delete_file(&self, handle: &FileHandle) -> Result<(), StorageError>;
}

/// Joins storage-relative path segments with `/`.
#[must_use]
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
