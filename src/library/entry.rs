//! Library entry, transfer task and report types.

use std::fmt;

use serde::Serialize;
use url::Url;

use super::naming::canonical_name;
use crate::storage::{FileHandle, StorageError};

/// A stored video, derived fresh from each storage listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryEntry {
    /// Unique stored name, including its generation token.
    pub file_name: String,
    /// Size on disk in bytes.
    pub size_bytes: u64,
    /// Storage-relative path (`videos/<file_name>`).
    pub storage_path: String,
}

impl LibraryEntry {
    /// Returns the stored name with its generation token removed.
    #[must_use]
    pub fn canonical_name(&self) -> String {
        canonical_name(&self.file_name)
    }
}

impl From<FileHandle> for LibraryEntry {
    fn from(handle: FileHandle) -> Self {
        Self {
            file_name: handle.name,
            size_bytes: handle.size_bytes,
            storage_path: handle.path,
        }
    }
}

/// Lifecycle state of a [`TransferTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// Accepted, no bytes received yet.
    Pending,
    /// Receiving bytes.
    InProgress,
    /// Bytes received and stored.
    Completed,
    /// Transfer or storage failed.
    Failed,
    /// Cancelled by the caller.
    Cancelled,
}

impl TransferState {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true for completed, failed and cancelled.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single active download. Discarded once it reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    /// Remote source.
    pub source: Url,
    /// Name the bytes will be stored under.
    pub destination_name: String,
    /// Length advertised by the server, when known.
    pub bytes_total: Option<u64>,
    /// Bytes received so far.
    pub bytes_transferred: u64,
    /// Lifecycle state.
    pub state: TransferState,
}

impl TransferTask {
    pub(crate) fn new(source: Url, destination_name: String) -> Self {
        Self {
            source,
            destination_name,
            bytes_total: None,
            bytes_transferred: 0,
            state: TransferState::Pending,
        }
    }
}

/// A single entry that [`clear_all`](super::LibraryManager::clear_all) could not remove.
#[derive(Debug)]
pub struct ClearFailure {
    /// Stored name of the entry.
    pub file_name: String,
    /// Why the delete failed.
    pub error: StorageError,
}

/// Outcome of a best-effort library clear.
#[derive(Debug, Default)]
pub struct ClearReport {
    /// Entries successfully deleted.
    pub removed: usize,
    /// Entries that failed to delete and were skipped.
    pub failures: Vec<ClearFailure>,
}

impl ClearReport {
    /// Returns true when every entry was removed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Entry count and total size of the library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibrarySummary {
    /// Number of entries.
    pub entries: usize,
    /// Sum of entry sizes in bytes.
    pub total_bytes: u64,
}
