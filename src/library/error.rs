//! Error types for library operations.

use std::fmt;

use thiserror::Error;

use crate::storage::StorageError;
use crate::transfer::TransferError;

/// Stable classification of a [`LibraryError`], for display and scripting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; never retried.
    Validation,
    /// The single download slot is occupied.
    Busy,
    /// Connection-level transfer failure.
    Network,
    /// Non-2xx HTTP response.
    HttpStatus,
    /// Transfer exceeded its deadline.
    Timeout,
    /// Transfer cancelled by the caller.
    Cancelled,
    /// File system create/write/delete failure.
    Storage,
    /// An entry with the same canonical name already exists.
    Duplicate,
    /// Delete target does not exist.
    NotFound,
}

impl ErrorKind {
    /// Returns the stable tag for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Busy => "busy",
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Storage => "storage",
            Self::Duplicate => "duplicate",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors returned by [`LibraryManager`](super::LibraryManager) operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The input failed syntax, extension or location checks.
    #[error("invalid input '{input}': {reason}")]
    Validation {
        /// The rejected input.
        input: String,
        /// Which check failed.
        reason: String,
    },

    /// Another download currently holds the single-flight slot.
    #[error("a download is already in progress ({active_url}); try again later")]
    Busy {
        /// URL of the transfer occupying the slot.
        active_url: String,
    },

    /// An entry with the same canonical name exists; detected before any transfer.
    #[error("'{file_name}' is already in the library as {existing}")]
    Duplicate {
        /// Canonical name derived from the request.
        file_name: String,
        /// Stored name of the existing entry.
        existing: String,
    },

    /// The entry to delete does not exist.
    #[error("library entry not found: {path}")]
    NotFound {
        /// The requested path.
        path: String,
    },

    /// The transfer failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl LibraryError {
    /// Creates a validation error.
    pub fn validation(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Returns the stable kind tag for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Busy { .. } => ErrorKind::Busy,
            Self::Duplicate { .. } => ErrorKind::Duplicate,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Transfer(error) => match error {
                TransferError::Network { .. } => ErrorKind::Network,
                TransferError::HttpStatus { .. } => ErrorKind::HttpStatus,
                TransferError::Timeout { .. } => ErrorKind::Timeout,
                TransferError::Cancelled { .. } => ErrorKind::Cancelled,
            },
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}
