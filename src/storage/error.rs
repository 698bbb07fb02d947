//! Error types for the storage gateway.

use thiserror::Error;

/// Errors returned by a [`StorageGateway`](super::StorageGateway).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested file or directory does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// Storage-relative path that was looked up.
        path: String,
    },

    /// A directory or file already exists where one was to be created.
    #[error("already exists: {path}")]
    AlreadyExists {
        /// Storage-relative path that already exists.
        path: String,
    },

    /// The path escapes the storage root or has empty/dot segments.
    #[error("invalid storage path: {path}")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// Underlying file system failure.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Storage-relative path where the error occurred.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Creates a not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an already-exists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Creates an invalid-path error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    /// Maps an IO error, promoting `NotFound`/`AlreadyExists` kinds to their variants.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { path, source },
        }
    }

    /// Returns true for the not-found variant.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for the already-exists variant.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_io_promotes_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(StorageError::io("videos/a.mp4", io).is_not_found());
    }

    #[test]
    fn test_storage_error_io_promotes_already_exists() {
        let io = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "there");
        assert!(StorageError::io("videos", io).is_already_exists());
    }

    #[test]
    fn test_storage_error_io_keeps_other_kinds() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = StorageError::io("videos/a.mp4", io);
        assert!(matches!(error, StorageError::Io { .. }));
        assert!(error.to_string().contains("videos/a.mp4"));
    }
}
