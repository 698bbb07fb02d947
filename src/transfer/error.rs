//! Error types for the transfer engine.
//!
//! Every transfer produces either the fetched bytes or exactly one of these
//! errors. Partial bytes are never handed back alongside an error.

use thiserror::Error;

/// Errors that can occur while fetching a remote resource.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Connection-level failure (DNS, refused connection, TLS, broken body stream).
    #[error("network error fetching {url}: {detail}")]
    Network {
        /// The URL that failed.
        url: String,
        /// Human-readable description of the failure.
        detail: String,
        /// The underlying reqwest error, when one exists.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Server answered with a non-2xx status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The transfer did not finish before its deadline.
    #[error("timeout fetching {url} after {deadline_secs}s")]
    Timeout {
        /// The URL that timed out.
        url: String,
        /// The deadline that was exceeded, in seconds.
        deadline_secs: u64,
    },

    /// The caller cancelled the transfer.
    #[error("transfer of {url} was cancelled")]
    Cancelled {
        /// The URL whose transfer was cancelled.
        url: String,
    },
}

impl TransferError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            detail: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a network error that has no underlying reqwest error.
    pub fn network_detail(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            detail: detail.into(),
            source: None,
        }
    }

    /// Creates a network error for a connection not established within the connect timeout.
    ///
    /// Distinct from [`Timeout`](Self::Timeout), which is reserved for the
    /// whole-transfer deadline.
    pub fn connect_timeout(
        url: impl Into<String>,
        connect_timeout_secs: u64,
        source: reqwest::Error,
    ) -> Self {
        Self::Network {
            url: url.into(),
            detail: format!("connect timeout after {connect_timeout_secs}s"),
            source: Some(source),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>, deadline_secs: u64) -> Self {
        Self::Timeout {
            url: url.into(),
            deadline_secs,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Returns true if the caller cancelled this transfer.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
