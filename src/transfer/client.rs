//! HTTP transfer engine for fetching remote media into memory.
//!
//! This module provides the `TransferEngine` struct which streams a response
//! body with progress callbacks, a whole-transfer deadline and caller-driven
//! cancellation.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::constants::{COMPLETE_PERCENT, CONNECT_TIMEOUT_SECS, TRANSFER_DEADLINE_SECS};
use super::error::TransferError;

/// Upper bound for the up-front buffer reservation, whatever the server claims.
const MAX_PREALLOCATED_BYTES: u64 = 64 * 1024 * 1024;

/// Progress snapshot emitted while a body with a known length is streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes received so far.
    pub bytes_transferred: u64,
    /// Total length advertised by the server.
    pub bytes_total: u64,
}

impl TransferProgress {
    /// Returns completion as a percentage in `0.0..=100.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.bytes_total == 0 {
            return COMPLETE_PERCENT;
        }
        let ratio = self.bytes_transferred as f64 / self.bytes_total as f64;
        (ratio * COMPLETE_PERCENT).min(COMPLETE_PERCENT)
    }

    /// Returns true once every advertised byte has arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.bytes_transferred >= self.bytes_total
    }
}

/// Timeouts applied by the transfer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSettings {
    /// Connect timeout configured on the underlying HTTP client.
    pub connect_timeout: Duration,
    /// Deadline for the whole transfer, headers and body included.
    pub deadline: Duration,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            deadline: Duration::from_secs(TRANSFER_DEADLINE_SECS),
        }
    }
}

/// HTTP transfer engine with streaming progress.
///
/// The engine is designed to be created once and reused, taking advantage
/// of connection pooling in the underlying client.
///
/// # Example
///
/// ```no_run
/// use mediadock_core::transfer::TransferEngine;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = TransferEngine::new();
/// let cancel = CancellationToken::new();
/// let bytes = engine
///     .transfer("https://example.com/clip.mp4", |p| println!("{:.0}%", p.percent()), &cancel)
///     .await?;
/// println!("fetched {} bytes", bytes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TransferEngine {
    client: Client,
    settings: TransferSettings,
}

impl Default for TransferEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferEngine {
    /// Creates a transfer engine with default timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(TransferSettings::default())
    }

    /// Creates a transfer engine with explicit timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the supplied
    /// configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_settings(settings: TransferSettings) -> Self {
        Self::try_with_settings(settings)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a transfer engine, returning the client build error instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend or resolver
    /// cannot be initialized.
    pub fn try_with_settings(settings: TransferSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .user_agent(concat!("mediadock/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, settings })
    }

    /// Returns the timeouts this engine was built with.
    #[must_use]
    pub fn settings(&self) -> TransferSettings {
        self.settings
    }

    /// Fetches `url` using the engine's default deadline.
    ///
    /// # Errors
    ///
    /// See [`transfer_with_deadline`](Self::transfer_with_deadline).
    pub async fn transfer<F>(
        &self,
        url: &str,
        on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<Bytes, TransferError>
    where
        F: FnMut(TransferProgress),
    {
        self.transfer_with_deadline(url, on_progress, self.settings.deadline, cancel)
            .await
    }

    /// Fetches `url` into memory, reporting progress when the length is known.
    ///
    /// The URL must already be syntactically valid; only reachability is
    /// checked here. Progress callbacks arrive in non-decreasing order and
    /// stop as soon as `cancel` fires. Once the call returns, the response
    /// and its connection have been dropped.
    ///
    /// # Errors
    ///
    /// Returns `TransferError` if:
    /// - The connection fails, including the connect timeout, or the body stream breaks (`Network`)
    /// - The server returns a non-2xx status (`HttpStatus`)
    /// - `deadline` elapses first (`Timeout`)
    /// - `cancel` fires first (`Cancelled`)
    pub async fn transfer_with_deadline<F>(
        &self,
        url: &str,
        on_progress: F,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<Bytes, TransferError>
    where
        F: FnMut(TransferProgress),
    {
        self.transfer_observed(url, on_progress, |_| {}, deadline, cancel)
            .await
    }

    /// Like [`transfer_with_deadline`](Self::transfer_with_deadline), and
    /// also calls `on_bytes` with the running byte count after every chunk.
    ///
    /// `on_bytes` fires whether or not the server reported a length; only
    /// `on_progress` is suppressed for unknown lengths.
    ///
    /// # Errors
    ///
    /// See [`transfer_with_deadline`](Self::transfer_with_deadline).
    #[instrument(skip(self, on_progress, on_bytes, cancel), fields(url = %url))]
    pub async fn transfer_observed<F, B>(
        &self,
        url: &str,
        mut on_progress: F,
        mut on_bytes: B,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<Bytes, TransferError>
    where
        F: FnMut(TransferProgress),
        B: FnMut(u64),
    {
        debug!(deadline_secs = deadline.as_secs(), "starting transfer");

        let fetch = self.fetch(url, &mut on_progress, &mut on_bytes);
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TransferError::cancelled(url)),
            outcome = tokio::time::timeout(deadline, fetch) => match outcome {
                Ok(inner) => inner,
                Err(_) => Err(TransferError::timeout(url, deadline.as_secs())),
            },
        };

        match &result {
            Ok(bytes) => info!(bytes = bytes.len(), "transfer complete"),
            Err(error) => debug!(error = %error, "transfer failed"),
        }
        result
    }

    async fn fetch<F, B>(
        &self,
        url: &str,
        on_progress: &mut F,
        on_bytes: &mut B,
    ) -> Result<Bytes, TransferError>
    where
        F: FnMut(TransferProgress),
        B: FnMut(u64),
    {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransferError::connect_timeout(url, self.settings.connect_timeout.as_secs(), e)
            } else {
                TransferError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::http_status(url, status.as_u16()));
        }

        let bytes_total = response.content_length();
        if bytes_total.is_none() {
            debug!("server did not report a length; progress suppressed");
        }

        let reserve = bytes_total.map_or(0, |total| total.min(MAX_PREALLOCATED_BYTES));
        let mut buffer = BytesMut::with_capacity(usize::try_from(reserve).unwrap_or(0));
        let mut bytes_transferred: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| TransferError::network(url, e))?;
            buffer.extend_from_slice(&chunk);
            bytes_transferred += chunk.len() as u64;
            on_bytes(bytes_transferred);

            if let Some(bytes_total) = bytes_total {
                on_progress(TransferProgress {
                    bytes_transferred,
                    bytes_total,
                });
            }
        }

        if let Some(expected) = bytes_total
            && bytes_transferred < expected
        {
            return Err(TransferError::network_detail(
                url,
                format!("truncated body: expected {expected} bytes, got {bytes_transferred}"),
            ));
        }

        Ok(buffer.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent_midway() {
        let progress = TransferProgress {
            bytes_transferred: 250,
            bytes_total: 1000,
        };
        assert!((progress.percent() - 25.0).abs() < f64::EPSILON);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_progress_percent_clamps_when_server_undercounts() {
        let progress = TransferProgress {
            bytes_transferred: 1500,
            bytes_total: 1000,
        };
        assert!((progress.percent() - 100.0).abs() < f64::EPSILON);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_progress_percent_zero_length_is_complete() {
        let progress = TransferProgress {
            bytes_transferred: 0,
            bytes_total: 0,
        };
        assert!((progress.percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_transfer_settings_default_values() {
        let settings = TransferSettings::default();
        assert_eq!(settings.connect_timeout, Duration::from_secs(30));
        assert_eq!(settings.deadline, Duration::from_secs(300));
    }

    #[test]
    fn test_engine_keeps_supplied_settings() {
        let settings = TransferSettings {
            connect_timeout: Duration::from_secs(5),
            deadline: Duration::from_secs(42),
        };
        let engine = TransferEngine::with_settings(settings);
        assert_eq!(engine.settings(), settings);
    }
}
