//! HTTP transfer engine for fetching remote media.
//!
//! This module fetches a remote resource into memory with streaming progress
//! so the library manager can persist it in one write.
//!
//! # Features
//!
//! - Streaming body reads with percentage progress when the length is known
//! - Whole-transfer deadline (5 minutes by default) and 30s connect timeout
//! - Cooperative cancellation through a `CancellationToken`
//! - Structured error types with the failing URL attached

mod client;
mod constants;
mod error;

pub use client::{TransferEngine, TransferProgress, TransferSettings};
pub use constants::{CONNECT_TIMEOUT_SECS, TRANSFER_DEADLINE_SECS};
pub use error::TransferError;
