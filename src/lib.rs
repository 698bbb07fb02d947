//! mediadock core library
//!
//! This library provides the media acquisition core for a single-screen TV
//! player: deciding when an assigned source is safe to play, and
//! downloading videos into a local library that stays in sync with storage.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`storage`] - Async storage gateway trait and its `tokio::fs` implementation
//! - [`transfer`] - HTTP transfer engine with progress, deadline and cancellation
//! - [`readiness`] - First-signal-wins readiness race for assigned sources
//! - [`player`] - Owner of the active media source and transport commands
//! - [`library`] - Download pipeline and on-disk library management

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod library;
pub mod player;
pub mod readiness;
pub mod storage;
pub mod transfer;

// Re-export commonly used types
pub use library::{
    ClearReport, ErrorKind, LibraryEntry, LibraryError, LibraryManager, LibrarySummary,
    TransferState, TransferTask, VIDEOS_DIR,
};
pub use player::{MediaOrigin, MediaSource, Player, PlayerError, PlayerSurface, SurfaceError};
pub use readiness::{ReadinessDetector, ReadinessOutcome, ReadinessSettings};
pub use storage::{FsStorage, StorageError, StorageGateway};
pub use transfer::{TransferEngine, TransferError, TransferProgress, TransferSettings};
