//! Media library: download pipeline and on-disk entry management.
//!
//! # Overview
//!
//! - [`LibraryManager`] - single-flight downloads, listing, delete and clear
//! - [`LibraryEntry`] - a stored video, derived from the storage listing
//! - [`TransferTask`] - snapshot of the active download
//! - [`LibraryError`] - operation errors with a stable [`ErrorKind`] tag
//! - [`naming`] - filename derivation and collision-free naming

mod entry;
mod error;
mod manager;
pub mod naming;

pub use entry::{
    ClearFailure, ClearReport, LibraryEntry, LibrarySummary, TransferState, TransferTask,
};
pub use error::{ErrorKind, LibraryError};
pub use manager::{LibraryManager, VIDEOS_DIR};
pub use naming::SUPPORTED_EXTENSIONS;
