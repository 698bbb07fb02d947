//! Library manager: download, store, list and delete videos.
//!
//! The manager owns the single-flight download slot. A request runs through
//! validation, the slot check and a pre-flight duplicate check before any
//! network traffic; the fetched bytes are then written through the storage
//! gateway into [`VIDEOS_DIR`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::entry::{
    ClearFailure, ClearReport, LibraryEntry, LibrarySummary, TransferState, TransferTask,
};
use super::error::LibraryError;
use super::naming;
use crate::storage::{FileHandle, StorageError, StorageGateway, join_path};
use crate::transfer::{TransferEngine, TransferError, TransferProgress};

/// Directory, relative to the storage root, holding every library entry.
pub const VIDEOS_DIR: &str = "videos";

struct ActiveTransfer {
    id: u64,
    task: TransferTask,
    cancel: CancellationToken,
}

/// Downloads videos into storage and keeps the visible library in sync with it.
///
/// The library is never cached: every listing is a projection of the storage
/// gateway's view of [`VIDEOS_DIR`], filtered to supported extensions.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use mediadock_core::library::LibraryManager;
/// use mediadock_core::storage::FsStorage;
/// use mediadock_core::transfer::TransferEngine;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = LibraryManager::new(Arc::new(FsStorage::new("./media")), TransferEngine::new());
/// let entry = manager
///     .request_download("https://example.com/clip.mp4", |p| println!("{:.0}%", p.percent()))
///     .await?;
/// println!("stored {}", entry.storage_path);
/// # Ok(())
/// # }
/// ```
pub struct LibraryManager {
    storage: Arc<dyn StorageGateway>,
    engine: TransferEngine,
    slot: Mutex<Option<ActiveTransfer>>,
    next_task_id: AtomicU64,
}

impl std::fmt::Debug for LibraryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryManager")
            .field("engine", &self.engine)
            .field("active_transfer", &self.active_transfer())
            .finish_non_exhaustive()
    }
}

/// Releases the slot on drop, unless a newer transfer has taken it meanwhile.
struct SlotGuard<'a> {
    manager: &'a LibraryManager,
    id: u64,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.manager.lock_slot();
        if slot.as_ref().is_some_and(|active| active.id == self.id) {
            *slot = None;
        }
    }
}

impl LibraryManager {
    /// Creates a manager over `storage`, fetching with `engine`.
    pub fn new(storage: Arc<dyn StorageGateway>, engine: TransferEngine) -> Self {
        Self {
            storage,
            engine,
            slot: Mutex::new(None),
            next_task_id: AtomicU64::new(1),
        }
    }

    /// Downloads `url` into the library and returns the new entry.
    ///
    /// Progress is forwarded to `on_progress` only when the server reports a
    /// length; the [`active_transfer`](Self::active_transfer) snapshot counts
    /// bytes either way. Nothing is retried; callers re-invoke on failure.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if:
    /// - The URL fails syntax or extension checks (`Validation`)
    /// - Another download is active (`Busy`)
    /// - An entry with the same canonical name exists (`Duplicate`), checked before any transfer
    /// - The transfer fails or is cancelled (`Transfer`)
    /// - Creating the directory or writing the file fails (`Storage`)
    #[instrument(skip(self, on_progress), fields(url = %url))]
    pub async fn request_download<F>(
        &self,
        url: &str,
        mut on_progress: F,
    ) -> Result<LibraryEntry, LibraryError>
    where
        F: FnMut(TransferProgress),
    {
        let source = naming::validate_download_url(url)?;
        let base_name = naming::derive_base_name(&source, naming::timestamp_token());
        let (guard, cancel) = self.acquire_slot(&source, &base_name)?;
        debug!(task_id = guard.id, base_name = %base_name, "download accepted");

        self.ensure_videos_dir().await?;
        let existing = self.list_library().await?;
        if let Some(entry) = existing
            .iter()
            .find(|entry| entry.canonical_name() == base_name)
        {
            info!(existing = %entry.file_name, "rejecting duplicate download");
            return Err(LibraryError::Duplicate {
                file_name: base_name,
                existing: entry.file_name.clone(),
            });
        }

        let taken: HashSet<&str> = existing.iter().map(|e| e.file_name.as_str()).collect();
        let file_name =
            naming::unique_stamped_name(&base_name, naming::timestamp_token(), |candidate| {
                taken.contains(candidate)
            });
        self.update_task(guard.id, |task| {
            task.destination_name.clone_from(&file_name);
            task.state = TransferState::InProgress;
        });

        let fetched = self
            .engine
            .transfer_observed(
                source.as_str(),
                |progress| {
                    self.update_task(guard.id, |task| {
                        task.bytes_total = Some(progress.bytes_total);
                    });
                    on_progress(progress);
                },
                |bytes_transferred| {
                    self.update_task(guard.id, |task| {
                        task.bytes_transferred = bytes_transferred;
                    });
                },
                self.engine.settings().deadline,
                &cancel,
            )
            .await;

        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(error) => {
                let state = if error.is_cancelled() {
                    TransferState::Cancelled
                } else {
                    TransferState::Failed
                };
                self.finish_task(guard.id, state);
                return Err(error.into());
            }
        };

        match self.persist(guard.id, &source, &file_name, &bytes, &cancel).await {
            Ok(entry) => {
                info!(
                    path = %entry.storage_path,
                    bytes = entry.size_bytes,
                    "download stored"
                );
                Ok(entry)
            }
            Err(error) => {
                let state = match &error {
                    LibraryError::Transfer(TransferError::Cancelled { .. }) => {
                        TransferState::Cancelled
                    }
                    _ => TransferState::Failed,
                };
                self.finish_task(guard.id, state);
                Err(error)
            }
        }
    }

    /// Cancels the active download, if any, and frees the slot immediately.
    ///
    /// Returns true if a download was active.
    pub fn cancel_download(&self) -> bool {
        let Some(active) = self.lock_slot().take() else {
            return false;
        };
        active.cancel.cancel();
        info!(
            task_id = active.id,
            url = %active.task.source,
            "download cancelled"
        );
        true
    }

    /// Returns a snapshot of the active download, if any.
    #[must_use]
    pub fn active_transfer(&self) -> Option<TransferTask> {
        self.lock_slot().as_ref().map(|active| active.task.clone())
    }

    /// Lists library entries in the storage gateway's order.
    ///
    /// A missing [`VIDEOS_DIR`] is an empty library.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if the directory cannot be listed.
    pub async fn list_library(&self) -> Result<Vec<LibraryEntry>, LibraryError> {
        let files = match self.storage.list_files(VIDEOS_DIR).await {
            Ok(files) => files,
            Err(StorageError::NotFound { .. }) => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        Ok(files
            .into_iter()
            .filter(|file| naming::is_supported_media(&file.name))
            .map(LibraryEntry::from)
            .collect())
    }

    /// Returns the number of entries and their total size.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` if the directory cannot be listed.
    pub async fn summary(&self) -> Result<LibrarySummary, LibraryError> {
        let entries = self.list_library().await?;
        Ok(LibrarySummary {
            entries: entries.len(),
            total_bytes: entries.iter().map(|e| e.size_bytes).sum(),
        })
    }

    /// Deletes one entry, given its storage path or bare file name.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if:
    /// - The path is outside the library or not a supported video (`Validation`)
    /// - The entry does not exist, including when it vanished concurrently (`NotFound`)
    /// - The gateway fails to delete it (`Storage`)
    #[instrument(skip(self))]
    pub async fn delete_entry(&self, path: &str) -> Result<(), LibraryError> {
        let path = if path.contains('/') {
            path.to_string()
        } else {
            join_path(VIDEOS_DIR, path)
        };
        let in_library = path
            .strip_prefix(VIDEOS_DIR)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|name| !name.contains('/') && naming::is_supported_media(name));
        if !in_library {
            return Err(LibraryError::validation(
                path,
                "not a video in the library directory",
            ));
        }

        let handle = self.storage.resolve(&path).await.map_err(|e| match e {
            StorageError::NotFound { .. } => LibraryError::not_found(path.clone()),
            other => other.into(),
        })?;
        self.storage.delete_file(&handle).await.map_err(|e| match e {
            StorageError::NotFound { .. } => LibraryError::not_found(path.clone()),
            other => other.into(),
        })?;
        info!(path = %path, "library entry deleted");
        Ok(())
    }

    /// Deletes every current entry, one at a time, skipping failures.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Storage` only if the initial listing fails;
    /// per-entry failures are collected in the report.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<ClearReport, LibraryError> {
        let entries = self.list_library().await?;
        let mut report = ClearReport::default();

        for entry in entries {
            let handle = FileHandle {
                name: entry.file_name.clone(),
                path: entry.storage_path.clone(),
                size_bytes: entry.size_bytes,
            };
            match self.storage.delete_file(&handle).await {
                Ok(()) => report.removed += 1,
                Err(error) => {
                    warn!(
                        file = %entry.file_name,
                        error = %error,
                        "failed to delete library entry; skipping"
                    );
                    report.failures.push(ClearFailure {
                        file_name: entry.file_name,
                        error,
                    });
                }
            }
        }

        info!(
            removed = report.removed,
            failed = report.failures.len(),
            "library cleared"
        );
        Ok(report)
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<ActiveTransfer>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire_slot(
        &self,
        source: &Url,
        base_name: &str,
    ) -> Result<(SlotGuard<'_>, CancellationToken), LibraryError> {
        let mut slot = self.lock_slot();
        if let Some(active) = slot.as_ref() {
            return Err(LibraryError::Busy {
                active_url: active.task.source.to_string(),
            });
        }

        let id = self.next_task_id.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        *slot = Some(ActiveTransfer {
            id,
            task: TransferTask::new(source.clone(), base_name.to_string()),
            cancel: cancel.clone(),
        });
        Ok((SlotGuard { manager: self, id }, cancel))
    }

    fn update_task(&self, id: u64, update: impl FnOnce(&mut TransferTask)) {
        if let Some(active) = self.lock_slot().as_mut()
            && active.id == id
        {
            update(&mut active.task);
        }
    }

    fn finish_task(&self, id: u64, state: TransferState) {
        self.update_task(id, |task| task.state = state);
        debug!(task_id = id, state = %state, "transfer task finished");
    }

    async fn ensure_videos_dir(&self) -> Result<(), LibraryError> {
        match self.storage.create_directory(VIDEOS_DIR).await {
            Ok(()) | Err(StorageError::AlreadyExists { .. }) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    /// Writes `bytes` to `videos/<file_name>` and commits the entry.
    ///
    /// Cancellation is honoured up to the commit: a token cancelled while the
    /// file is being created or written removes the file and yields
    /// `Cancelled`. Once committed, the slot is already released so a late
    /// [`cancel_download`](Self::cancel_download) finds nothing to cancel.
    async fn persist(
        &self,
        id: u64,
        source: &Url,
        file_name: &str,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<LibraryEntry, LibraryError> {
        if cancel.is_cancelled() {
            debug!(bytes = bytes.len(), "discarding bytes of cancelled transfer");
            return Err(TransferError::cancelled(source.as_str()).into());
        }

        let path = join_path(VIDEOS_DIR, file_name);
        let handle = self.storage.create_file(&path).await?;

        let written: Result<(), LibraryError> = if cancel.is_cancelled() {
            Err(TransferError::cancelled(source.as_str()).into())
        } else {
            self.write_all(&handle, bytes).await.map_err(LibraryError::from)
        };

        let outcome: Result<LibraryEntry, LibraryError> = match written {
            Ok(()) if self.commit(id, cancel) => {
                return Ok(LibraryEntry {
                    file_name: file_name.to_string(),
                    size_bytes: bytes.len() as u64,
                    storage_path: path,
                });
            }
            Ok(()) => Err(TransferError::cancelled(source.as_str()).into()),
            Err(error) => Err(error),
        };

        if let Err(cleanup) = self.storage.delete_file(&handle).await {
            debug!(path = %path, error = %cleanup, "could not remove partial file");
        }
        outcome
    }

    /// Releases the slot for a finished write unless the task was cancelled.
    ///
    /// The check and the release happen under one lock, so a cancel either
    /// lands before (and the write is rolled back) or finds the slot empty.
    fn commit(&self, id: u64, cancel: &CancellationToken) -> bool {
        let mut slot = self.lock_slot();
        let still_active = slot.as_ref().is_some_and(|active| active.id == id);
        if cancel.is_cancelled() || !still_active {
            return false;
        }
        *slot = None;
        debug!(task_id = id, state = %TransferState::Completed, "transfer task finished");
        true
    }

    async fn write_all(&self, handle: &FileHandle, bytes: &[u8]) -> Result<(), StorageError> {
        let mut stream = self.storage.open_stream(handle).await?;
        stream.write(bytes).await?;
        stream.close().await
    }
}
