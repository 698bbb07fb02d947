//! Player: owner of the active media source and its readiness race.
//!
//! Every [`Player::load`] starts a new assignment. The previous assignment's
//! race is cancelled and its listeners detached before the new race is
//! armed, so a late platform event for the old source cannot leak into the
//! new outcome.

mod surface;

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::readiness::{ReadinessDetector, ReadinessOutcome};

pub use surface::{PlayerSurface, SurfaceError};

/// Highest volume level accepted by [`Player::set_volume`].
pub const MAX_VOLUME: u8 = 100;

/// Where a media source comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOrigin {
    /// Direct playback of a remote URL.
    Remote(Url),
    /// A file in local storage.
    Local(PathBuf),
}

impl MediaOrigin {
    /// Interprets `input` as an http(s) URL, or otherwise as a local path.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Remote(url),
            _ => Self::Local(PathBuf::from(input)),
        }
    }
}

impl fmt::Display for MediaOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The source currently assigned to a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    /// Where the media comes from.
    pub origin: MediaOrigin,
    /// When it was assigned.
    pub assigned_at: SystemTime,
}

/// Errors returned by [`Player`] operations.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// A transport command was issued with no source assigned.
    #[error("no media source assigned")]
    NoSource,

    /// Another load replaced this source before its readiness race resolved.
    #[error("load of {origin} was superseded by a newer source")]
    Superseded {
        /// The abandoned source.
        origin: String,
    },

    /// The media reported a decode error while loading.
    #[error("media failed to load: {reason}")]
    Media {
        /// Reason reported by the surface.
        reason: String,
    },

    /// The platform player rejected a command.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

struct Assignment {
    source: MediaSource,
    generation: u64,
    cancel: CancellationToken,
}

/// Owns the active [`MediaSource`] and forwards transport commands to a surface.
pub struct Player<S> {
    surface: Arc<S>,
    detector: ReadinessDetector,
    current: Mutex<Option<Assignment>>,
    next_generation: AtomicU64,
}

impl<S> fmt::Debug for Player<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("detector", &self.detector)
            .field(
                "current",
                &self.lock_current().as_ref().map(|a| a.source.clone()),
            )
            .finish_non_exhaustive()
    }
}

impl<S: PlayerSurface> Player<S> {
    /// Creates a player over `surface` using `detector` for every load.
    pub fn new(surface: Arc<S>, detector: ReadinessDetector) -> Self {
        Self {
            surface,
            detector,
            current: Mutex::new(None),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Returns the underlying surface.
    #[must_use]
    pub fn surface(&self) -> &Arc<S> {
        &self.surface
    }

    /// Returns the active source, if any.
    #[must_use]
    pub fn current_source(&self) -> Option<MediaSource> {
        self.lock_current().as_ref().map(|a| a.source.clone())
    }

    /// Assigns `origin`, triggers loading and waits for its readiness outcome.
    ///
    /// `TimedOut` is returned as an outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` if:
    /// - Another `load` superseded this one before it resolved (`Superseded`)
    /// - The surface rejects the source or the load (`Surface`)
    #[instrument(skip(self), fields(origin = %origin))]
    pub async fn load(&self, origin: MediaOrigin) -> Result<ReadinessOutcome, PlayerError> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let label = origin.to_string();

        let previous = self.lock_current().replace(Assignment {
            source: MediaSource {
                origin: origin.clone(),
                assigned_at: SystemTime::now(),
            },
            generation,
            cancel: cancel.clone(),
        });
        if let Some(previous) = previous {
            previous.cancel.cancel();
            self.surface.detach_listeners(previous.generation);
            debug!(
                superseded = previous.generation,
                generation, "replaced active source"
            );
        }

        if let Err(error) = self.surface.assign_source(&origin) {
            self.clear_if_current(generation);
            return Err(error.into());
        }

        let race = self.detector.arm(self.surface.as_ref(), generation);
        if let Err(error) = self.surface.load() {
            drop(race);
            self.surface.detach_listeners(generation);
            self.clear_if_current(generation);
            return Err(error.into());
        }

        let outcome = race
            .run(self.surface.as_ref(), &cancel)
            .await
            .ok_or(PlayerError::Superseded { origin: label })?;
        info!(generation, outcome = %outcome, "source load finished");
        Ok(outcome)
    }

    /// Loads `origin` and starts playback when the outcome is playable.
    ///
    /// `TimedOut` proceeds optimistically.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`load`](Self::load), plus `Media` when the
    /// surface reported a decode error.
    pub async fn play_source(&self, origin: MediaOrigin) -> Result<ReadinessOutcome, PlayerError> {
        let outcome = self.load(origin).await?;
        match &outcome {
            ReadinessOutcome::Failed(reason) => {
                return Err(PlayerError::Media {
                    reason: reason.clone(),
                });
            }
            ReadinessOutcome::TimedOut => {
                warn!("no readiness signal before deadline; starting playback anyway");
            }
            ReadinessOutcome::Ready => {}
        }
        self.play()?;
        Ok(outcome)
    }

    /// Starts or resumes playback.
    ///
    /// # Errors
    ///
    /// Returns `NoSource` without an assigned source, or the surface's error.
    pub fn play(&self) -> Result<(), PlayerError> {
        self.require_source()?;
        self.surface.play().map_err(Into::into)
    }

    /// Pauses playback.
    ///
    /// # Errors
    ///
    /// Returns `NoSource` without an assigned source, or the surface's error.
    pub fn pause(&self) -> Result<(), PlayerError> {
        self.require_source()?;
        self.surface.pause().map_err(Into::into)
    }

    /// Stops playback and rewinds.
    ///
    /// # Errors
    ///
    /// Returns `NoSource` without an assigned source, or the surface's error.
    pub fn stop(&self) -> Result<(), PlayerError> {
        self.require_source()?;
        self.surface.stop().map_err(Into::into)
    }

    /// Seeks relative to the current position, clamped to `[0, duration]`.
    ///
    /// Returns the position sought to.
    ///
    /// # Errors
    ///
    /// Returns `NoSource` without an assigned source, or the surface's error.
    pub fn seek_by(&self, offset_secs: i64) -> Result<Duration, PlayerError> {
        self.require_source()?;
        let position = self.surface.position();
        let magnitude = Duration::from_secs(offset_secs.unsigned_abs());
        let mut target = if offset_secs >= 0 {
            position.saturating_add(magnitude)
        } else {
            position.saturating_sub(magnitude)
        };
        if let Some(duration) = self.surface.duration() {
            target = target.min(duration);
        }
        self.surface.seek(target)?;
        Ok(target)
    }

    /// Sets the volume, clamped to [`MAX_VOLUME`]. Returns the applied level.
    ///
    /// # Errors
    ///
    /// Returns the surface's error.
    pub fn set_volume(&self, level: u8) -> Result<u8, PlayerError> {
        let level = level.min(MAX_VOLUME);
        self.surface.set_volume(level)?;
        Ok(level)
    }

    /// Changes the volume by `delta`, clamped to `0..=MAX_VOLUME`.
    ///
    /// # Errors
    ///
    /// Returns the surface's error.
    pub fn adjust_volume(&self, delta: i16) -> Result<u8, PlayerError> {
        let target = i16::from(self.surface.volume())
            .saturating_add(delta)
            .clamp(0, i16::from(MAX_VOLUME));
        self.set_volume(u8::try_from(target).unwrap_or(MAX_VOLUME))
    }

    fn require_source(&self) -> Result<(), PlayerError> {
        if self.lock_current().is_some() {
            Ok(())
        } else {
            Err(PlayerError::NoSource)
        }
    }

    fn clear_if_current(&self, generation: u64) {
        let mut current = self.lock_current();
        if current.as_ref().is_some_and(|a| a.generation == generation) {
            *current = None;
        }
    }
}

impl<S> Player<S> {
    fn lock_current(&self) -> MutexGuard<'_, Option<Assignment>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_origin_parse_remote() {
        let origin = MediaOrigin::parse("https://cdn.example.com/a.mp4");
        assert!(matches!(origin, MediaOrigin::Remote(_)));
    }

    #[test]
    fn test_media_origin_parse_local_paths() {
        assert_eq!(
            MediaOrigin::parse("/media/videos/a.mp4"),
            MediaOrigin::Local(PathBuf::from("/media/videos/a.mp4"))
        );
        assert_eq!(
            MediaOrigin::parse("videos/a.mp4"),
            MediaOrigin::Local(PathBuf::from("videos/a.mp4"))
        );
    }

    #[test]
    fn test_media_origin_display() {
        let origin = MediaOrigin::parse("https://cdn.example.com/a.mp4");
        assert_eq!(origin.to_string(), "https://cdn.example.com/a.mp4");
    }

    #[test]
    fn test_player_error_messages() {
        assert_eq!(PlayerError::NoSource.to_string(), "no media source assigned");
        let error = PlayerError::from(SurfaceError::new("widget gone"));
        assert!(error.to_string().contains("widget gone"));
    }
}
