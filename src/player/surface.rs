//! The platform player surface consumed by [`Player`](super::Player).

use std::time::Duration;

use thiserror::Error;

use super::MediaOrigin;
use crate::readiness::SignalSource;

/// Failure reported by the platform player.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("player surface error: {0}")]
pub struct SurfaceError(pub String);

impl SurfaceError {
    /// Creates a surface error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Platform media widget: source assignment, transport and readiness signals.
///
/// Implementations forward to the platform player. Readiness listeners
/// handed over through [`SignalSource::attach_listener`] must be fired when
/// the matching platform event occurs and dropped on
/// [`SignalSource::detach_listeners`].
pub trait PlayerSurface: SignalSource {
    /// Assigns a new source. Does not start loading.
    fn assign_source(&self, origin: &MediaOrigin) -> Result<(), SurfaceError>;

    /// Starts loading the assigned source.
    fn load(&self) -> Result<(), SurfaceError>;

    /// Starts or resumes playback.
    fn play(&self) -> Result<(), SurfaceError>;

    /// Pauses playback.
    fn pause(&self) -> Result<(), SurfaceError>;

    /// Stops playback and rewinds to the start.
    fn stop(&self) -> Result<(), SurfaceError>;

    /// Moves the playhead to `position`.
    fn seek(&self, position: Duration) -> Result<(), SurfaceError>;

    /// Sets the volume level, 0..=100.
    fn set_volume(&self, level: u8) -> Result<(), SurfaceError>;

    /// Current volume level, 0..=100.
    fn volume(&self) -> u8;

    /// Current playhead position.
    fn position(&self) -> Duration;

    /// Media duration, when known.
    fn duration(&self) -> Option<Duration>;
}
