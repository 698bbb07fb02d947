//! Readiness detection for freshly assigned media sources.
//!
//! TV media backends emit the standard readiness events inconsistently, so
//! the detector races four redundant signals and a readiness-level poll
//! against a soft deadline. Whichever producer fires first decides the
//! single [`ReadinessOutcome`]; every other branch is dropped with it.
//!
//! # Example
//!
//! ```no_run
//! use mediadock_core::readiness::{ReadinessDetector, SignalSource};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(surface: &dyn SignalSource) {
//! let detector = ReadinessDetector::default();
//! let race = detector.arm(surface, 1);
//! // ... trigger the load on the surface ...
//! let outcome = race.run(surface, &CancellationToken::new()).await;
//! println!("{outcome:?}");
//! # }
//! ```

mod detector;
mod signal;

pub use detector::{
    ArmedRace, FIRST_POLL_DELAY, POLL_PERIOD, READINESS_DEADLINE, ReadinessDetector,
    ReadinessOutcome, ReadinessSettings,
};
pub use signal::{HAVE_CURRENT_DATA, SignalKind, SignalListener, SignalSource};
