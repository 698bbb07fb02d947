//! Readiness signals and the listener handles given to the player surface.

use std::fmt;

use tokio::sync::mpsc;

/// `HTMLMediaElement.readyState` level at which current-frame data is available.
pub const HAVE_CURRENT_DATA: u8 = 2;

/// Kinds of readiness signal a player surface can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// The whole resource is buffered (`canplaythrough`).
    FullyBuffered,
    /// Enough data to start playing (`canplay`).
    PartialData,
    /// The first frame is decodable (`loadeddata`).
    FirstFrame,
    /// Decoding or fetching failed (`error`).
    DecodeError,
}

impl SignalKind {
    /// Every kind, in the order listeners are armed.
    pub const ALL: [Self; 4] = [
        Self::FullyBuffered,
        Self::PartialData,
        Self::FirstFrame,
        Self::DecodeError,
    ];

    /// Returns true for the kinds that resolve a race as ready.
    #[must_use]
    pub fn is_success(self) -> bool {
        !matches!(self, Self::DecodeError)
    }

    /// Returns the string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullyBuffered => "fully_buffered",
            Self::PartialData => "partial_data",
            Self::FirstFrame => "first_frame",
            Self::DecodeError => "decode_error",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub(crate) struct Signal {
    pub(crate) kind: SignalKind,
    pub(crate) detail: Option<String>,
}

/// A listener armed for one signal kind of one source assignment.
///
/// The surface keeps the listener and calls [`fire`](Self::fire) when the
/// platform event occurs. Once the race it belongs to has resolved or been
/// abandoned, firing is a no-op and returns `false`.
#[derive(Debug, Clone)]
pub struct SignalListener {
    kind: SignalKind,
    generation: u64,
    tx: mpsc::UnboundedSender<Signal>,
}

impl SignalListener {
    pub(crate) fn new(kind: SignalKind, generation: u64, tx: mpsc::UnboundedSender<Signal>) -> Self {
        Self {
            kind,
            generation,
            tx,
        }
    }

    /// The signal kind this listener reports.
    #[must_use]
    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    /// The source assignment this listener was armed for.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true while the race can still receive this listener's signal.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Reports the signal. Returns false if the race is already over.
    pub fn fire(&self) -> bool {
        self.send(None)
    }

    /// Reports the signal with a detail message, used as the failure reason
    /// for [`SignalKind::DecodeError`].
    pub fn fire_with(&self, detail: impl Into<String>) -> bool {
        self.send(Some(detail.into()))
    }

    fn send(&self, detail: Option<String>) -> bool {
        self.tx
            .send(Signal {
                kind: self.kind,
                detail,
            })
            .is_ok()
    }
}

/// The part of a player surface the readiness detector consumes.
pub trait SignalSource: Send + Sync {
    /// Keeps `listener` and fires it when its signal occurs.
    fn attach_listener(&self, listener: SignalListener);

    /// Drops every listener armed for `generation`.
    fn detach_listeners(&self, generation: u64);

    /// Current numeric readiness level (`HTMLMediaElement.readyState`, 0..=4).
    fn ready_state(&self) -> u8;
}
