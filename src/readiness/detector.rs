//! First-signal-wins race deciding when an assigned source is playable.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::signal::{HAVE_CURRENT_DATA, Signal, SignalKind, SignalListener, SignalSource};

/// Default time to wait for any readiness signal (15 seconds).
pub const READINESS_DEADLINE: Duration = Duration::from_secs(15);

/// Delay before the first readiness-level poll.
pub const FIRST_POLL_DELAY: Duration = Duration::from_secs(1);

/// Period between readiness-level polls.
pub const POLL_PERIOD: Duration = Duration::from_secs(2);

const DEFAULT_DECODE_FAILURE: &str = "media decode error";

/// How a readiness race resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// A success signal fired or the polled level reached the threshold.
    Ready,
    /// The decode-error signal fired first.
    Failed(String),
    /// Nothing conclusive before the deadline. Not an error: some platforms
    /// never emit a ready event for valid media, so playback proceeds.
    TimedOut,
}

impl ReadinessOutcome {
    /// Returns true for `Ready` and `TimedOut`.
    #[must_use]
    pub fn is_playable(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ReadinessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Timers and threshold used by the readiness race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessSettings {
    /// Deadline after which the race resolves as `TimedOut`.
    pub deadline: Duration,
    /// Delay before the first readiness-level poll.
    pub first_poll: Duration,
    /// Period between subsequent polls. Must be non-zero.
    pub poll_period: Duration,
    /// Readiness level counted as ready when polled.
    pub ready_threshold: u8,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            deadline: READINESS_DEADLINE,
            first_poll: FIRST_POLL_DELAY,
            poll_period: POLL_PERIOD,
            ready_threshold: HAVE_CURRENT_DATA,
        }
    }
}

/// Arms readiness races for source assignments.
#[derive(Debug, Clone, Default)]
pub struct ReadinessDetector {
    settings: ReadinessSettings,
}

impl ReadinessDetector {
    /// Creates a detector with the given timers.
    #[must_use]
    pub fn new(settings: ReadinessSettings) -> Self {
        Self { settings }
    }

    /// Returns the detector's timers.
    #[must_use]
    pub fn settings(&self) -> ReadinessSettings {
        self.settings
    }

    /// Attaches one listener per [`SignalKind`] for `generation`.
    ///
    /// Arm before triggering the load so early signals are not missed.
    /// Signals fired between arming and [`ArmedRace::run`] are queued.
    pub fn arm<S>(&self, source: &S, generation: u64) -> ArmedRace
    where
        S: SignalSource + ?Sized,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        for kind in SignalKind::ALL {
            source.attach_listener(SignalListener::new(kind, generation, tx.clone()));
        }
        debug!(generation, "readiness listeners armed");
        ArmedRace {
            settings: self.settings,
            generation,
            rx,
        }
    }
}

/// A race whose listeners are attached but whose timers have not started.
///
/// Dropping it without running disarms every listener.
#[derive(Debug)]
pub struct ArmedRace {
    settings: ReadinessSettings,
    generation: u64,
    rx: mpsc::UnboundedReceiver<Signal>,
}

impl ArmedRace {
    /// The assignment this race belongs to.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Runs the race to its single outcome.
    ///
    /// The first of these wins: a success signal or a poll at or above the
    /// threshold (`Ready`), the decode-error signal (`Failed`), the deadline
    /// (`TimedOut`). Returns `None` if `cancel` fires first because the
    /// assignment was superseded. Either way, every listener is disarmed and
    /// detached from `source` before returning.
    pub async fn run<S>(mut self, source: &S, cancel: &CancellationToken) -> Option<ReadinessOutcome>
    where
        S: SignalSource + ?Sized,
    {
        let settings = self.settings;
        let started = Instant::now();
        let deadline = tokio::time::sleep(settings.deadline);
        tokio::pin!(deadline);
        let period = settings.poll_period.max(Duration::from_millis(1));
        let mut poll = tokio::time::interval_at(started + settings.first_poll, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break None,
                Some(signal) = self.rx.recv() => {
                    debug!(generation = self.generation, signal = %signal.kind, "readiness signal");
                    break Some(outcome_for(signal));
                }
                // Polled before the deadline so a ready level wins a tie.
                _ = poll.tick() => {
                    let level = source.ready_state();
                    trace!(generation = self.generation, level, "polled readiness level");
                    if level >= settings.ready_threshold {
                        break Some(ReadinessOutcome::Ready);
                    }
                }
                () = &mut deadline => break Some(ReadinessOutcome::TimedOut),
            }
        };

        self.rx.close();
        source.detach_listeners(self.generation);

        match &outcome {
            Some(outcome) => info!(
                generation = self.generation,
                outcome = %outcome,
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "readiness resolved"
            ),
            None => debug!(generation = self.generation, "readiness race abandoned"),
        }
        outcome
    }
}

fn outcome_for(signal: Signal) -> ReadinessOutcome {
    if signal.kind.is_success() {
        ReadinessOutcome::Ready
    } else {
        ReadinessOutcome::Failed(
            signal
                .detail
                .unwrap_or_else(|| DEFAULT_DECODE_FAILURE.to_string()),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU8, Ordering};

    use super::*;

    #[derive(Default)]
    struct StubSource {
        listeners: Mutex<Vec<SignalListener>>,
        level: AtomicU8,
        detached: Mutex<Vec<u64>>,
    }

    impl StubSource {
        fn fire(&self, kind: SignalKind) -> bool {
            let listeners = self.listeners.lock().unwrap();
            listeners
                .iter()
                .filter(|l| l.kind() == kind)
                .map(SignalListener::fire)
                .fold(false, |any, fired| any || fired)
        }
    }

    impl SignalSource for StubSource {
        fn attach_listener(&self, listener: SignalListener) {
            self.listeners.lock().unwrap().push(listener);
        }

        fn detach_listeners(&self, generation: u64) {
            self.listeners
                .lock()
                .unwrap()
                .retain(|l| l.generation() != generation);
            self.detached.lock().unwrap().push(generation);
        }

        fn ready_state(&self) -> u8 {
            self.level.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_arm_attaches_one_listener_per_kind() {
        let source = StubSource::default();
        let race = ReadinessDetector::default().arm(&source, 3);

        let listeners = source.listeners.lock().unwrap();
        assert_eq!(listeners.len(), 4);
        assert!(listeners.iter().all(|l| l.generation() == 3));
        drop(listeners);
        assert_eq!(race.generation(), 3);
    }

    #[test]
    fn test_dropping_armed_race_disarms_listeners() {
        let source = StubSource::default();
        let race = ReadinessDetector::default().arm(&source, 1);
        drop(race);
        assert!(!source.fire(SignalKind::FirstFrame));
    }

    #[tokio::test]
    async fn test_signal_queued_before_run_resolves_ready() {
        let source = StubSource::default();
        let race = ReadinessDetector::default().arm(&source, 1);
        assert!(source.fire(SignalKind::PartialData));

        let outcome = race.run(&source, &CancellationToken::new()).await;

        assert_eq!(outcome, Some(ReadinessOutcome::Ready));
        assert_eq!(*source.detached.lock().unwrap(), vec![1]);
        assert!(source.listeners.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_race_returns_none() {
        let source = StubSource::default();
        let race = ReadinessDetector::default().arm(&source, 1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(race.run(&source, &cancel).await, None);
    }

    #[tokio::test]
    async fn test_poll_resolves_ready_when_level_reached() {
        tokio::time::pause();
        let source = StubSource::default();
        source.level.store(HAVE_CURRENT_DATA, Ordering::SeqCst);
        let race = ReadinessDetector::default().arm(&source, 1);
        let started = Instant::now();

        let outcome = race.run(&source, &CancellationToken::new()).await;

        assert_eq!(outcome, Some(ReadinessOutcome::Ready));
        let elapsed = started.elapsed();
        assert!(elapsed >= FIRST_POLL_DELAY, "resolved too early: {elapsed:?}");
        assert!(elapsed < FIRST_POLL_DELAY + POLL_PERIOD, "missed first poll: {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_poll_on_deadline_instant_beats_timeout() {
        let source = StubSource::default();
        // Polls at 1 s and 3 s; the second lands exactly on the deadline.
        let detector = ReadinessDetector::new(ReadinessSettings {
            deadline: Duration::from_secs(3),
            ..ReadinessSettings::default()
        });
        let race = detector.arm(&source, 1);
        let started = Instant::now();

        let cancel = CancellationToken::new();
        let (outcome, ()) = tokio::join!(race.run(&source, &cancel), async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            source.level.store(HAVE_CURRENT_DATA, Ordering::SeqCst);
        });

        assert_eq!(outcome, Some(ReadinessOutcome::Ready));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "resolved before the tie: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(4), "resolved late: {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_level_on_deadline_instant_times_out() {
        let source = StubSource::default();
        let detector = ReadinessDetector::new(ReadinessSettings {
            deadline: Duration::from_secs(3),
            ..ReadinessSettings::default()
        });
        let race = detector.arm(&source, 1);

        let outcome = race.run(&source, &CancellationToken::new()).await;

        assert_eq!(outcome, Some(ReadinessOutcome::TimedOut));
    }

    #[test]
    fn test_outcome_playability() {
        assert!(ReadinessOutcome::Ready.is_playable());
        assert!(ReadinessOutcome::TimedOut.is_playable());
        assert!(!ReadinessOutcome::Failed("x".to_string()).is_playable());
    }

    #[test]
    fn test_decode_error_without_detail_uses_default_reason() {
        let outcome = outcome_for(Signal {
            kind: SignalKind::DecodeError,
            detail: None,
        });
        assert_eq!(outcome, ReadinessOutcome::Failed(DEFAULT_DECODE_FAILURE.to_string()));
    }
}
