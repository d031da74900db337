//! Session state for a supervised pipeline run.
//!
//! [`SessionState`] is the little state machine the bus dispatcher drives:
//! whether the pipeline is playing, whether the run is over, and the
//! bookkeeping around the one-time still-frame seek. It is owned by the
//! loop that drives it; nothing else observes or mutates it.

use crate::error::Error;
use std::time::Duration;

/// Mutable state of one supervised run.
///
/// Invariants, enforced here and checked by tests:
/// - `terminate` is monotonic: once set it never clears.
/// - `seek_done` latches at most once, and only while playing.
/// - `duration` drops back to unknown on every duration-changed event.
#[derive(Debug, Default)]
pub struct SessionState {
    playing: bool,
    terminate: bool,
    seek_enabled: bool,
    seek_done: bool,
    duration: Option<Duration>,
    failure: Option<Error>,
}

impl SessionState {
    /// Fresh state: not playing, not terminated, seek not possible yet,
    /// duration unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the pipeline is currently in the playing state.
    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Whether the run is over.
    pub fn terminated(&self) -> bool {
        self.terminate
    }

    /// Whether the stream reported itself seekable.
    pub fn seek_enabled(&self) -> bool {
        self.seek_enabled
    }

    /// Whether the one-time seek has been issued.
    pub fn seek_done(&self) -> bool {
        self.seek_done
    }

    /// The cached stream duration, if known.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Record whether the pipeline is playing.
    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Record the result of a seeking-capability query.
    pub fn enable_seek(&mut self, enabled: bool) {
        self.seek_enabled = enabled;
    }

    /// Mark the run as over. There is deliberately no way back.
    pub fn terminate(&mut self) {
        self.terminate = true;
    }

    /// Cache a resolved duration.
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = Some(duration);
    }

    /// Forget the cached duration so the next timeout re-queries it.
    pub fn invalidate_duration(&mut self) {
        self.duration = None;
    }

    /// Whether the one-time seek should be issued now, given the most
    /// recently observed position.
    pub fn should_seek(&self, position: Option<Duration>) -> bool {
        self.playing
            && self.seek_enabled
            && !self.seek_done
            && position.is_some_and(|p| p > Duration::ZERO)
    }

    /// Latch the one-time seek as done.
    ///
    /// Returns `false` if it was already latched or the pipeline is not
    /// playing; the latch never resets.
    pub fn latch_seek_done(&mut self) -> bool {
        if self.seek_done || !self.playing {
            return false;
        }
        self.seek_done = true;
        true
    }

    /// Record the fatal error that ended the run.
    ///
    /// The first failure wins; later ones are dropped.
    pub fn record_failure(&mut self, error: Error) {
        self.failure.get_or_insert(error);
    }

    /// Take the recorded failure, if any.
    pub fn take_failure(&mut self) -> Option<Error> {
        self.failure.take()
    }
}
