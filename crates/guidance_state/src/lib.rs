//! Pure guidance-unlock state for the tutoring client.
//!
//! This crate intentionally defines only the qualifying-turn counters and the
//! one-shot "use guidance next turn" toggle. It excludes transport payloads,
//! session bookkeeping, and transcript concerns.

use std::fmt;

/// Qualifying-turn counters reported by the server for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnProgress {
    pub attempts: u32,
    pub threshold: u32,
}

impl TurnProgress {
    #[must_use]
    pub fn new(attempts: u32, threshold: u32) -> Self {
        Self {
            attempts,
            threshold,
        }
    }

    /// Guidance is unlocked once enough qualifying turns have accumulated.
    /// Unknown counters (a zero threshold) stay locked.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.threshold > 0 && self.attempts >= self.threshold
    }

    /// Qualifying turns still needed before guidance unlocks.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.threshold.saturating_sub(self.attempts)
    }
}

impl fmt::Display for TurnProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ready() {
            write!(f, "guidance ready ({}/{})", self.attempts, self.threshold)
        } else {
            write!(
                f,
                "{}/{} qualifying turns ({} to go)",
                self.attempts,
                self.threshold,
                self.remaining()
            )
        }
    }
}

/// Readiness transition reported by [`GuidanceGate::apply_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockChange {
    Unlocked,
    Locked,
}

/// Guidance unlock state machine for the active session.
///
/// Wraps [`TurnProgress`] with the per-turn opt-in toggle. The toggle can only
/// be armed while guidance is unlocked, and is consumed exactly once per send:
/// [`GuidanceGate::consume_for_send`] reads the effective flag and
/// [`GuidanceGate::finish_send`] clears it once the send settles, whether the
/// send succeeded or failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuidanceGate {
    progress: TurnProgress,
    toggle: bool,
    toggle_consumed: bool,
    unlock_notice: bool,
}

impl GuidanceGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn progress(&self) -> TurnProgress {
        self.progress
    }

    #[must_use]
    pub fn ready(&self) -> bool {
        self.progress.ready()
    }

    #[must_use]
    pub fn toggle(&self) -> bool {
        self.toggle
    }

    /// Applies counters reported by the server and returns the readiness
    /// transition, if any.
    ///
    /// Crossing into readiness arms a one-shot unlock notice. Dropping out of
    /// readiness (e.g. switching to a less-advanced session) clears the toggle
    /// and any notice that has not been presented yet.
    pub fn apply_progress(&mut self, attempts: u32, threshold: u32) -> Option<UnlockChange> {
        let was_ready = self.progress.ready();
        self.progress = TurnProgress::new(attempts, threshold);
        let is_ready = self.progress.ready();

        match (was_ready, is_ready) {
            (false, true) => {
                self.unlock_notice = true;
                Some(UnlockChange::Unlocked)
            }
            (true, false) => {
                self.toggle = false;
                self.toggle_consumed = false;
                self.unlock_notice = false;
                Some(UnlockChange::Locked)
            }
            _ => None,
        }
    }

    /// Arms or clears the opt-in toggle. No-op (returns false) while guidance
    /// is still locked.
    pub fn set_toggle(&mut self, enabled: bool) -> bool {
        if !self.progress.ready() {
            return false;
        }

        self.toggle = enabled;
        true
    }

    /// Returns the effective guidance flag for the next send and marks the
    /// toggle as consumed. The reset itself is applied by
    /// [`GuidanceGate::finish_send`] so the flag stays visible while the send
    /// is in flight.
    pub fn consume_for_send(&mut self) -> bool {
        let effective = self.progress.ready() && self.toggle;
        if effective {
            self.toggle_consumed = true;
        }

        effective
    }

    /// Settles a send that previously consumed the toggle. The toggle resets
    /// whether the send succeeded, failed, or was aborted.
    pub fn finish_send(&mut self) {
        if self.toggle_consumed {
            self.toggle = false;
            self.toggle_consumed = false;
        }
    }

    /// One-shot presentation flag for the unlock notice.
    pub fn take_unlock_notice(&mut self) -> bool {
        std::mem::take(&mut self.unlock_notice)
    }

    /// Forgets all state, e.g. when switching to a session with unknown
    /// counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
