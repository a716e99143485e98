//! Explicit timer handles owned by the challenge state machine.
//!
//! A cancelled handle is gone from the set, so it can never fire later.

/// The timers the alarm flow can have armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    /// Stop pressed -> challenge appears.
    ChallengeDelay,
    /// Challenge shown -> time is up.
    AnswerTimeout,
    /// Short pause after success, failure, or timeout.
    Transition,
    /// Next attempt after a failed challenge fetch.
    FetchRetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    pub kind: TimerKind,
    pub due_ms: u64,
}

#[derive(Debug, Default, Clone)]
pub struct TimerSet {
    armed: Vec<TimerHandle>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind`, replacing any handle of the same kind.
    pub fn arm(&mut self, kind: TimerKind, now_ms: u64, delay_ms: u64) -> TimerHandle {
        self.cancel(kind);
        let handle = TimerHandle {
            kind,
            due_ms: now_ms + delay_ms,
        };
        self.armed.push(handle);
        handle
    }

    pub fn cancel(&mut self, kind: TimerKind) -> Option<TimerHandle> {
        let pos = self.armed.iter().position(|h| h.kind == kind)?;
        Some(self.armed.swap_remove(pos))
    }

    pub fn cancel_all(&mut self) {
        self.armed.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.iter().any(|h| h.kind == kind)
    }

    pub fn get(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.armed.iter().copied().find(|h| h.kind == kind)
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.armed.iter().map(|h| h.due_ms).min()
    }

    /// Remove and return the earliest handle due at `now_ms`, if any.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<TimerHandle> {
        let (pos, _) = self
            .armed
            .iter()
            .enumerate()
            .filter(|(_, h)| h.due_ms <= now_ms)
            .min_by_key(|(_, h)| (h.due_ms, h.kind))?;
        Some(self.armed.swap_remove(pos))
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}
