use std::time::{Duration, Instant};

/// A single one-shot action due at a point in time.
///
/// Scheduling replaces whatever was pending; `cancel` drops it so a stale
/// action can never fire after the owner has reset.
#[derive(Debug, Clone, PartialEq)]
pub struct Deferred<T> {
    pending: Option<(Instant, T)>,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> Deferred<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Instant, action: T) {
        self.pending = Some((due, action));
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, action)| action)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, action)| action)
    }

    /// Time left until the pending action is due (zero once overdue)
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(due, _)| due.saturating_duration_since(now))
    }

    /// Removes and returns the action if it is due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((due, _)) if due <= now => self.cancel(),
            _ => None,
        }
    }
}
