//! Per-service failure streak bookkeeping.
//!
//! A [`FailureStreak`] is owned by exactly one check task and never shared.
//! It decides *whether* a status change is due; persisting it and notifying
//! is left to the caller.

use super::status::Status;

/// Consecutive failures that escalate a service to [`Status::MajorOutage`].
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to persist beyond the probe result.
    None,
    /// Force the service into [`Status::MajorOutage`].
    Escalate,
    /// Put the service back into the given status.
    Restore(Status),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureStreak {
    consecutive_failures: u32,
    status_before_streak: Option<Status>,
}

impl FailureStreak {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn status_before_streak(&self) -> Option<Status> {
        self.status_before_streak
    }

    /// Counts a failed probe against a service currently in `current`.
    pub fn record_failure(&mut self, current: Status, threshold: u32) -> Transition {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.consecutive_failures == 1
            && !matches!(
                current,
                Status::Maintenance | Status::MajorOutage | Status::PartialOutage
            )
        {
            self.status_before_streak = Some(current);
        }

        if self.consecutive_failures >= threshold
            && current != Status::Maintenance
            && current != Status::MajorOutage
        {
            Transition::Escalate
        } else {
            Transition::None
        }
    }

    /// The status to restore on a successful probe, if the current outage
    /// was caused by this streak. Does not reset the streak.
    pub fn restoration_target(&self, current: Status, threshold: u32) -> Option<Status> {
        (self.consecutive_failures >= threshold && current == Status::MajorOutage)
            .then(|| self.status_before_streak.unwrap_or(Status::Operational))
    }

    /// Counts a successful probe. The streak is reset unless a restoration is
    /// pending; callers reset it with [`FailureStreak::reset`] once the
    /// restoration has been persisted.
    pub fn record_success(&mut self, current: Status, threshold: u32) -> Transition {
        match self.restoration_target(current, threshold) {
            Some(status) => Transition::Restore(status),
            None => {
                self.reset();
                Transition::None
            }
        }
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.status_before_streak = None;
    }
}
