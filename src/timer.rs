//! Millisecond deadline helpers over the monotonic [`TimePort`].
//!
//! Every suspension point in the firmware is a bounded polling loop on one
//! of these: a `Deadline` for one-shot waits (PIN entry, dialogs, pairing)
//! or a `Countdown` for recurring checks (sensor health, the alert grace
//! timer). Expiry always yields a defined outcome, never an unbounded hang.

use crate::app::ports::TimePort;

/// One-shot deadline.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at_ms: u64,
}

impl Deadline {
    /// A deadline `ms` milliseconds from now.
    pub fn after(clock: &impl TimePort, ms: u64) -> Self {
        Self {
            at_ms: clock.now_ms().saturating_add(ms),
        }
    }

    pub fn expired(&self, clock: &impl TimePort) -> bool {
        clock.now_ms() >= self.at_ms
    }
}

/// Resettable countdown with a fixed period.
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    period_ms: u64,
    started_ms: u64,
}

impl Countdown {
    pub fn new(clock: &impl TimePort, period_ms: u64) -> Self {
        Self {
            period_ms,
            started_ms: clock.now_ms(),
        }
    }

    /// Restart the full period from now.
    pub fn reset(&mut self, clock: &impl TimePort) {
        self.started_ms = clock.now_ms();
    }

    pub fn expired(&self, clock: &impl TimePort) -> bool {
        clock.now_ms().saturating_sub(self.started_ms) >= self.period_ms
    }
}
