//! Two-option timed dialog.

use crate::app::ports::{KeypadPort, TimePort};
use crate::timer::Deadline;

/// Outcome of a [`choice_dialog`]. Callers map `TimedOut` onto their
/// context's default option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    OptionA,
    OptionB,
    TimedOut,
}

/// Block until the user picks option A or B, or the deadline passes.
pub fn choice_dialog(
    keypad: &mut impl KeypadPort,
    clock: &impl TimePort,
    timeout_secs: u16,
) -> Choice {
    let deadline = Deadline::after(clock, u64::from(timeout_secs) * 1_000);
    loop {
        if deadline.expired(clock) {
            return Choice::TimedOut;
        }
        match keypad.poll_key() {
            Some(key) if key.is_option_a() => return Choice::OptionA,
            Some(key) if key.is_option_b() => return Choice::OptionB,
            _ => clock.sleep_ms(10),
        }
    }
}
