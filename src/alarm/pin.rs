//! Bounded PIN collection from the keypad.

use heapless::String;

use crate::app::ports::{KeypadPort, TimePort, UiPort};
use crate::config::PIN_LENGTH;
use crate::timer::Deadline;

/// Result of one PIN entry attempt.
///
/// `TimedOut` and `Incorrect` drive the same state transitions but are
/// reported to the user differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOutcome {
    Correct,
    Incorrect,
    TimedOut,
}

/// Collect a full-length PIN. Digits append, backspace removes, accept
/// submits only once all digits are present. The inactivity deadline
/// restarts on every keypress; its expiry yields `None`.
pub fn collect_pin(
    keypad: &mut impl KeypadPort,
    ui: &mut impl UiPort,
    clock: &impl TimePort,
    timeout_secs: u16,
) -> Option<String<PIN_LENGTH>> {
    let mut entered: String<PIN_LENGTH> = String::new();
    let mut deadline = Deadline::after(clock, u64::from(timeout_secs) * 1_000);
    ui.show_pin_progress(0);
    loop {
        if deadline.expired(clock) {
            return None;
        }
        let Some(key) = keypad.poll_key() else {
            clock.sleep_ms(10);
            continue;
        };
        deadline = Deadline::after(clock, u64::from(timeout_secs) * 1_000);

        if let Some(digit) = key.digit() {
            if entered.len() < PIN_LENGTH {
                entered.push((b'0' + digit) as char).ok();
            }
        } else if key.is_backspace() {
            entered.pop();
        } else if key.is_accept() && entered.len() == PIN_LENGTH {
            return Some(entered);
        }
        ui.show_pin_progress(entered.len());
    }
}

/// Collect a PIN and compare it against `expected`.
pub fn pin_entry_outcome(
    keypad: &mut impl KeypadPort,
    ui: &mut impl UiPort,
    clock: &impl TimePort,
    expected: &str,
    timeout_secs: u16,
) -> PinOutcome {
    match collect_pin(keypad, ui, clock, timeout_secs) {
        None => PinOutcome::TimedOut,
        Some(entered) if entered.as_str() == expected => PinOutcome::Correct,
        Some(_) => PinOutcome::Incorrect,
    }
}
