//! Alarm lifecycle: PIN entry, timed dialogs and the orchestrating
//! state machine.

pub mod controller;
pub mod dialog;
pub mod pin;

pub use controller::{AlarmController, StateOutcome};
pub use dialog::{choice_dialog, Choice};
pub use pin::{collect_pin, pin_entry_outcome, PinOutcome};
