//! Adapters: implementations of the port traits for real hardware and for
//! host-side simulation.
//!
//! Everything that needs ESP-IDF is guarded behind the `espidf` feature;
//! the remaining adapters compile and run on the host for tests.

pub mod console;
pub mod keypad;
pub mod log_sink;
pub mod nvs;
pub mod radio;
pub mod time;

#[cfg(feature = "espidf")]
pub mod uart;
