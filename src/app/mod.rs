//! Application layer: ports, events and the top-level service loop.

pub mod events;
pub mod ports;
pub mod service;

pub use events::AppEvent;
pub use service::{AlarmService, LoopAction};
