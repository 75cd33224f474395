//! Outbound application events.
//!
//! The service emits these through the [`EventSink`](super::ports::EventSink)
//! port. Adapters on the other side decide what to do with them — log to
//! serial, forward to the companion, etc.

use crate::bridge::types::NetworkInfo;
use crate::mesh::wire::SensorKind;
use crate::status::{AlertCause, ArmState};

/// Structured events emitted by the alarm core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service finished booting (carries the initial state).
    Started(ArmState),

    /// The alarm moved between lifecycle states.
    StateChanged { from: ArmState, to: ArmState },

    /// The alarm entered Alert, with the cause.
    AlertRaised(AlertCause),

    /// An arm attempt was refused because a sensor is offline.
    ArmRefused { offline_slot: usize },

    /// A new sensor completed pairing.
    SensorPaired { id: u8, kind: SensorKind },

    /// An unknown sensor id from the current session was re-adopted.
    SensorAdopted { id: u8 },

    /// The roster was reset for a new pairing session.
    SessionReset { session_id: u16 },

    /// The PIN was changed and persisted.
    PinChanged,

    /// The companion reported a network connection.
    NetworkConnected(NetworkInfo),

    /// The companion reported a disconnect.
    NetworkDisconnected,

    /// A companion command exhausted its retry budget.
    CompanionUnresponsive,
}
