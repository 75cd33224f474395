//! Log-based event sink adapter.
//!
//! Writes structured application events to the logger (UART / USB-CDC in
//! production). A future MQTT adapter would implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => info!("START | initial_state={state:?}"),
            AppEvent::StateChanged { from, to } => info!("STATE | {from:?} -> {to:?}"),
            AppEvent::AlertRaised(cause) => info!("ALERT | cause={cause:?}"),
            AppEvent::ArmRefused { offline_slot } => {
                info!("ARM   | refused, sensor slot {offline_slot} offline");
            }
            AppEvent::SensorPaired { id, kind } => info!("MESH  | paired sensor {id} ({kind:?})"),
            AppEvent::SensorAdopted { id } => info!("MESH  | re-adopted sensor {id}"),
            AppEvent::SessionReset { session_id } => {
                info!("MESH  | new session {session_id}, roster cleared");
            }
            AppEvent::PinChanged => info!("PIN   | changed"),
            AppEvent::NetworkConnected(net) => {
                info!(
                    "NET   | connected ssid={} rssi={} ip={}",
                    net.ssid, net.rssi, net.local_ip
                );
            }
            AppEvent::NetworkDisconnected => info!("NET   | disconnected"),
            AppEvent::CompanionUnresponsive => info!("NET   | companion unresponsive"),
        }
    }
}
