//! Wireless sensor mesh.
//!
//! Owns the registered-sensor roster and the radio exchange. Every inbound
//! packet is answered through the transport-level ack payload, which is
//! queued BEFORE the packet is read so the sensor never acts on a stale
//! arming instruction.

pub mod pairing;
pub mod roster;
pub mod wire;

use log::{debug, warn};

use crate::app::ports::{PairingBus, RadioPort, StoragePort, TimePort};
use crate::error::Result;
use crate::identity::IdentityStore;
use crate::status::{AlarmStatus, ArmMethod, ArmState};

use roster::{Roster, SensorRecord};
use wire::{SensorAck, SensorKind, SensorMessage, SensorState, MESSAGE_LEN};

/// What one radio poll produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshUpdate {
    /// A known sensor reported its state.
    Report { id: u8, state: SensorState },
    /// An unknown sensor from the current session was re-adopted into the
    /// roster (it survived a controller reboot).
    Adopted { id: u8, kind: SensorKind },
    /// The packet belonged to another controller or a stale session.
    Ignored,
}

/// The sensor mesh: roster plus the identity scope packets are matched on.
pub struct SensorMesh {
    device_id: u32,
    session_id: u16,
    pub roster: Roster,
}

impl SensorMesh {
    pub fn new(device_id: u32, session_id: u16) -> Self {
        Self {
            device_id,
            session_id,
            roster: Roster::new(),
        }
    }

    pub fn session_id(&self) -> u16 {
        self.session_id
    }

    pub fn can_add_sensor(&self) -> bool {
        !self.roster.is_full()
    }

    /// The ack instruction matching the current alarm status.
    ///
    /// The sensors-to-arm byte names the most permissive kind that should
    /// enforce: `Magnet` while Stay-armed, `Pir` (meaning every kind) while
    /// Away-armed. Any other state, Alert included, stands the sensors
    /// down with `None` — once the siren is up there is nothing left for
    /// them to report.
    pub fn make_ack(&self, status: &AlarmStatus) -> SensorAck {
        let sensors_to_arm = if status.state != ArmState::Armed {
            SensorKind::None
        } else {
            match status.method {
                ArmMethod::None => SensorKind::None,
                ArmMethod::Stay => SensorKind::Magnet,
                ArmMethod::Away => SensorKind::Pir,
            }
        };
        SensorAck {
            parent_device_id: self.device_id,
            session_id: self.session_id,
            sensors_to_arm,
        }
    }

    /// Service the radio once. Queues the ack payload first, then reads and
    /// applies the pending message, if any.
    pub fn listen(
        &mut self,
        radio: &mut impl RadioPort,
        clock: &impl TimePort,
        status: &AlarmStatus,
    ) -> Option<MeshUpdate> {
        if !radio.message_pending() {
            return None;
        }
        radio.queue_ack_payload(&self.make_ack(status).to_bytes());

        let mut buf = [0u8; MESSAGE_LEN];
        let n = radio.read_message(&mut buf);
        let Some(message) = SensorMessage::from_bytes(&buf[..n]) else {
            warn!("mesh: dropping undecodable {n}-byte packet");
            return Some(MeshUpdate::Ignored);
        };
        Some(self.apply(&message, clock.now_ms()))
    }

    fn apply(&mut self, message: &SensorMessage, now_ms: u64) -> MeshUpdate {
        if message.parent_device_id != self.device_id || message.session_id != self.session_id {
            debug!(
                "mesh: ignoring packet for device {} session {}",
                message.parent_device_id, message.session_id
            );
            return MeshUpdate::Ignored;
        }
        if message.sensor_id == wire::RESERVED_SENSOR_ID {
            return MeshUpdate::Ignored;
        }

        if self.roster.update(message.sensor_id, message.state, now_ms) {
            return MeshUpdate::Report {
                id: message.sensor_id,
                state: message.state,
            };
        }

        // Correct identity but not in the table: the controller rebooted
        // after this sensor was paired. Take it back in.
        let record = SensorRecord {
            id: message.sensor_id,
            kind: message.kind,
            state: message.state,
            last_seen_ms: now_ms,
        };
        if self.roster.register(record) {
            MeshUpdate::Adopted {
                id: message.sensor_id,
                kind: message.kind,
            }
        } else {
            warn!("mesh: roster full, cannot re-adopt sensor {}", message.sensor_id);
            MeshUpdate::Ignored
        }
    }

    /// Run one pairing attempt against a candidate on the setup bus.
    pub fn pair<B, T, S>(
        &mut self,
        bus: &mut B,
        clock: &T,
        store: &mut IdentityStore<S>,
        timeout_secs: u16,
    ) -> Result<SensorRecord>
    where
        B: PairingBus,
        T: TimePort,
        S: StoragePort,
    {
        pairing::pair(
            bus,
            clock,
            store,
            &mut self.roster,
            self.device_id,
            timeout_secs,
        )
    }

    /// Abandon every registered sensor and start a fresh session.
    ///
    /// The incremented session id makes packets from previously paired
    /// sensors fail the identity match, so they cannot re-adopt.
    pub fn new_session<S: StoragePort>(&mut self, store: &mut IdentityStore<S>) -> Result<u16> {
        self.session_id = self.session_id.wrapping_add(1);
        self.roster.clear();
        store.set_session_id(self.session_id)?;
        store.set_sensor_count(0)?;
        Ok(self.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(device: u32, session: u16, id: u8, state: SensorState) -> SensorMessage {
        SensorMessage {
            parent_device_id: device,
            session_id: session,
            sensor_id: id,
            kind: SensorKind::Magnet,
            state,
        }
    }

    #[test]
    fn foreign_identity_never_applied() {
        let mut mesh = SensorMesh::new(42, 3);
        assert_eq!(
            mesh.apply(&message(42, 2, 1, SensorState::Triggered), 0),
            MeshUpdate::Ignored
        );
        assert_eq!(
            mesh.apply(&message(7, 3, 1, SensorState::Triggered), 0),
            MeshUpdate::Ignored
        );
        assert!(mesh.roster.is_empty());
    }

    #[test]
    fn unknown_current_session_sensor_is_adopted() {
        let mut mesh = SensorMesh::new(42, 3);
        let update = mesh.apply(&message(42, 3, 5, SensorState::Ping), 100);
        assert_eq!(
            update,
            MeshUpdate::Adopted {
                id: 5,
                kind: SensorKind::Magnet
            }
        );
        assert_eq!(mesh.roster.get(5).unwrap().last_seen_ms, 100);

        // Subsequent packets are plain reports.
        let update = mesh.apply(&message(42, 3, 5, SensorState::Triggered), 200);
        assert_eq!(
            update,
            MeshUpdate::Report {
                id: 5,
                state: SensorState::Triggered
            }
        );
    }

    #[test]
    fn reserved_id_ignored() {
        let mut mesh = SensorMesh::new(42, 3);
        assert_eq!(
            mesh.apply(&message(42, 3, 0, SensorState::Ping), 0),
            MeshUpdate::Ignored
        );
        assert!(mesh.roster.is_empty());
    }

    #[test]
    fn ack_tracks_alarm_status() {
        let mesh = SensorMesh::new(42, 3);
        let mut status = AlarmStatus::disarmed();
        assert_eq!(mesh.make_ack(&status).sensors_to_arm, SensorKind::None);

        status.state = ArmState::Armed;
        status.method = ArmMethod::Stay;
        assert_eq!(mesh.make_ack(&status).sensors_to_arm, SensorKind::Magnet);

        status.method = ArmMethod::Away;
        assert_eq!(mesh.make_ack(&status).sensors_to_arm, SensorKind::Pir);

        let ack = mesh.make_ack(&status);
        assert_eq!(ack.parent_device_id, 42);
        assert_eq!(ack.session_id, 3);
    }

    #[test]
    fn alerting_stands_sensors_down() {
        let mesh = SensorMesh::new(42, 3);
        // An alert keeps the armed method recorded, but the ack must tell
        // the sensors to stop enforcing, same as disarmed.
        for method in [ArmMethod::Stay, ArmMethod::Away] {
            let status = AlarmStatus {
                state: ArmState::Alert,
                method,
                cause: crate::status::AlertCause::OneTriggered,
            };
            assert_eq!(mesh.make_ack(&status).sensors_to_arm, SensorKind::None);
        }
    }
}
