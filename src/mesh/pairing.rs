//! Local pairing handshake for new sensors.
//!
//! A candidate sensor is attached to the short-range setup bus and asked
//! for its kind byte. The controller answers with an identity payload and
//! waits for the candidate's outcome byte:
//!
//! ```text
//!   candidate ──▶ kind byte
//!   controller ──▶ "<device_id>,<session_id>,<next_id>"
//!   candidate ──▶ outcome (1 = stored, 2 = error)
//! ```
//!
//! Nothing is committed until the outcome confirms the candidate stored
//! the identity: a failed or abandoned handshake leaves the roster, the
//! next sensor id and the persisted count exactly as they were.

use core::fmt::Write as _;

use heapless::String;
use log::{info, warn};

use crate::app::ports::{PairingBus, StoragePort, TimePort, PAIR_OUTCOME_OK};
use crate::error::{PairingError, Result};
use crate::identity::IdentityStore;
use crate::mesh::roster::{Roster, SensorRecord};
use crate::mesh::wire::{SensorKind, SensorState};
use crate::timer::Deadline;

/// "<u32>,<u16>,<u8>" plus separators fits comfortably in 20 bytes.
const IDENTITY_BUF: usize = 20;

/// Successor of a sensor id. Id 0 is reserved, so the sequence runs
/// 1..=255 and wraps 255 back to 1.
pub fn next_id_after(id: u8) -> u8 {
    match id {
        u8::MAX => 1,
        0 => 1,
        n => n + 1,
    }
}

/// Run one pairing attempt to completion or failure.
///
/// On success the new sensor is in the roster and the advanced id and
/// count are persisted. Every error path leaves all three untouched.
pub fn pair<B, T, S>(
    bus: &mut B,
    clock: &T,
    store: &mut IdentityStore<S>,
    roster: &mut Roster,
    device_id: u32,
    timeout_secs: u16,
) -> Result<SensorRecord>
where
    B: PairingBus,
    T: TimePort,
    S: StoragePort,
{
    if roster.is_full() {
        return Err(PairingError::RosterFull.into());
    }

    let session_id = store.session_id()?;
    // Stored value may predate the reserved-id rule; normalise before use.
    let next_id = {
        let stored = store.next_sensor_id()?;
        if stored == 0 { 1 } else { stored }
    };

    let deadline = Deadline::after(clock, u64::from(timeout_secs) * 1_000);

    // Phase 1: wait for a candidate to announce its kind.
    let kind = loop {
        if deadline.expired(clock) {
            return Err(PairingError::TimedOut.into());
        }
        if let Some(raw) = bus.request_kind() {
            match SensorKind::from_u8(raw) {
                Some(SensorKind::None) | None => {
                    warn!("pairing: ignoring candidate with kind byte {raw}");
                }
                Some(kind) => break kind,
            }
        }
        clock.sleep_ms(50);
    };

    // Phase 2: hand the candidate its identity.
    let mut identity: String<IDENTITY_BUF> = String::new();
    write!(identity, "{device_id},{session_id},{next_id}")
        .map_err(|_| crate::error::Error::Init("identity payload overflow"))?;
    bus.send_identity(&identity);

    // Phase 3: wait for the stored/error outcome.
    let outcome = loop {
        if deadline.expired(clock) {
            return Err(PairingError::TimedOut.into());
        }
        if let Some(byte) = bus.read_outcome() {
            break byte;
        }
        clock.sleep_ms(50);
    };

    if outcome != PAIR_OUTCOME_OK {
        return Err(PairingError::Rejected.into());
    }

    let record = SensorRecord {
        id: next_id,
        kind,
        state: SensorState::Ping,
        last_seen_ms: clock.now_ms(),
    };
    // is_full was checked above and nothing else mutates the roster here.
    if !roster.register(record) {
        return Err(PairingError::RosterFull.into());
    }

    store.set_next_sensor_id(next_id_after(next_id))?;
    store.set_sensor_count(roster.len() as u8)?;
    info!("paired sensor {next_id} ({kind:?}), session {session_id}");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_sequence_skips_zero() {
        assert_eq!(next_id_after(1), 2);
        assert_eq!(next_id_after(254), 255);
        assert_eq!(next_id_after(255), 1);
        assert_eq!(next_id_after(0), 1);
    }
}
