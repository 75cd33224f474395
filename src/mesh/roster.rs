//! In-memory table of registered sensors.
//!
//! Fixed-capacity slot arena. A slot is either empty or holds a
//! [`SensorRecord`]; occupancy is explicit rather than encoded in a
//! reserved id value, so any id the wire allows can live in the table.

use crate::mesh::wire::{SensorKind, SensorState};

/// Maximum number of sensors one controller manages.
pub const ROSTER_CAPACITY: usize = 6;

/// Live record of one registered sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorRecord {
    pub id: u8,
    pub kind: SensorKind,
    pub state: SensorState,
    /// Clock reading of the last message from this sensor.
    pub last_seen_ms: u64,
}

/// The registered-sensor table.
///
/// Per-kind counts are maintained at registration time rather than
/// recomputed, since the status screen reads them every redraw.
#[derive(Debug, Clone)]
pub struct Roster {
    slots: [Option<SensorRecord>; ROSTER_CAPACITY],
    magnet_count: u8,
    pir_count: u8,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            slots: [None; ROSTER_CAPACITY],
            magnet_count: 0,
            pir_count: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Insert a record into the first empty slot. `false` when full.
    pub fn register(&mut self, record: SensorRecord) -> bool {
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(slot) => {
                match record.kind {
                    SensorKind::Magnet => self.magnet_count += 1,
                    SensorKind::Pir => self.pir_count += 1,
                    SensorKind::None => {}
                }
                *slot = Some(record);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: u8) -> Option<&SensorRecord> {
        self.slots
            .iter()
            .flatten()
            .find(|r| r.id == id)
    }

    /// Refresh state and last-seen for a known sensor. `false` if unknown.
    pub fn update(&mut self, id: u8, state: SensorState, now_ms: u64) -> bool {
        for slot in self.slots.iter_mut().flatten() {
            if slot.id == id {
                slot.state = state;
                slot.last_seen_ms = now_ms;
                return true;
            }
        }
        false
    }

    /// Slot index of the first sensor silent for at least `timeout_ms`.
    pub fn offline_slot(&self, now_ms: u64, timeout_ms: u32) -> Option<usize> {
        self.slots.iter().position(|s| {
            s.is_some_and(|r| now_ms.saturating_sub(r.last_seen_ms) >= u64::from(timeout_ms))
        })
    }

    /// Slot index of the first responsive sensor reporting a low battery.
    /// A sensor already past the offline threshold is reported only as
    /// offline, never additionally as low-battery.
    pub fn low_battery_slot(&self, now_ms: u64, timeout_ms: u32) -> Option<usize> {
        self.slots.iter().position(|s| {
            s.is_some_and(|r| {
                r.state == SensorState::BatteryLow
                    && now_ms.saturating_sub(r.last_seen_ms) < u64::from(timeout_ms)
            })
        })
    }

    /// How many sensors currently report Triggered.
    pub fn triggered_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|r| r.state == SensorState::Triggered)
            .count()
    }

    /// Force every record back to the quiescent Ping state and make all
    /// sensors count as just seen. Called on state changes so stale
    /// triggers never leak across an arm or disarm.
    pub fn reset_states(&mut self, now_ms: u64) {
        for slot in self.slots.iter_mut().flatten() {
            slot.state = SensorState::Ping;
            slot.last_seen_ms = now_ms;
        }
    }

    /// Registered sensors per kind, for the status screen.
    pub fn counts(&self) -> (u8, u8) {
        (self.magnet_count, self.pir_count)
    }

    /// Drop every record. Used when a new pairing session begins.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}
