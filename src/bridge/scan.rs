//! Bounded collection of scanned networks.

use heapless::Vec;

use crate::bridge::types::ScannedNetwork;

/// Maximum networks kept from one scan.
pub const SCAN_CAPACITY: usize = 10;

/// Scan results, strongest-signal biased: once full, a new entry replaces
/// the weakest kept entry, and only if it is stronger.
#[derive(Debug, Default)]
pub struct ScanList {
    entries: Vec<ScannedNetwork, SCAN_CAPACITY>,
}

impl ScanList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn as_slice(&self) -> &[ScannedNetwork] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ScannedNetwork> {
        self.entries.get(index)
    }

    /// Add one scan result. Invalid entries are dropped outright.
    pub fn push(&mut self, network: ScannedNetwork) {
        if network.is_invalid() {
            return;
        }
        if self.entries.push(network.clone()).is_ok() {
            return;
        }
        let weakest = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, n)| n.rssi)
            .map(|(i, _)| i);
        if let Some(i) = weakest {
            if network.rssi > self.entries[i].rssi {
                self.entries[i] = network;
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
