//! Property-based tests for the parsing and bookkeeping layers.

#![cfg(not(target_os = "espidf"))]

use std::collections::VecDeque;

use proptest::prelude::*;

use homeguard::app::ports::SerialLink;
use homeguard::bridge::scan::{ScanList, SCAN_CAPACITY};
use homeguard::bridge::types::{Encryption, ScannedNetwork};
use homeguard::bridge::SerialBridge;
use homeguard::mesh::pairing::next_id_after;
use homeguard::mesh::wire::{SensorAck, SensorKind, SensorMessage, SensorState, MESSAGE_LEN};

struct ByteLink {
    rx: VecDeque<u8>,
    tx: Vec<String>,
}

impl SerialLink for ByteLink {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }
    fn write_line(&mut self, line: &str) {
        self.tx.push(line.to_owned());
    }
}

fn kind_strategy() -> impl Strategy<Value = SensorKind> {
    prop_oneof![
        Just(SensorKind::None),
        Just(SensorKind::Magnet),
        Just(SensorKind::Pir),
    ]
}

fn state_strategy() -> impl Strategy<Value = SensorState> {
    prop_oneof![
        Just(SensorState::Ping),
        Just(SensorState::Triggered),
        Just(SensorState::BatteryLow),
    ]
}

proptest! {
    /// Decoding an arbitrary byte buffer never panics, and succeeds exactly
    /// when the frame is long enough and both discriminants are known.
    #[test]
    fn frame_decode_is_total(bytes in proptest::collection::vec(any::<u8>(), 0..32)) {
        let decoded = SensorMessage::from_bytes(&bytes);
        let well_formed = bytes.len() >= MESSAGE_LEN && bytes[7] <= 2 && bytes[8] <= 2;
        prop_assert_eq!(decoded.is_some(), well_formed);
    }

    /// Every representable sensor report survives the wire unchanged.
    #[test]
    fn frame_roundtrip(
        device in any::<u32>(),
        session in any::<u16>(),
        id in any::<u8>(),
        kind in kind_strategy(),
        state in state_strategy(),
    ) {
        let message = SensorMessage {
            parent_device_id: device,
            session_id: session,
            sensor_id: id,
            kind,
            state,
        };
        prop_assert_eq!(SensorMessage::from_bytes(&message.to_bytes()), Some(message));
    }

    /// Every representable ack instruction survives the wire unchanged.
    #[test]
    fn ack_roundtrip(
        device in any::<u32>(),
        session in any::<u16>(),
        kind in kind_strategy(),
    ) {
        let ack = SensorAck {
            parent_device_id: device,
            session_id: session,
            sensors_to_arm: kind,
        };
        prop_assert_eq!(SensorAck::from_bytes(&ack.to_bytes()), Some(ack));
    }

    /// The handed-out sensor id never collides with the reserved id 0,
    /// whatever the stored predecessor is.
    #[test]
    fn sensor_id_successor_never_reserved(id in any::<u8>()) {
        let next = next_id_after(id);
        prop_assert_ne!(next, 0);
    }

    /// Feeding an arbitrary terminated line through the bridge never
    /// panics and always yields exactly one parsed inbound.
    #[test]
    fn serial_line_parsing_is_total(
        mut bytes in proptest::collection::vec(any::<u8>(), 0..150),
    ) {
        bytes.retain(|&b| b != b'\n' && b != b'\r');
        let mut rx: VecDeque<u8> = bytes.into_iter().collect();
        rx.push_back(b'\n');

        let mut bridge = SerialBridge::new(ByteLink { rx, tx: Vec::new() }, 1_000);
        prop_assert!(bridge.poll().is_some());
        prop_assert!(bridge.poll().is_none());
    }

    /// The scan list never exceeds its capacity, and the strongest network
    /// seen is always among the kept entries.
    #[test]
    fn scan_list_keeps_strongest(rssis in proptest::collection::vec(-100i32..0, 1..40)) {
        let mut list = ScanList::new();
        for &rssi in &rssis {
            let mut ssid: heapless::String<16> = heapless::String::new();
            ssid.push_str("ap").ok();
            list.push(ScannedNetwork {
                ssid,
                rssi,
                encryption: Encryption::Wpa2Psk,
            });
        }
        prop_assert!(list.len() <= SCAN_CAPACITY);
        let strongest = rssis.iter().copied().max().unwrap();
        prop_assert!(list.as_slice().iter().any(|n| n.rssi == strongest));
    }
}
