//! Fixed-size wireless payloads.
//!
//! Both directions use little-endian packed frames sized for the radio's
//! fixed payload width. The inbound [`SensorMessage`] carries the sensor's
//! identity and state; the outbound [`SensorAck`] piggybacks on the
//! transport-level acknowledgment and tells the sensor which kinds should
//! currently be enforcing.

/// Sensor id 0 is reserved on the wire: it never denotes a real sensor.
pub const RESERVED_SENSOR_ID: u8 = 0;

/// What a sensor physically is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorKind {
    None = 0,
    /// Door/window reed switch.
    Magnet = 1,
    /// Passive-infrared motion sensor.
    Pir = 2,
}

impl SensorKind {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Magnet),
            2 => Some(Self::Pir),
            _ => None,
        }
    }
}

/// What a sensor last reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorState {
    /// Routine liveness ping.
    Ping = 0,
    Triggered = 1,
    BatteryLow = 2,
}

impl SensorState {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Ping),
            1 => Some(Self::Triggered),
            2 => Some(Self::BatteryLow),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound message
// ---------------------------------------------------------------------------

/// Wire size of [`SensorMessage`].
pub const MESSAGE_LEN: usize = 9;

/// One report from a sensor: identity scope (device + session), its id,
/// and its current kind/state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorMessage {
    pub parent_device_id: u32,
    pub session_id: u16,
    pub sensor_id: u8,
    pub kind: SensorKind,
    pub state: SensorState,
}

impl SensorMessage {
    pub fn to_bytes(&self) -> [u8; MESSAGE_LEN] {
        let mut buf = [0u8; MESSAGE_LEN];
        buf[0..4].copy_from_slice(&self.parent_device_id.to_le_bytes());
        buf[4..6].copy_from_slice(&self.session_id.to_le_bytes());
        buf[6] = self.sensor_id;
        buf[7] = self.kind as u8;
        buf[8] = self.state as u8;
        buf
    }

    /// Decode a frame. Short frames and unknown discriminants yield `None`.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < MESSAGE_LEN {
            return None;
        }
        Some(Self {
            parent_device_id: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            session_id: u16::from_le_bytes([buf[4], buf[5]]),
            sensor_id: buf[6],
            kind: SensorKind::from_u8(buf[7])?,
            state: SensorState::from_u8(buf[8])?,
        })
    }
}

// ---------------------------------------------------------------------------
// Outbound ack payload
// ---------------------------------------------------------------------------

/// Wire size of [`SensorAck`].
pub const ACK_LEN: usize = 7;

/// Instruction attached to the transport ack of an inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorAck {
    pub parent_device_id: u32,
    pub session_id: u16,
    /// Which sensor kinds should enforce right now.
    pub sensors_to_arm: SensorKind,
}

impl SensorAck {
    pub fn to_bytes(&self) -> [u8; ACK_LEN] {
        let mut buf = [0u8; ACK_LEN];
        buf[0..4].copy_from_slice(&self.parent_device_id.to_le_bytes());
        buf[4..6].copy_from_slice(&self.session_id.to_le_bytes());
        buf[6] = self.sensors_to_arm as u8;
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < ACK_LEN {
            return None;
        }
        Some(Self {
            parent_device_id: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            session_id: u16::from_le_bytes([buf[4], buf[5]]),
            sensors_to_arm: SensorKind::from_u8(buf[6])?,
        })
    }
}
