//! Port traits — the boundary between the alarm core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ domain core (controller · mesh · bridge)
//! ```
//!
//! Driven adapters (keypad, radio, pairing bus, UART, NVS, display/buzzer)
//! implement these traits. The domain consumes them via generics, so the
//! core never touches hardware directly and every flow is testable with
//! scripted mocks.
//!
//! Display rendering, tone generation and raw keypad matrix scanning are
//! external collaborators: they live entirely behind [`UiPort`] and
//! [`KeypadPort`] and carry no domain logic.

use crate::bridge::types::{Credential, NetworkInfo, ScannedNetwork};
use crate::error::StorageError;
use crate::keys::Key;
use crate::status::AlarmStatus;

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.
pub trait TimePort {
    /// Milliseconds since boot. Monotonic, never goes backwards.
    fn now_ms(&self) -> u64;

    /// Busy-wait for `ms`. Adapters override with a proper platform sleep;
    /// the default spin is only suitable for short waits.
    fn sleep_ms(&self, ms: u64) {
        let end = self.now_ms().saturating_add(ms);
        while self.now_ms() < end {
            core::hint::spin_loop();
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Keypad port (driven adapter: key matrix → domain)
// ───────────────────────────────────────────────────────────────

/// Non-blocking keypad poll. One decoded symbol per call, `None` when no
/// key is down.
pub trait KeypadPort {
    fn poll_key(&mut self) -> Option<Key>;
}

// ───────────────────────────────────────────────────────────────
// UI port (driven adapter: domain → display + buzzer)
// ───────────────────────────────────────────────────────────────

/// Everything the user sees or hears, plus the two interactions that are
/// pure presentation (scrolling a network list, typing a credential).
pub trait UiPort {
    /// Redraw the status screen.
    fn show_status(&mut self, status: &AlarmStatus, magnet_count: u8, pir_count: u8, rssi: i32);

    /// Show a transient notification.
    fn notify(&mut self, notice: Notice);

    /// One second of the visible Away-arming countdown.
    fn show_arm_countdown(&mut self, secs_left: u16);

    /// Redraw the PIN entry mask with `entered` digits typed so far.
    fn show_pin_progress(&mut self, entered: usize);

    /// Drive or silence the siren.
    fn siren(&mut self, on: bool);

    /// Show the currently joined network (ssid and address).
    fn show_network_info(&mut self, info: &NetworkInfo);

    /// Which menu action the user picked, if any.
    fn choose_menu(&mut self) -> Option<MenuAction>;

    /// Which scanned network the user picked, if any.
    fn choose_network(&mut self, networks: &[ScannedNetwork]) -> Option<usize>;

    /// Collect a network credential from the user.
    fn read_credential(&mut self) -> Credential;
}

/// Transient user notifications. The adapter decides how each is rendered
/// and which tone accompanies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    PinCorrect,
    PinIncorrect,
    PinTimedOut,
    PinChanged,
    StateChanged,
    ArmRefusedSensorsOffline,
    SensorOffline { slot: usize },
    SensorLowBattery { slot: usize },
    RosterFull,
    PairingWaiting,
    PairingFailed,
    DefaultsLoaded,
    WifiConnecting,
    WifiConnected,
    WifiDisconnected,
    NoNetworksFound,
    CompanionUnresponsive,
}

/// Actions reachable from the main menu, available only while disarmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    ShowNetworkInfo,
    ChangeNetwork,
    ChangePin,
    SensorSetup,
    LoadDefaults,
    ResetCompanion,
}

// ───────────────────────────────────────────────────────────────
// Serial link (driven adapter: domain ↔ companion UART)
// ───────────────────────────────────────────────────────────────

/// Raw byte stream shared with the network companion module. The framing
/// (lines, commands, `OK` responses) lives in the bridge, not here.
pub trait SerialLink {
    /// Next received byte, `None` when the receive FIFO is empty.
    fn read_byte(&mut self) -> Option<u8>;

    /// Transmit one line. The adapter appends the line terminator.
    fn write_line(&mut self, line: &str);
}

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain ↔ 2.4 GHz transceiver)
// ───────────────────────────────────────────────────────────────

/// Packet transceiver with acknowledgment-payload piggybacking: the payload
/// queued via [`queue_ack_payload`](RadioPort::queue_ack_payload) rides on
/// the transport-level ack of the next inbound packet.
pub trait RadioPort {
    /// True when an inbound payload is waiting to be read.
    fn message_pending(&mut self) -> bool;

    /// Queue the ack payload for the pending packet. Must be called before
    /// [`read_message`](RadioPort::read_message) so the remote sensor never
    /// receives a stale instruction.
    fn queue_ack_payload(&mut self, payload: &[u8]);

    /// Read the pending payload into `buf`; returns the byte count.
    fn read_message(&mut self, buf: &mut [u8]) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Pairing bus (driven adapter: domain ↔ short-range setup bus)
// ───────────────────────────────────────────────────────────────

/// Outcome byte a candidate sensor answers the identity message with.
pub const PAIR_OUTCOME_OK: u8 = 1;
pub const PAIR_OUTCOME_ERROR: u8 = 2;

/// Request/response bus a candidate sensor is attached to during setup.
pub trait PairingBus {
    /// Ask the candidate for its sensor-kind byte. `None` when no candidate
    /// is present or nothing was read.
    fn request_kind(&mut self) -> Option<u8>;

    /// Transmit the identity payload `"<device_id>,<session_id>,<next_id>"`.
    fn send_identity(&mut self, payload: &str);

    /// Poll for the candidate's 1-byte outcome.
    fn read_outcome(&mut self) -> Option<u8>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage. Writes MUST be atomic — no partial
/// values on power loss (ESP-IDF NVS guarantees this natively).
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
