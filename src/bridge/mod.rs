//! Serial bridge to the network companion module.
//!
//! Line-oriented text protocol over a UART. The companion owns the Wi-Fi
//! association and the remote backend; this side owns the alarm. Outbound
//! commands carry a `CMD+` prefix and are answered with a bare `OK`;
//! every inbound notification with a recognised keyword is acknowledged
//! with `OK`, even when its payload is malformed, so the companion's own
//! send loop never stalls on our validation. Malformed payloads surface as
//! sentinel values the caller can recognise. Lines with no recognised
//! keyword are dropped without an ack.

pub mod scan;
pub mod types;

use core::str::FromStr;

use heapless::{String, Vec};
use log::{debug, warn};

use crate::app::ports::{SerialLink, TimePort};
use crate::error::BridgeError;
use crate::status::{AlarmStatus, ArmMethod, ArmState};
use crate::timer::Deadline;

use types::{Credential, NetworkInfo, ScannedNetwork, MAX_IP_LEN, MAX_SSID_LEN};

/// Longest well-formed line plus slack.
const LINE_CAP: usize = 96;

const ACK: &str = "OK";

/// One parsed inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `DEVICE_ID:<u32>` — the companion's unique id, sent once at boot.
    DeviceId(u32),
    /// `INFO:<ssid>,<rssi>,<ip>` — current association.
    NetworkInfo(NetworkInfo),
    /// `DISCONNECTED` — the association dropped.
    Disconnected,
    /// `START_LIST:<count>` — a scan batch of `count` entries follows.
    ScanStart { count: u8 },
    /// `NETWORK:<ssid>,<rssi>,<enc>` — one scan result.
    ScanEntry(ScannedNetwork),
    /// `END_LIST` — the scan batch is complete.
    ScanEnd,
    /// `STATUS:<state>,<method>` — remote state change (e.g. app disarm).
    RemoteStatus { state: ArmState, method: ArmMethod },
    /// Bare `OK` — acknowledgment of our last command.
    Ok,
    /// Recognised keyword with an unusable payload. Acked, then ignored.
    Malformed,
    /// Unrecognised keyword or garbage. Dropped without an ack.
    Unknown,
}

/// Framing and dispatch over one [`SerialLink`].
pub struct SerialBridge<L: SerialLink> {
    link: L,
    line: Vec<u8, LINE_CAP>,
    overflowed: bool,
    response_timeout_ms: u32,
}

impl<L: SerialLink> SerialBridge<L> {
    pub fn new(link: L, response_timeout_ms: u32) -> Self {
        Self {
            link,
            line: Vec::new(),
            overflowed: false,
            response_timeout_ms,
        }
    }

    /// Pump received bytes. Returns the next complete parsed line, if one
    /// finished during this call. Notifications are acked before returning.
    pub fn poll(&mut self) -> Option<Inbound> {
        while let Some(byte) = self.link.read_byte() {
            match byte {
                b'\r' => {}
                b'\n' => {
                    let overflowed = core::mem::take(&mut self.overflowed);
                    let parsed = if overflowed {
                        warn!("bridge: discarding oversized line");
                        Inbound::Unknown
                    } else {
                        parse_line(&self.line)
                    };
                    self.line.clear();
                    if self.line_is_notification(&parsed) {
                        self.link.write_line(ACK);
                    }
                    return Some(parsed);
                }
                _ => {
                    if self.line.push(byte).is_err() {
                        self.overflowed = true;
                    }
                }
            }
        }
        None
    }

    fn line_is_notification(&self, parsed: &Inbound) -> bool {
        !matches!(parsed, Inbound::Ok | Inbound::Unknown)
    }

    /// Discard any partially assembled line.
    pub fn clear(&mut self) {
        self.line.clear();
        self.overflowed = false;
    }

    // --- outbound commands ---

    /// Ask the companion to drop its network and start a fresh scan.
    pub fn send_network_change(
        &mut self,
        clock: &impl TimePort,
    ) -> core::result::Result<(), BridgeError> {
        self.command(clock, "CMD+CHANGE")
    }

    /// Ask the companion to retry joining its stored network.
    pub fn send_retry(&mut self, clock: &impl TimePort) -> core::result::Result<(), BridgeError> {
        self.command(clock, "CMD+RETRY")
    }

    /// Ask the companion to factory-reset itself.
    pub fn send_reset(&mut self, clock: &impl TimePort) -> core::result::Result<(), BridgeError> {
        self.command(clock, "CMD+RESET")
    }

    /// Hand the companion the network to join.
    pub fn send_credentials(
        &mut self,
        clock: &impl TimePort,
        ssid: &str,
        credential: &Credential,
    ) -> core::result::Result<(), BridgeError> {
        let mut line: String<LINE_CAP> = String::new();
        core::fmt::Write::write_fmt(
            &mut line,
            format_args!("CMD+CREDENTIALS:{},{}", ssid, credential.passphrase),
        )
        .map_err(|_| BridgeError::Malformed)?;
        self.command(clock, &line)
    }

    /// Report the alarm status so the companion can forward it.
    pub fn send_status(
        &mut self,
        clock: &impl TimePort,
        status: &AlarmStatus,
    ) -> core::result::Result<(), BridgeError> {
        let mut line: String<32> = String::new();
        core::fmt::Write::write_fmt(
            &mut line,
            format_args!(
                "CMD+STATUS:{},{},{}",
                status.state as u8, status.method as u8, status.cause as u8
            ),
        )
        .map_err(|_| BridgeError::Malformed)?;
        self.command(clock, &line)
    }

    fn command(
        &mut self,
        clock: &impl TimePort,
        line: &str,
    ) -> core::result::Result<(), BridgeError> {
        debug!("bridge: -> {line}");
        self.link.write_line(line);
        self.await_ok(clock)
    }

    /// Wait for the companion's `OK` to the command just sent. Notification
    /// lines arriving in the window are acked and dropped.
    fn await_ok(&mut self, clock: &impl TimePort) -> core::result::Result<(), BridgeError> {
        let deadline = Deadline::after(clock, u64::from(self.response_timeout_ms));
        while !deadline.expired(clock) {
            match self.poll() {
                Some(Inbound::Ok) => return Ok(()),
                Some(other) => debug!("bridge: dropping {other:?} while awaiting ack"),
                None => clock.sleep_ms(5),
            }
        }
        Err(BridgeError::CompanionUnresponsive)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_line(raw: &[u8]) -> Inbound {
    // Stray NULs can trail a line when the companion pads its buffers.
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let Ok(text) = core::str::from_utf8(&raw[..end]) else {
        return Inbound::Unknown;
    };
    let (keyword, payload) = match text.split_once(':') {
        Some((k, p)) => (k, p),
        None => (text, ""),
    };
    match keyword {
        "OK" => Inbound::Ok,
        "DEVICE_ID" => parse_device_id(payload),
        "INFO" => Inbound::NetworkInfo(parse_network_info(payload)),
        "DISCONNECTED" => Inbound::Disconnected,
        "START_LIST" => Inbound::ScanStart {
            // A garbled count reads as an empty list; the end marker still
            // bounds the batch either way.
            count: payload.parse::<u8>().unwrap_or(0).min(99),
        },
        "NETWORK" => Inbound::ScanEntry(parse_scan_entry(payload)),
        "END_LIST" => Inbound::ScanEnd,
        "STATUS" => parse_remote_status(payload),
        other => {
            if !other.is_empty() {
                warn!("bridge: unknown keyword {other:?}");
            }
            Inbound::Unknown
        }
    }
}

fn parse_device_id(payload: &str) -> Inbound {
    match payload.parse::<u32>() {
        Ok(id) => Inbound::DeviceId(id),
        Err(_) => Inbound::Malformed,
    }
}

fn parse_network_info(payload: &str) -> NetworkInfo {
    let mut fields = payload.split(',');
    let parsed = (|| {
        let ssid = bounded::<MAX_SSID_LEN>(fields.next()?)?;
        let rssi = fields.next()?.parse::<i32>().ok()?;
        let local_ip = bounded::<MAX_IP_LEN>(fields.next()?)?;
        Some(NetworkInfo {
            ssid,
            rssi,
            local_ip,
        })
    })();
    parsed.unwrap_or_else(NetworkInfo::invalid)
}

fn parse_scan_entry(payload: &str) -> ScannedNetwork {
    let mut fields = payload.split(',');
    let parsed = (|| {
        let ssid = bounded::<MAX_SSID_LEN>(fields.next()?)?;
        let rssi = fields.next()?.parse::<i32>().ok()?;
        let code = fields.next()?.parse::<u8>().ok()?;
        Some(ScannedNetwork {
            ssid,
            rssi,
            encryption: types::Encryption::from_code(code),
        })
    })();
    parsed.unwrap_or_else(ScannedNetwork::invalid)
}

fn parse_remote_status(payload: &str) -> Inbound {
    let mut fields = payload.split(',');
    let parsed = (|| {
        let state = ArmState::from_u8(fields.next()?.parse::<u8>().ok()?)?;
        let method = ArmMethod::from_u8(fields.next()?.parse::<u8>().ok()?)?;
        Some(Inbound::RemoteStatus { state, method })
    })();
    parsed.unwrap_or(Inbound::Malformed)
}

/// Copy a field into a bounded string. `None` when empty or over-long.
fn bounded<const N: usize>(field: &str) -> Option<String<N>> {
    if field.is_empty() {
        return None;
    }
    String::from_str(field).ok()
}
