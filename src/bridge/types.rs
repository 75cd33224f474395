//! Data carried over the companion serial link.

use heapless::String;

/// Maximum SSID length the display can render.
pub const MAX_SSID_LEN: usize = 16;

/// Maximum dotted-quad IPv4 text length.
pub const MAX_IP_LEN: usize = 15;

/// Maximum WPA passphrase length accepted from the keypad.
pub const MAX_PASS_LEN: usize = 32;

/// SSID placeholder used when an inbound field failed validation.
pub const INVALID_SSID: &str = "INVALID NET NAME";

/// RSSI placeholder paired with [`INVALID_SSID`].
pub const INVALID_RSSI: i32 = -100;

/// Authentication mode of a scanned access point.
///
/// The raw codes come from the companion's Wi-Fi stack and travel over the
/// serial link verbatim, so unknown values are preserved rather than lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    WpaPsk,
    Wpa2Psk,
    Wep,
    Open,
    Auto,
    Unknown(u8),
}

impl Encryption {
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => Self::WpaPsk,
            4 => Self::Wpa2Psk,
            5 => Self::Wep,
            7 => Self::Open,
            8 => Self::Auto,
            other => Self::Unknown(other),
        }
    }

    /// Whether joining this network requires a passphrase.
    pub fn needs_credential(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// A passphrase collected from the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub passphrase: String<MAX_PASS_LEN>,
}

/// The network the companion is currently joined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub ssid: String<MAX_SSID_LEN>,
    pub rssi: i32,
    pub local_ip: String<MAX_IP_LEN>,
}

impl NetworkInfo {
    /// Sentinel value reported when an `INFO:` line failed validation.
    pub fn invalid() -> Self {
        let mut ssid = String::new();
        ssid.push_str(INVALID_SSID).ok();
        let mut ip = String::new();
        ip.push_str("0.0.0.0").ok();
        Self {
            ssid,
            rssi: INVALID_RSSI,
            local_ip: ip,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.ssid.as_str() == INVALID_SSID
    }
}

/// One entry of a network scan delivered by the companion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedNetwork {
    pub ssid: String<MAX_SSID_LEN>,
    pub rssi: i32,
    pub encryption: Encryption,
}

impl ScannedNetwork {
    /// Sentinel value for a `NETWORK:` line that failed validation.
    pub fn invalid() -> Self {
        let mut ssid = String::new();
        ssid.push_str(INVALID_SSID).ok();
        Self {
            ssid,
            rssi: INVALID_RSSI,
            encryption: Encryption::Open,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.ssid.as_str() == INVALID_SSID
    }
}
