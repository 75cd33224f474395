//! Global alarm status record.
//!
//! One `AlarmStatus` instance exists per process, owned and mutated only by
//! the alarm controller. The sensor mesh reads it to compute the ack
//! instruction; the serial bridge reads it to report state to the companion.

/// Top-level alarm lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArmState {
    Disarmed = 0,
    Armed = 1,
    Alert = 2,
}

impl ArmState {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Disarmed),
            1 => Some(Self::Armed),
            2 => Some(Self::Alert),
            _ => None,
        }
    }
}

/// How the system was armed. Meaningful only while `state == Armed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArmMethod {
    None = 0,
    /// All sensor kinds enforce, after the arm-delay countdown.
    Away = 1,
    /// Magnet sensors only; engages immediately.
    Stay = 2,
}

impl ArmMethod {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Away),
            2 => Some(Self::Stay),
            _ => None,
        }
    }
}

/// Why the system is alerting. Meaningful only while `state == Alert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlertCause {
    None = 0,
    /// A sensor went silent while armed — treated as tamper-equivalent.
    Offline = 1,
    OneTriggered = 2,
    ManyTriggered = 3,
}

/// The process-wide alarm status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmStatus {
    pub state: ArmState,
    pub method: ArmMethod,
    pub cause: AlertCause,
}

impl AlarmStatus {
    /// Fresh disarmed status — the boot state.
    pub fn disarmed() -> Self {
        Self {
            state: ArmState::Disarmed,
            method: ArmMethod::None,
            cause: AlertCause::None,
        }
    }

    /// Reinitialise all arm-related fields.
    pub fn disarm(&mut self) {
        *self = Self::disarmed();
    }

    pub fn is_armed(&self) -> bool {
        self.state == ArmState::Armed
    }

    pub fn is_alert(&self) -> bool {
        self.state == ArmState::Alert
    }
}

impl Default for AlarmStatus {
    fn default() -> Self {
        Self::disarmed()
    }
}
