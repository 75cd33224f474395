//! System configuration parameters
//!
//! All tunable parameters for the Homeguard controller. Values can be
//! overridden via NVS; the defaults mirror the constants the alarm has
//! always shipped with.

use serde::{Deserialize, Serialize};

/// PIN length in digits. The comparison is an exact fixed-length match, so
/// this is a compile-time constant rather than a config field.
pub const PIN_LENGTH: usize = 4;

/// Factory-default PIN, written on first boot.
pub const DEFAULT_PIN: &str = "1234";

/// Retry policy for companion commands that must eventually succeed
/// (credential send, network change).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// Keep retrying until the companion answers. Blocks the cooperative
    /// loop, which is acceptable only for network-critical operations.
    Forever,
    /// Give up after this many attempts and surface the failure.
    Limit(u8),
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- PIN entry ---
    /// Inactivity timeout while entering a PIN (seconds)
    pub pin_timeout_secs: u16,

    // --- Arming ---
    /// Timeout of the arm-method choice dialog (seconds)
    pub selection_timeout_secs: u16,
    /// Countdown before Away-armed sensors begin enforcing (seconds)
    pub arm_delay_secs: u16,
    /// Grace period between a sensor trigger and the alert (seconds)
    pub alert_grace_secs: u16,

    // --- Sensor mesh ---
    /// Cadence of the offline / low-battery health scan (seconds)
    pub sensor_check_secs: u16,
    /// Silence after which a sensor counts as offline (milliseconds).
    /// Must exceed the sensors' own ping interval.
    pub offline_timeout_ms: u32,
    /// Overall deadline for one pairing attempt (seconds)
    pub pairing_timeout_secs: u16,

    // --- Serial bridge ---
    /// Window to wait for the companion's `OK` after a command (milliseconds)
    pub response_timeout_ms: u32,
    /// Window to collect a framed network scan list (milliseconds)
    pub scan_window_ms: u32,
    /// Retry policy for credential-send and network-change commands
    pub command_retry: RetryPolicy,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // PIN entry
            pin_timeout_secs: 10,

            // Arming
            selection_timeout_secs: 10,
            arm_delay_secs: 30,
            alert_grace_secs: 10,

            // Sensor mesh
            sensor_check_secs: 10,
            offline_timeout_ms: 30_000,
            pairing_timeout_secs: 60,

            // Serial bridge
            response_timeout_ms: 1_000,
            scan_window_ms: 30_000,
            command_retry: RetryPolicy::Forever,
        }
    }
}

impl SystemConfig {
    /// Range-check every field. Called before persisting.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;
        if self.pin_timeout_secs == 0 {
            return Err(Error::Config("pin_timeout_secs must be non-zero"));
        }
        if self.alert_grace_secs == 0 {
            return Err(Error::Config("alert_grace_secs must be non-zero"));
        }
        if self.offline_timeout_ms < 1_000 {
            return Err(Error::Config("offline_timeout_ms must be at least 1000"));
        }
        // The grace timer must expire well before the sensors' next ping
        // would clear a triggered state on its own.
        if u32::from(self.alert_grace_secs) * 1_000 >= self.offline_timeout_ms {
            return Err(Error::Config(
                "alert_grace_secs must be shorter than offline_timeout_ms",
            ));
        }
        if self.response_timeout_ms == 0 {
            return Err(Error::Config("response_timeout_ms must be non-zero"));
        }
        if let RetryPolicy::Limit(0) = self.command_retry {
            return Err(Error::Config("command_retry limit must be non-zero"));
        }
        Ok(())
    }
}
