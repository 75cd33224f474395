//! Persisted controller identity.
//!
//! A thin typed layer over [`StoragePort`]. Holds everything that must
//! survive a power cycle: the PIN, the sensor session id, the next sensor
//! id to hand out, and the registered-sensor count. Numeric values are
//! stored as decimal text so they can be inspected with any NVS dump tool.
//!
//! A one-byte cookie marks a provisioned partition; on a blank partition
//! [`init_if_first_boot`](IdentityStore::init_if_first_boot) seeds factory
//! defaults before anything else reads.

use heapless::String;
use log::info;

use crate::app::ports::StoragePort;
use crate::config::{DEFAULT_PIN, PIN_LENGTH};
use crate::error::{Result, StorageError};

/// NVS namespace for all identity keys.
pub const NAMESPACE: &str = "homeguard";

const KEY_INIT: &str = "init";
const KEY_PIN: &str = "pin";
const KEY_SESSION: &str = "session";
const KEY_NEXT_ID: &str = "next_id";
const KEY_COUNT: &str = "count";

const INIT_COOKIE: u8 = 0xA5;

/// Longest decimal text any stored number needs (u16 max is 5 digits).
const NUM_BUF: usize = 5;

/// Typed accessor for the persisted identity records.
pub struct IdentityStore<S: StoragePort> {
    storage: S,
}

impl<S: StoragePort> IdentityStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Seed factory defaults on a blank partition. Idempotent.
    pub fn init_if_first_boot(&mut self) -> Result<()> {
        if self.storage.exists(NAMESPACE, KEY_INIT) {
            return Ok(());
        }
        info!("blank identity partition, writing factory defaults");
        self.storage.write(NAMESPACE, KEY_PIN, DEFAULT_PIN.as_bytes())?;
        self.write_num(KEY_SESSION, 0)?;
        self.write_num(KEY_NEXT_ID, 1)?;
        self.write_num(KEY_COUNT, 0)?;
        // Cookie last, so a power cut mid-init re-runs the whole seed.
        self.storage.write(NAMESPACE, KEY_INIT, &[INIT_COOKIE])?;
        Ok(())
    }

    // --- PIN ---

    pub fn pin(&self) -> Result<String<PIN_LENGTH>> {
        let mut buf = [0u8; PIN_LENGTH];
        let n = self.storage.read(NAMESPACE, KEY_PIN, &mut buf)?;
        let text = core::str::from_utf8(&buf[..n]).map_err(|_| StorageError::Corrupted)?;
        let mut pin = String::new();
        pin.push_str(text).map_err(|_| StorageError::Corrupted)?;
        Ok(pin)
    }

    pub fn set_pin(&mut self, pin: &str) -> Result<()> {
        self.storage.write(NAMESPACE, KEY_PIN, pin.as_bytes())?;
        Ok(())
    }

    pub fn reset_pin(&mut self) -> Result<()> {
        self.set_pin(DEFAULT_PIN)
    }

    // --- Sensor session ---

    pub fn session_id(&self) -> Result<u16> {
        self.read_num(KEY_SESSION)
    }

    pub fn set_session_id(&mut self, id: u16) -> Result<()> {
        self.write_num(KEY_SESSION, id)
    }

    pub fn next_sensor_id(&self) -> Result<u8> {
        Ok(self.read_num(KEY_NEXT_ID)? as u8)
    }

    pub fn set_next_sensor_id(&mut self, id: u8) -> Result<()> {
        self.write_num(KEY_NEXT_ID, u16::from(id))
    }

    pub fn sensor_count(&self) -> Result<u8> {
        Ok(self.read_num(KEY_COUNT)? as u8)
    }

    pub fn set_sensor_count(&mut self, count: u8) -> Result<()> {
        self.write_num(KEY_COUNT, u16::from(count))
    }

    // --- helpers ---

    fn read_num(&self, key: &str) -> Result<u16> {
        let mut buf = [0u8; NUM_BUF];
        let n = self.storage.read(NAMESPACE, key, &mut buf)?;
        let text = core::str::from_utf8(&buf[..n]).map_err(|_| StorageError::Corrupted)?;
        let value = text.parse::<u16>().map_err(|_| StorageError::Corrupted)?;
        Ok(value)
    }

    fn write_num(&mut self, key: &str, value: u16) -> Result<()> {
        let mut text: String<NUM_BUF> = String::new();
        // u16 always fits NUM_BUF digits.
        core::fmt::Write::write_fmt(&mut text, format_args!("{value}"))
            .map_err(|_| StorageError::IoError)?;
        self.storage.write(NAMESPACE, key, text.as_bytes())?;
        Ok(())
    }
}
