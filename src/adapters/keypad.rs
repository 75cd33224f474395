//! 4x4 matrix keypad behind a PCF8574 I2C port expander.
//!
//! Rows sit on the low nibble (driven), columns on the high nibble (read
//! with pull-ups). One symbol is reported per physical press; the key must
//! be released before it registers again.
//!
//! Generic over [`embedded_hal::i2c::I2c`], so any bus implementation
//! (ESP-IDF driver or a test double) plugs in.

use embedded_hal::i2c::I2c;

use crate::app::ports::KeypadPort;
use crate::keys::Key;

const KEYMAP: [[u8; 4]; 4] = [
    [b'1', b'2', b'3', b'A'],
    [b'4', b'5', b'6', b'B'],
    [b'7', b'8', b'9', b'C'],
    [b'*', b'0', b'#', b'D'],
];

pub struct I2cKeypad<I2C> {
    i2c: I2C,
    address: u8,
    held: Option<u8>,
}

impl<I2C: I2c> I2cKeypad<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            held: None,
        }
    }

    /// Raw scan: drive each row low in turn and sample the column nibble.
    fn scan(&mut self) -> Option<u8> {
        for (row, keys) in KEYMAP.iter().enumerate() {
            // All high except the scanned row; columns stay inputs.
            let pattern = 0xF0 | (!(1u8 << row) & 0x0F);
            if self.i2c.write(self.address, &[pattern]).is_err() {
                return None;
            }
            let mut readback = [0u8; 1];
            if self.i2c.read(self.address, &mut readback).is_err() {
                return None;
            }
            let columns = (!readback[0] >> 4) & 0x0F;
            if columns != 0 {
                let col = columns.trailing_zeros() as usize;
                return Some(keys[col]);
            }
        }
        None
    }
}

impl<I2C: I2c> KeypadPort for I2cKeypad<I2C> {
    fn poll_key(&mut self) -> Option<Key> {
        let current = self.scan();
        // Edge detection: report only on the press, not while held.
        let pressed = match (current, self.held) {
            (Some(symbol), None) => Some(symbol),
            _ => None,
        };
        self.held = current;
        pressed.and_then(Key::from_ascii)
    }
}
